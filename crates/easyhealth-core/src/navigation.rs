//! # Navigation Gate
//!
//! Routes and the rule that keeps signed-out users on the auth screens and
//! signed-in users off them.
//!
//! ## Route Map
//! ```text
//! ┌──────────────────────────┬────────────────────┬─────────────────────┐
//! │ Path                     │ Route              │ Group               │
//! ├──────────────────────────┼────────────────────┼─────────────────────┤
//! │ /auth/login              │ Login              │ Auth                │
//! │ /auth/signup             │ Signup             │ Auth                │
//! │ /(tabs)                  │ Home (scanner)     │ Tabs                │
//! │ /(tabs)/explore          │ Explore (settings) │ Tabs                │
//! │ /modal                   │ Modal              │ Root                │
//! └──────────────────────────┴────────────────────┴─────────────────────┘
//! ```
//!
//! ## Gate Rules
//! ```text
//! Loading ────────────────────────────────► Wait (render nothing)
//! Unauthenticated + route outside Auth ───► Redirect(/auth/login)
//! Authenticated   + route inside  Auth ───► Redirect(/(tabs))
//! anything else ──────────────────────────► Stay
//! ```
//!
//! A redirect target always satisfies the rule for the same state, so
//! applying a decision and re-evaluating yields `Stay`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

// =============================================================================
// Routes
// =============================================================================

/// Top-level route groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RouteGroup {
    Auth,
    Tabs,
    Root,
}

/// Every screen the app can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    Signup,
    Home,
    Explore,
    Modal,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/auth/login",
            Route::Signup => "/auth/signup",
            Route::Home => "/(tabs)",
            Route::Explore => "/(tabs)/explore",
            Route::Modal => "/modal",
        }
    }

    pub fn group(self) -> RouteGroup {
        match self {
            Route::Login | Route::Signup => RouteGroup::Auth,
            Route::Home | Route::Explore => RouteGroup::Tabs,
            Route::Modal => RouteGroup::Root,
        }
    }

    pub fn in_auth_group(self) -> bool {
        self.group() == RouteGroup::Auth
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Route {
    type Err = CoreError;

    /// Parses a path. Group segments in parentheses are optional, so `/`,
    /// `/(tabs)` and `/(tabs)/index` all resolve to [`Route::Home`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s
            .trim()
            .split('/')
            .filter(|seg| !seg.is_empty())
            .collect();

        let route = match segments.as_slice() {
            [] | ["(tabs)"] | ["index"] | ["(tabs)", "index"] => Route::Home,
            ["explore"] | ["(tabs)", "explore"] => Route::Explore,
            ["auth", "login"] => Route::Login,
            ["auth", "signup"] => Route::Signup,
            ["modal"] => Route::Modal,
            _ => return Err(CoreError::UnknownRoute(s.to_string())),
        };

        Ok(route)
    }
}

// =============================================================================
// Gate
// =============================================================================

/// Auth-derived state the gate decides on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Loading,
    Unauthenticated,
    Authenticated,
}

impl GateState {
    pub fn from_auth(loading: bool, signed_in: bool) -> Self {
        match (loading, signed_in) {
            (true, _) => GateState::Loading,
            (false, false) => GateState::Unauthenticated,
            (false, true) => GateState::Authenticated,
        }
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GateState::Loading => "loading",
            GateState::Unauthenticated => "unauthenticated",
            GateState::Authenticated => "authenticated",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Auth state unknown; render nothing and make no route decision.
    Wait,
    Stay,
    Redirect(Route),
}

/// Applies the gate rules to the current route.
pub fn evaluate(state: GateState, current: Route) -> GateDecision {
    match state {
        GateState::Loading => GateDecision::Wait,
        GateState::Unauthenticated if !current.in_auth_group() => {
            GateDecision::Redirect(Route::Login)
        }
        GateState::Authenticated if current.in_auth_group() => GateDecision::Redirect(Route::Home),
        _ => GateDecision::Stay,
    }
}

/// The route that ends up on screen, `None` while loading.
pub fn resolve(state: GateState, requested: Route) -> Option<Route> {
    match evaluate(state, requested) {
        GateDecision::Wait => None,
        GateDecision::Stay => Some(requested),
        GateDecision::Redirect(target) => Some(target),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ROUTES: [Route; 5] = [
        Route::Login,
        Route::Signup,
        Route::Home,
        Route::Explore,
        Route::Modal,
    ];

    #[test]
    fn test_route_parse() {
        assert_eq!("/".parse::<Route>().unwrap(), Route::Home);
        assert_eq!("/(tabs)".parse::<Route>().unwrap(), Route::Home);
        assert_eq!("/(tabs)/index".parse::<Route>().unwrap(), Route::Home);
        assert_eq!("/explore".parse::<Route>().unwrap(), Route::Explore);
        assert_eq!("/auth/login".parse::<Route>().unwrap(), Route::Login);
        assert_eq!("auth/signup/".parse::<Route>().unwrap(), Route::Signup);
        assert_eq!("/modal".parse::<Route>().unwrap(), Route::Modal);
        assert!("/auth".parse::<Route>().is_err());
        assert!("/admin".parse::<Route>().is_err());
    }

    #[test]
    fn test_paths_round_trip() {
        for route in ALL_ROUTES {
            assert_eq!(route.path().parse::<Route>().unwrap(), route);
        }
    }

    #[test]
    fn test_loading_waits_everywhere() {
        for route in ALL_ROUTES {
            assert_eq!(evaluate(GateState::Loading, route), GateDecision::Wait);
            assert_eq!(resolve(GateState::Loading, route), None);
        }
    }

    #[test]
    fn test_unauthenticated_goes_to_login() {
        assert_eq!(
            evaluate(GateState::Unauthenticated, Route::Home),
            GateDecision::Redirect(Route::Login)
        );
        assert_eq!(
            evaluate(GateState::Unauthenticated, Route::Modal),
            GateDecision::Redirect(Route::Login)
        );
        assert_eq!(
            evaluate(GateState::Unauthenticated, Route::Signup),
            GateDecision::Stay
        );
    }

    #[test]
    fn test_authenticated_leaves_auth_screens() {
        assert_eq!(
            evaluate(GateState::Authenticated, Route::Login),
            GateDecision::Redirect(Route::Home)
        );
        assert_eq!(
            evaluate(GateState::Authenticated, Route::Explore),
            GateDecision::Stay
        );
        assert_eq!(
            evaluate(GateState::Authenticated, Route::Modal),
            GateDecision::Stay
        );
    }

    #[test]
    fn test_redirect_targets_are_stable() {
        for state in [GateState::Unauthenticated, GateState::Authenticated] {
            for route in ALL_ROUTES {
                let landed = resolve(state, route).unwrap();
                assert_eq!(evaluate(state, landed), GateDecision::Stay);
            }
        }
    }

    #[test]
    fn test_gate_state_from_auth() {
        assert_eq!(GateState::from_auth(true, true), GateState::Loading);
        assert_eq!(GateState::from_auth(false, false), GateState::Unauthenticated);
        assert_eq!(GateState::from_auth(false, true), GateState::Authenticated);
    }
}
