//! # Navigator
//!
//! Keeps the visible route consistent with auth state.
//!
//! ```text
//!   watch<AuthSnapshot> ──► gate task ──┐
//!                                       ├──► evaluate(gate, route) ──► watch<NavigationState>
//!   navigate(route) ────────────────────┘          │
//!                                                  └─ Redirect(target) replaces the route
//! ```
//!
//! While auth is loading the route is held but not shown (`route: None`).

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use easyhealth_core::navigation::{evaluate, GateDecision, GateState, Route};

use crate::auth::AuthSnapshot;

/// Route the app opens on before any gate decision.
pub const INITIAL_ROUTE: Route = Route::Home;

/// What the screen shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavigationState {
    pub gate: GateState,
    /// `None` while the gate is waiting on auth.
    pub route: Option<Route>,
}

#[derive(Debug)]
struct Position {
    gate: GateState,
    route: Route,
}

struct Inner {
    position: Mutex<Position>,
    state: watch::Sender<NavigationState>,
}

impl Inner {
    fn update(&self, gate: Option<GateState>, request: Option<Route>) -> NavigationState {
        let next = {
            let mut position = self.position.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(gate) = gate {
                position.gate = gate;
            }
            if let Some(route) = request {
                position.route = route;
            }

            if let GateDecision::Redirect(target) = evaluate(position.gate, position.route) {
                info!(from = %position.route, to = %target, gate = %position.gate, "Redirecting");
                position.route = target;
            }

            NavigationState {
                gate: position.gate,
                route: (position.gate != GateState::Loading).then_some(position.route),
            }
        };

        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        next
    }
}

pub struct Navigator {
    inner: Arc<Inner>,
    task: JoinHandle<()>,
}

impl Navigator {
    /// Starts the gate on top of an auth snapshot stream.
    pub fn new(mut auth: watch::Receiver<AuthSnapshot>) -> Self {
        let gate = gate_for(&auth.borrow_and_update());
        let (state, _) = watch::channel(NavigationState { gate, route: None });
        let inner = Arc::new(Inner {
            position: Mutex::new(Position {
                gate,
                route: INITIAL_ROUTE,
            }),
            state,
        });
        inner.update(None, None);

        let task_inner = Arc::clone(&inner);
        let task = tokio::spawn(async move {
            while auth.changed().await.is_ok() {
                let gate = gate_for(&auth.borrow_and_update());
                debug!(gate = %gate, "Auth changed, re-evaluating route");
                task_inner.update(Some(gate), None);
            }
        });

        Navigator { inner, task }
    }

    /// Requests `route`; the gate may send the user elsewhere.
    pub fn navigate(&self, route: Route) -> NavigationState {
        debug!(route = %route, "Navigation requested");
        self.inner.update(None, Some(route))
    }

    pub fn current(&self) -> NavigationState {
        *self.inner.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<NavigationState> {
        self.inner.state.subscribe()
    }
}

impl Drop for Navigator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn gate_for(snapshot: &AuthSnapshot) -> GateState {
    GateState::from_auth(snapshot.loading, snapshot.is_signed_in())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use easyhealth_core::User;
    use uuid::Uuid;

    fn signed_in() -> AuthSnapshot {
        AuthSnapshot {
            user: Some(User {
                id: Uuid::new_v4(),
                email: Some("ada@example.com".to_string()),
            }),
            loading: false,
        }
    }

    fn signed_out() -> AuthSnapshot {
        AuthSnapshot {
            user: None,
            loading: false,
        }
    }

    #[tokio::test]
    async fn test_waits_while_loading() {
        let (_auth, rx) = watch::channel(AuthSnapshot::default());
        let navigator = Navigator::new(rx);

        let state = navigator.current();
        assert_eq!(state.gate, GateState::Loading);
        assert_eq!(state.route, None);

        // Requests while loading are held, not shown.
        assert_eq!(navigator.navigate(Route::Explore).route, None);
    }

    #[tokio::test]
    async fn test_signed_out_lands_on_login() {
        let (auth, rx) = watch::channel(AuthSnapshot::default());
        let navigator = Navigator::new(rx);
        let mut nav = navigator.subscribe();

        auth.send(signed_out()).unwrap();
        let state = *nav.wait_for(|s| s.gate != GateState::Loading).await.unwrap();
        assert_eq!(state.route, Some(Route::Login));

        assert_eq!(navigator.navigate(Route::Home).route, Some(Route::Login));
        assert_eq!(navigator.navigate(Route::Modal).route, Some(Route::Login));
        assert_eq!(navigator.navigate(Route::Signup).route, Some(Route::Signup));
    }

    #[tokio::test]
    async fn test_sign_in_moves_to_tabs_and_sign_out_back() {
        let (auth, rx) = watch::channel(signed_out());
        let navigator = Navigator::new(rx);
        let mut nav = navigator.subscribe();
        assert_eq!(navigator.current().route, Some(Route::Login));

        auth.send(signed_in()).unwrap();
        let state = *nav
            .wait_for(|s| s.gate == GateState::Authenticated)
            .await
            .unwrap();
        assert_eq!(state.route, Some(Route::Home));

        assert_eq!(navigator.navigate(Route::Explore).route, Some(Route::Explore));
        assert_eq!(navigator.navigate(Route::Signup).route, Some(Route::Home));

        navigator.navigate(Route::Explore);
        auth.send(signed_out()).unwrap();
        let state = *nav
            .wait_for(|s| s.gate == GateState::Unauthenticated)
            .await
            .unwrap();
        assert_eq!(state.route, Some(Route::Login));
    }

    #[tokio::test]
    async fn test_restored_session_keeps_initial_route() {
        let (auth, rx) = watch::channel(AuthSnapshot::default());
        let navigator = Navigator::new(rx);
        let mut nav = navigator.subscribe();

        auth.send(signed_in()).unwrap();
        let state = *nav.wait_for(|s| s.route.is_some()).await.unwrap();
        assert_eq!(state.route, Some(INITIAL_ROUTE));
        assert_eq!(state.gate, GateState::Authenticated);
    }
}
