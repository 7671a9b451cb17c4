//! # Auth Commands
//!
//! Sign-up, sign-in, sign-out and the signed-in user.
//!
//! ```text
//!   Login screen ─────► sign_in ──────► AuthController ──► (event) user set
//!                                                            └─► gate → /(tabs)
//!   Signup screen ────► sign_up
//!                         ├─ session issued ──────────────► gate → /(tabs)
//!                         └─ confirmation required ───────► notice + /auth/login
//!   Explore screen ───► current_user (email), sign_out ───► gate → /auth/login
//! ```

use serde::Serialize;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use easyhealth_client::{NavigationState, SignUpOutcome};
use easyhealth_core::navigation::{GateState, Route};
use easyhealth_core::User;

use crate::error::ApiError;
use crate::state::AppState;

pub const SIGN_UP_FAILED: &str = "Signup Failed";
pub const SIGN_IN_FAILED: &str = "Login Failed";
pub const SIGN_OUT_FAILED: &str = "Logout Failed";

/// Upper bound on waiting for the gate to follow a new session.
pub const GATE_SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Shown after a sign-up that still needs email confirmation.
pub const CONFIRM_EMAIL_NOTICE: &str =
    "Account created successfully. Please check your email to verify your account.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpReply {
    /// Success alert, when there is one to show.
    pub notice: Option<String>,
    pub navigation: NavigationState,
}

pub async fn sign_up(
    state: &AppState,
    email: &str,
    password: &str,
    confirmation: &str,
) -> Result<SignUpReply, ApiError> {
    debug!("sign_up command");
    let outcome = state
        .auth
        .sign_up(email, password, confirmation)
        .await
        .map_err(|e| ApiError::for_action(e, SIGN_UP_FAILED))?;

    match outcome {
        SignUpOutcome::SignedIn(_) => Ok(SignUpReply {
            notice: None,
            navigation: settled_navigation(state, GateState::Authenticated).await,
        }),
        SignUpOutcome::ConfirmationRequired(user) => {
            info!(user_id = %user.id, "Account created, awaiting email confirmation");
            Ok(SignUpReply {
                notice: Some(CONFIRM_EMAIL_NOTICE.to_string()),
                navigation: state.navigator.navigate(Route::Login),
            })
        }
    }
}

/// Waits for the gate to reach `gate`, so the reply shows the redirected
/// route. Gives up after [`GATE_SETTLE_TIMEOUT`] and reports what is current.
async fn settled_navigation(state: &AppState, gate: GateState) -> NavigationState {
    let mut rx = state.navigator.subscribe();
    let settled = timeout(GATE_SETTLE_TIMEOUT, rx.wait_for(|nav| nav.gate == gate))
        .await
        .ok()
        .and_then(|result| result.ok().map(|nav| *nav));

    match settled {
        Some(nav) => nav,
        None => {
            warn!(expected = %gate, "Navigation did not settle in time");
            state.navigator.current()
        }
    }
}

pub async fn sign_in(state: &AppState, email: &str, password: &str) -> Result<(), ApiError> {
    debug!("sign_in command");
    state
        .auth
        .sign_in(email, password)
        .await
        .map_err(|e| ApiError::for_action(e, SIGN_IN_FAILED))
}

pub async fn sign_out(state: &AppState) -> Result<(), ApiError> {
    debug!("sign_out command");
    state
        .auth
        .sign_out()
        .await
        .map_err(|e| ApiError::for_action(e, SIGN_OUT_FAILED))
}

pub fn current_user(state: &AppState) -> Result<Option<User>, ApiError> {
    Ok(state.auth.user())
}
