//! # Navigation Commands

use tracing::debug;

use easyhealth_client::NavigationState;
use easyhealth_core::navigation::Route;

use crate::error::ApiError;
use crate::state::AppState;

/// Requests a screen by path (`/auth/signup`, `/(tabs)/explore`, `explore`, ...).
///
/// The reply is where the user actually ended up after the gate.
pub fn navigate(state: &AppState, path: &str) -> Result<NavigationState, ApiError> {
    let route: Route = path.parse()?;
    debug!(route = %route, "navigate command");
    Ok(state.navigator.navigate(route))
}

pub fn current_route(state: &AppState) -> Result<NavigationState, ApiError> {
    Ok(state.navigator.current())
}
