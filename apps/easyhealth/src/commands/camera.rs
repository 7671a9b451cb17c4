//! # Camera Commands

use tracing::{debug, info};

use easyhealth_core::permission::{CameraPermission, ScannerView};

use crate::error::{ApiError, ErrorCode};
use crate::state::AppState;

/// Flips the torch. Only available while the camera is showing.
pub fn toggle_torch(state: &AppState) -> Result<bool, ApiError> {
    if !state.camera.is_granted() {
        return Err(ApiError::new(
            ErrorCode::CameraUnavailable,
            "Camera access has not been granted",
        ));
    }
    let on = state.camera.toggle_torch();
    debug!(torch = on, "toggle_torch command");
    Ok(on)
}

/// Records the permission the OS reported and returns what to render.
pub fn set_camera_permission(
    state: &AppState,
    permission: CameraPermission,
) -> Result<ScannerView, ApiError> {
    info!(?permission, "Camera permission updated");
    Ok(state.camera.set_permission(permission))
}

pub fn scanner_view(state: &AppState) -> Result<ScannerView, ApiError> {
    Ok(state.camera.with_camera(|c| c.view()))
}
