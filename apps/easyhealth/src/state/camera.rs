//! # Camera State
//!
//! Permission and torch for the scanner screen. The camera itself is a black
//! box that hands decoded barcodes to the scan commands.
//!
//! ```text
//!   permission ──► ScannerView
//!     Undetermined ───────────────► Loading
//!     Granted ────────────────────► Camera (torch toggle available)
//!     Denied { can_ask_again } ───► Prompt ("Allow Camera Access"
//!                                           or "Open Settings")
//! ```
//!
//! The torch is independent of the scan cycle: toggling it never touches the
//! scan guard, and a scan never turns it off.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use easyhealth_core::permission::{CameraPermission, ScannerView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub permission: CameraPermission,
    pub torch: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Camera {
            permission: CameraPermission::Undetermined,
            torch: false,
        }
    }
}

impl Camera {
    pub fn view(&self) -> ScannerView {
        ScannerView::from(self.permission)
    }
}

#[derive(Debug, Default)]
pub struct CameraState {
    camera: Mutex<Camera>,
}

impl CameraState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_camera<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Camera) -> R,
    {
        let camera = self.camera.lock().unwrap_or_else(PoisonError::into_inner);
        f(&camera)
    }

    pub fn with_camera_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Camera) -> R,
    {
        let mut camera = self.camera.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut camera)
    }

    pub fn snapshot(&self) -> Camera {
        self.with_camera(|c| *c)
    }

    pub fn set_permission(&self, permission: CameraPermission) -> ScannerView {
        self.with_camera_mut(|c| {
            c.permission = permission;
            if permission != CameraPermission::Granted {
                c.torch = false;
            }
            c.view()
        })
    }

    /// Flips the torch; returns the new state.
    pub fn toggle_torch(&self) -> bool {
        self.with_camera_mut(|c| {
            c.torch = !c.torch;
            c.torch
        })
    }

    pub fn is_granted(&self) -> bool {
        self.with_camera(|c| c.permission == CameraPermission::Granted)
    }
}
