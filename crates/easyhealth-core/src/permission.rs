//! Camera permission model for the scanner screen.
//!
//! The scanner shows a placeholder while the permission is unknown, a prompt
//! while it is missing, and the live camera once granted.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub const PROMPT_TITLE: &str = "Camera Access";
pub const PROMPT_MESSAGE: &str =
    "EasyHealth needs your camera to scan barcodes on food and drink items.";
pub const REQUEST_LABEL: &str = "Allow Camera Access";
pub const SETTINGS_LABEL: &str = "Open Settings";
pub const SETTINGS_HINT: &str =
    "You previously denied camera access. Please enable it in your device settings.";

/// Permission as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum CameraPermission {
    Undetermined,
    Granted,
    Denied { can_ask_again: bool },
}

/// What tapping the prompt button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    RequestAccess,
    OpenSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct PermissionPrompt {
    pub title: String,
    pub message: String,
    pub button_label: String,
    pub action: PermissionAction,
    pub hint: Option<String>,
}

impl PermissionPrompt {
    /// Prompt for a permission that is not granted. Once the OS refuses to
    /// ask again, the only way forward is the settings app.
    pub fn for_denied(can_ask_again: bool) -> Self {
        let (button_label, action, hint) = if can_ask_again {
            (REQUEST_LABEL, PermissionAction::RequestAccess, None)
        } else {
            (
                SETTINGS_LABEL,
                PermissionAction::OpenSettings,
                Some(SETTINGS_HINT.to_string()),
            )
        };

        Self {
            title: PROMPT_TITLE.to_string(),
            message: PROMPT_MESSAGE.to_string(),
            button_label: button_label.to_string(),
            action,
            hint,
        }
    }
}

/// What the scanner screen renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case", tag = "view")]
pub enum ScannerView {
    Loading,
    Prompt { prompt: PermissionPrompt },
    Camera,
}

impl From<CameraPermission> for ScannerView {
    fn from(permission: CameraPermission) -> Self {
        match permission {
            CameraPermission::Undetermined => ScannerView::Loading,
            CameraPermission::Granted => ScannerView::Camera,
            CameraPermission::Denied { can_ask_again } => ScannerView::Prompt {
                prompt: PermissionPrompt::for_denied(can_ask_again),
            },
        }
    }
}
