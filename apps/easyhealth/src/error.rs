//! # API Error Type
//!
//! Unified error type for commands: what the UI shows in an alert.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Command Function  ──►  Result<T, ApiError>                             │
//! │                                                                         │
//! │  ValidationError ─────────────► VALIDATION_ERROR   title "Error"        │
//! │  AuthRejected (backend msg) ──► AUTH_ERROR         title per action     │
//! │  NotSignedIn ─────────────────► NOT_SIGNED_IN                           │
//! │  Storage ─────────────────────► STORAGE_ERROR                           │
//! │  Config / URL ────────────────► CONFIG_ERROR                            │
//! │  Connection / timeout / 5xx ──► NETWORK_ERROR                           │
//! │  anything else ───────────────► INTERNAL_ERROR                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use easyhealth_client::ClientError;
use easyhealth_core::CoreError;

/// Title of alerts raised by local input checks.
pub const DEFAULT_TITLE: &str = "Error";

/// API error returned from commands.
///
/// ```json
/// { "code": "AUTH_ERROR", "title": "Login Failed", "message": "Invalid login credentials" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Alert title
    pub title: String,

    /// Human-readable error message for display
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input failed local checks; nothing was sent
    ValidationError,

    /// The auth backend refused the request
    AuthError,

    /// The command needs a signed-in user
    NotSignedIn,

    /// Camera permission missing
    CameraUnavailable,

    /// Credential store failure
    StorageError,

    /// Bad or missing configuration
    ConfigError,

    /// Backend unreachable or failing
    NetworkError,

    InternalError,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            title: DEFAULT_TITLE.to_string(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn not_signed_in() -> Self {
        ApiError::new(ErrorCode::NotSignedIn, "Please sign in first")
    }

    /// Maps a failed auth action. Validation failures keep the generic
    /// title; everything else gets `failure_title` ("Login Failed", ...).
    pub fn for_action(err: ClientError, failure_title: &str) -> Self {
        let mut api = ApiError::from(err);
        if api.code != ErrorCode::ValidationError {
            api.title = failure_title.to_string();
        }
        api
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        let code = match &err {
            ClientError::Validation(_) => ErrorCode::ValidationError,
            ClientError::AuthRejected { .. } => ErrorCode::AuthError,
            ClientError::NotSignedIn => ErrorCode::NotSignedIn,
            ClientError::Storage(e) => {
                tracing::error!("Credential storage failed: {}", e);
                ErrorCode::StorageError
            }
            ClientError::InvalidConfig(_)
            | ClientError::InvalidUrl(_)
            | ClientError::ConfigLoadFailed(_)
            | ClientError::ConfigSaveFailed(_) => ErrorCode::ConfigError,
            ClientError::ConnectionFailed(_)
            | ClientError::Timeout
            | ClientError::UnexpectedStatus { .. }
            | ClientError::InvalidResponse(_) => ErrorCode::NetworkError,
            ClientError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                ErrorCode::InternalError
            }
        };

        ApiError::new(code, err.user_message())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
            other => ApiError::validation(other.to_string()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

impl std::error::Error for ApiError {}
