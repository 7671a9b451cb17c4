//! # Client Errors
//!
//! Error types for everything in this crate.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Client Error Categories                          │
//! │                                                                         │
//! │  CONFIGURATION             TRANSPORT               BACKEND              │
//! │  ─────────────             ─────────               ───────              │
//! │  • InvalidConfig           • ConnectionFailed      • AuthRejected       │
//! │  • InvalidUrl              • Timeout               • UnexpectedStatus   │
//! │  • ConfigLoadFailed        • InvalidResponse                            │
//! │  • ConfigSaveFailed                                                     │
//! │                                                                         │
//! │  LOCAL                     INTERNAL                                     │
//! │  ─────                     ────────                                     │
//! │  • Validation              • Internal                                   │
//! │  • Storage                                                              │
//! │  • NotSignedIn                                                          │
//! │                                                                         │
//! │  Retryable: ConnectionFailed, Timeout, UnexpectedStatus (5xx / 429)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use easyhealth_core::ValidationError;
use easyhealth_store::StoreError;
use thiserror::Error;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    /// Body could not be decoded into the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    // =========================================================================
    // Backend Errors
    // =========================================================================
    /// The auth backend refused the request. `message` is the backend's own
    /// wording and is shown to the user as-is.
    #[error("{message}")]
    AuthRejected { status: u16, message: String },

    #[error("Server returned status {status}")]
    UnexpectedStatus { status: u16, body: String },

    // =========================================================================
    // Local Errors
    // =========================================================================
    /// Input failed local checks; nothing was sent.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Not signed in")]
    NotSignedIn,

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Transient failures that may succeed if the same request is repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::ConnectionFailed(_) | ClientError::Timeout => true,
            ClientError::UnexpectedStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// A message fit for an alert body.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            ClientError::InvalidConfig(err.to_string())
        } else {
            ClientError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::InvalidResponse(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

impl From<StoreError> for ClientError {
    fn from(err: StoreError) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::ConfigSaveFailed(err.to_string())
    }
}
