//! # Error Types
//!
//! Domain-specific error types for easyhealth-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  easyhealth-core errors (this file)                                    │
//! │  ├── CoreError        - Parse and domain failures                      │
//! │  └── ValidationError  - Credential / barcode input failures            │
//! │                                                                         │
//! │  easyhealth-store errors                                               │
//! │  └── StoreError       - Credential store failures                      │
//! │                                                                         │
//! │  easyhealth-client errors                                              │
//! │  └── ClientError      - HTTP, backend rejection, config                │
//! │                                                                         │
//! │  App errors                                                            │
//! │  └── ApiError         - The alert the user sees (serialized)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `ValidationError` messages are shown to the user verbatim, so their
//! `Display` text is the exact alert body.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A Nutri-Score letter outside a–e.
    #[error("Unknown Nutri-Score grade: {0}")]
    UnknownNutriGrade(String),

    /// A Nova group outside 1–4.
    #[error("Invalid Nova group: {0}")]
    InvalidNovaGroup(i64),

    /// A barcode symbology the scanner is not configured for.
    #[error("Unsupported barcode format: {0}")]
    UnsupportedBarcodeFormat(String),

    /// A path that does not name any screen.
    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any backend call; the service layer never sees input that
/// failed one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// One or more required fields are empty.
    #[error("Please fill in all fields")]
    MissingFields,

    /// Email without an `@`.
    #[error("Please enter a valid email")]
    InvalidEmail,

    /// Password below the minimum length.
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    /// Sign-up confirmation does not match the password.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Invalid format (e.g., non-numeric barcode).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_are_user_facing() {
        assert_eq!(
            ValidationError::MissingFields.to_string(),
            "Please fill in all fields"
        );
        assert_eq!(
            ValidationError::InvalidEmail.to_string(),
            "Please enter a valid email"
        );
        assert_eq!(
            ValidationError::PasswordTooShort { min: 6 }.to_string(),
            "Password must be at least 6 characters"
        );
        assert_eq!(
            ValidationError::PasswordMismatch.to_string(),
            "Passwords do not match"
        );
    }

    #[test]
    fn test_core_error_messages() {
        let err = CoreError::UnknownNutriGrade("z".to_string());
        assert_eq!(err.to_string(), "Unknown Nutri-Score grade: z");

        let err = CoreError::InvalidNovaGroup(7);
        assert_eq!(err.to_string(), "Invalid Nova group: 7");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::InvalidEmail.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
