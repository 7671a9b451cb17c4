//! # Validation Module
//!
//! Local input checks that run before anything is sent to the auth backend
//! or interpolated into a lookup URL.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Sign-up check order                                │
//! │                                                                         │
//! │  1. all fields filled?          no ──► "Please fill in all fields"     │
//! │  2. email contains '@'?         no ──► "Please enter a valid email"    │
//! │  3. password ≥ 6 characters?    no ──► "Password must be at least 6    │
//! │                                         characters"                     │
//! │  4. password == confirmation?   no ──► "Passwords do not match"        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Session Service (never reached on any failure above)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sign-in runs steps 1–3. The first failing step wins.
//!
//! ## Usage
//! ```rust
//! use easyhealth_core::validation::validate_sign_up;
//! use easyhealth_core::ValidationError;
//!
//! assert_eq!(
//!     validate_sign_up("user@example.com", "secret1", "secret2"),
//!     Err(ValidationError::PasswordMismatch)
//! );
//! ```

use crate::error::ValidationError;
use crate::MIN_PASSWORD_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Credential Validators
// =============================================================================

/// Email must be non-empty and contain an `@`. Nothing stricter: the backend
/// owns real address validation.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::MissingFields);
    }

    if !email.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(())
}

/// Password must be at least [`MIN_PASSWORD_LEN`] characters.
///
/// Length counts characters, not bytes, and the password is not trimmed.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::MissingFields);
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }

    Ok(())
}

/// Validates the sign-in form.
pub fn validate_sign_in(email: &str, password: &str) -> ValidationResult<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ValidationError::MissingFields);
    }

    validate_email(email)?;
    validate_password(password)
}

/// Validates the sign-up form, including the confirmation field.
pub fn validate_sign_up(email: &str, password: &str, confirmation: &str) -> ValidationResult<()> {
    if email.trim().is_empty() || password.is_empty() || confirmation.is_empty() {
        return Err(ValidationError::MissingFields);
    }

    validate_email(email)?;
    validate_password(password)?;

    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }

    Ok(())
}

// =============================================================================
// Barcode Validator
// =============================================================================

/// Shortest code we look up (UPC-E without check digit).
pub const MIN_BARCODE_LEN: usize = 6;

/// Longest code we look up (GTIN-14).
pub const MAX_BARCODE_LEN: usize = 14;

/// A decoded barcode must be ASCII digits only before it goes into a URL.
///
/// ## Returns
/// The trimmed code.
pub fn validate_barcode(code: &str) -> ValidationResult<&str> {
    let code = code.trim();

    if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    if !(MIN_BARCODE_LEN..=MAX_BARCODE_LEN).contains(&code.len()) {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: format!(
                "must be {} to {} digits long",
                MIN_BARCODE_LEN, MAX_BARCODE_LEN
            ),
        });
    }

    Ok(code)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert_eq!(validate_email("userexample.com"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("   "), Err(ValidationError::MissingFields));
    }

    #[test]
    fn test_validate_password_boundary() {
        assert_eq!(
            validate_password("12345"),
            Err(ValidationError::PasswordTooShort { min: 6 })
        );
        assert!(validate_password("123456").is_ok());
        // Six characters, more than six bytes.
        assert!(validate_password("ééééé").is_err());
        assert!(validate_password("éééééé").is_ok());
    }

    #[test]
    fn test_sign_in_rules() {
        assert!(validate_sign_in("user@example.com", "secret1").is_ok());
        assert_eq!(
            validate_sign_in("", "secret1"),
            Err(ValidationError::MissingFields)
        );
        assert_eq!(
            validate_sign_in("user@example.com", ""),
            Err(ValidationError::MissingFields)
        );
        assert_eq!(
            validate_sign_in("user.example.com", "secret1"),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(
            validate_sign_in("user@example.com", "short"),
            Err(ValidationError::PasswordTooShort { min: 6 })
        );
    }

    #[test]
    fn test_sign_up_check_order() {
        // Missing confirmation beats a bad email.
        assert_eq!(
            validate_sign_up("bad", "secret1", ""),
            Err(ValidationError::MissingFields)
        );
        // Bad email beats a short password.
        assert_eq!(
            validate_sign_up("bad", "123", "123"),
            Err(ValidationError::InvalidEmail)
        );
        // Short password beats a mismatch.
        assert_eq!(
            validate_sign_up("user@example.com", "123", "456"),
            Err(ValidationError::PasswordTooShort { min: 6 })
        );
        assert_eq!(
            validate_sign_up("user@example.com", "secret1", "secret2"),
            Err(ValidationError::PasswordMismatch)
        );
        assert!(validate_sign_up("user@example.com", "secret1", "secret1").is_ok());
    }

    #[test]
    fn test_invalid_email_message_mentions_valid_email() {
        let err = validate_sign_in("nobody", "secret1").unwrap_err();
        assert!(err.to_string().contains("valid email"));
    }

    #[test]
    fn test_validate_barcode() {
        assert_eq!(validate_barcode(" 3017620422003 ").unwrap(), "3017620422003");
        assert!(validate_barcode("0000000000000").is_ok());
        assert!(validate_barcode("12345670").is_ok());
        assert!(validate_barcode("").is_err());
        assert!(validate_barcode("12345").is_err());
        assert!(validate_barcode("301762042200a").is_err());
        assert!(validate_barcode("../../etc").is_err());
        assert!(validate_barcode("123456789012345").is_err());
    }
}
