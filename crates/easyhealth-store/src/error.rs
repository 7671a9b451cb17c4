//! # Store Errors
//!
//! Error types for credential store operations.
//!
//! ```text
//! sqlx::Error::PoolTimedOut   → StoreError::PoolExhausted
//! sqlx::Error::PoolClosed     → StoreError::ConnectionFailed
//! sqlx::Error::Database       → StoreError::QueryFailed
//! MigrateError                → StoreError::MigrationFailed
//! Other                       → StoreError::Internal
//!
//! keyring::Error::PlatformFailure │
//! keyring::Error::NoStorageAccess ┴→ StoreError::VaultUnavailable
//! keyring::Error (other)          → StoreError::Vault
//! ```

use thiserror::Error;

/// Credential store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created (permissions, missing parent dir)
    /// - Disk full
    /// - Pool already closed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// The OS credential vault cannot be reached at all.
    ///
    /// ## When This Occurs
    /// - No keychain / credential manager on this platform or session
    /// - Vault locked or access denied
    #[error("Credential vault unavailable: {0}")]
    VaultUnavailable(String),

    /// The vault rejected one operation (value too long, bad encoding).
    #[error("Credential vault error: {0}")]
    Vault(String),

    /// Internal store error.
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Worth retrying the same operation later.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::PoolExhausted)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => StoreError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,
            sqlx::Error::PoolClosed => StoreError::ConnectionFailed("Pool is closed".to_string()),
            _ => StoreError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}

impl From<keyring::Error> for StoreError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                StoreError::VaultUnavailable(err.to_string())
            }
            _ => StoreError::Vault(err.to_string()),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
