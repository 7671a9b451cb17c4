//! # easyhealth-store: Credential Persistence for EasyHealth
//!
//! Durable storage for the one thing the app keeps between launches: the
//! serialized auth session. It lives in the OS credential vault when one is
//! reachable, otherwise in an owner-only SQLite file.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       easyhealth-store                                  │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Public API                                   │   │
//! │  │  CredentialStore (trait) • open_store() • Database • DbConfig   │   │
//! │  └──────────────┬──────────────┬───────────────────────────────────┘   │
//! │                 │              │                                        │
//! │  ┌──────────────▼────────┐     │  fallback                              │
//! │  │ KeyringCredentialStore│─────┤                                        │
//! │  │ (OS vault, default)   │     │                                        │
//! │  └───────────────────────┘     │                                        │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 CredentialRepository                            │   │
//! │  │       get / set (upsert) / remove / keys                        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            SQLite (WAL) • embedded migrations                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use easyhealth_store::{open_store, StorageBackend};
//!
//! let store = open_store(StorageBackend::Keyring, &path).await?;
//! store.set_item("sb-abcd-auth-token", &session_json).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use pool::{Database, DbConfig};
pub use repository::CredentialRepository;
pub use store::{
    open_store, CredentialStore, KeyringCredentialStore, MemoryCredentialStore, StorageBackend,
    KEYRING_SERVICE,
};
