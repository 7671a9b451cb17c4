//! # Credential Store
//!
//! The three-method storage seam the session service persists through.
//!
//! ```text
//!            ┌─────────────────────────────┐
//!            │  SessionService             │
//!            └──────────────┬──────────────┘
//!                           │ get_item / set_item / remove_item
//!            ┌──────────────▼──────────────┐
//!            │  dyn CredentialStore        │
//!            └──┬───────────┬───────────┬──┘
//!               │           │           │
//!   ┌───────────▼──────┐ ┌──▼─────────┐ ┌▼─────────────────────┐
//!   │ KeyringCredential│ │ Database   │ │ MemoryCredentialStore│
//!   │ Store (OS vault) │ │ (SQLite,   │ │ (volatile)           │
//!   │ default          │ │  0600)     │ │                      │
//!   └──────────────────┘ └────────────┘ └──────────────────────┘
//! ```
//!
//! `StorageBackend::Keyring` falls back to the SQLite file when the vault
//! cannot be reached (headless Linux, locked keychain).

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::pool::{Database, DbConfig};

/// Durable string storage keyed by name.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removing a missing key is not an error.
    async fn remove_item(&self, key: &str) -> StoreResult<()>;
}

#[async_trait]
impl CredentialStore for Database {
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        self.credentials().get(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        self.credentials().set(key, value).await
    }

    async fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.credentials().remove(key).await.map(|_| ())
    }
}

// =============================================================================
// In-memory fallback
// =============================================================================

/// Process-lifetime store for platforms without durable secure storage, and
/// for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    items: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        self.items
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.items.write().await.remove(key);
        Ok(())
    }
}

// =============================================================================
// OS credential vault
// =============================================================================

/// Service name every vault entry is filed under.
pub const KEYRING_SERVICE: &str = "easyhealth";

/// Entry read once at open time to confirm the vault answers.
const ACCESS_CHECK_KEY: &str = "easyhealth-access-check";

/// Keeps each key in the platform credential vault, one entry per key.
///
/// Vault calls block, so every operation runs on the blocking pool.
pub struct KeyringCredentialStore {
    service: String,
    entries: Mutex<HashMap<String, Arc<Entry>>>,
}

impl KeyringCredentialStore {
    /// Opens the vault for `service` and checks that it can be read.
    ///
    /// A missing entry is a successful answer; `VaultUnavailable` means the
    /// platform has no usable vault.
    pub async fn open(service: impl Into<String>) -> StoreResult<Self> {
        let store = Self {
            service: service.into(),
            entries: Mutex::new(HashMap::new()),
        };
        store.get_item(ACCESS_CHECK_KEY).await?;
        debug!(service = %store.service, "Credential vault reachable");
        Ok(store)
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> StoreResult<Arc<Entry>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get(key) {
            return Ok(Arc::clone(entry));
        }
        let entry = Arc::new(Entry::new(&self.service, key)?);
        entries.insert(key.to_string(), Arc::clone(&entry));
        Ok(entry)
    }
}

async fn blocking<T, F>(f: F) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> StoreResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
}

#[async_trait]
impl CredentialStore for KeyringCredentialStore {
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        let entry = self.entry(key)?;
        blocking(move || match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        })
        .await
    }

    async fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        let entry = self.entry(key)?;
        let value = value.to_string();
        blocking(move || entry.set_password(&value).map_err(StoreError::from)).await
    }

    async fn remove_item(&self, key: &str) -> StoreResult<()> {
        let entry = self.entry(key)?;
        blocking(move || match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        })
        .await
    }
}

impl std::fmt::Debug for KeyringCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringCredentialStore")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Backend selection
// =============================================================================

/// Which store to open at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// OS credential vault, SQLite file when the vault is unreachable.
    #[default]
    Keyring,
    Sqlite,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyring" => Ok(StorageBackend::Keyring),
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Opens the configured backend. `path` is the SQLite file, used by
/// `Sqlite` and by `Keyring` when it falls back.
pub async fn open_store(
    backend: StorageBackend,
    path: &Path,
) -> StoreResult<Arc<dyn CredentialStore>> {
    match backend {
        StorageBackend::Keyring => {
            let vault = KeyringCredentialStore::open(KEYRING_SERVICE).await;
            vault_or_file(vault, path).await
        }
        StorageBackend::Sqlite => {
            let db = Database::new(DbConfig::new(path)).await?;
            Ok(Arc::new(db))
        }
        StorageBackend::Memory => {
            info!("Using volatile in-memory credential store");
            Ok(Arc::new(MemoryCredentialStore::new()))
        }
    }
}

/// Keeps an opened vault, or falls back to the SQLite file when the vault
/// is unavailable. Other vault errors are returned as-is.
async fn vault_or_file(
    vault: StoreResult<KeyringCredentialStore>,
    path: &Path,
) -> StoreResult<Arc<dyn CredentialStore>> {
    match vault {
        Ok(store) => {
            info!(service = %store.service(), "Using OS credential vault");
            Ok(Arc::new(store))
        }
        Err(StoreError::VaultUnavailable(reason)) => {
            warn!(%reason, path = %path.display(), "Credential vault unavailable, using SQLite file");
            let db = Database::new(DbConfig::new(path)).await?;
            Ok(Arc::new(db))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    fn use_mock_vault() {
        static MOCK: Once = Once::new();
        MOCK.call_once(|| keyring::set_default_credential_builder(keyring::mock::default_credential_builder()));
    }

    async fn exercise(store: &dyn CredentialStore) {
        assert_eq!(store.get_item("sb-test-auth-token").await.unwrap(), None);

        store.set_item("sb-test-auth-token", "{\"a\":1}").await.unwrap();
        assert_eq!(
            store.get_item("sb-test-auth-token").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );

        store.remove_item("sb-test-auth-token").await.unwrap();
        store.remove_item("sb-test-auth-token").await.unwrap();
        assert_eq!(store.get_item("sb-test-auth-token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_contract() {
        let store = MemoryCredentialStore::new();
        exercise(&store).await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_sqlite_store_contract() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        exercise(&db).await;
    }

    #[tokio::test]
    async fn test_sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.db");

        let store = open_store(StorageBackend::Sqlite, &path).await.unwrap();
        store.set_item("key", "value").await.unwrap();
        drop(store);

        let reopened = open_store(StorageBackend::Sqlite, &path).await.unwrap();
        assert_eq!(
            reopened.get_item("key").await.unwrap().as_deref(),
            Some("value")
        );
    }

    #[tokio::test]
    async fn test_keyring_store_contract() {
        use_mock_vault();
        let store = KeyringCredentialStore::open("easyhealth-test").await.unwrap();
        exercise(&store).await;

        store.set_item("other", "value").await.unwrap();
        assert_eq!(store.get_item("other").await.unwrap().as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn test_reachable_vault_is_used() {
        use_mock_vault();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.db");

        let vault = KeyringCredentialStore::open("easyhealth-test").await;
        let store = vault_or_file(vault, &path).await.unwrap();
        store.set_item("key", "secret").await.unwrap();

        // Nothing touched the disk.
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unavailable_vault_falls_back_to_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.db");

        let unavailable = Err(StoreError::from(keyring::Error::NoStorageAccess(
            "no keychain".into(),
        )));
        let store = vault_or_file(unavailable, &path).await.unwrap();
        store.set_item("key", "value").await.unwrap();
        drop(store);

        let reopened = open_store(StorageBackend::Sqlite, &path).await.unwrap();
        assert_eq!(reopened.get_item("key").await.unwrap().as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn test_other_vault_errors_do_not_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.db");

        let broken = Err(StoreError::Vault("bad encoding".to_string()));
        let err = vault_or_file(broken, &path).await.err().expect("expected vault error");
        assert!(matches!(err, StoreError::Vault(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(StorageBackend::default(), StorageBackend::Keyring);
        assert_eq!("Keyring".parse::<StorageBackend>().unwrap(), StorageBackend::Keyring);
        assert_eq!("SQLite".parse::<StorageBackend>().unwrap(), StorageBackend::Sqlite);
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("redis".parse::<StorageBackend>().is_err());
    }
}
