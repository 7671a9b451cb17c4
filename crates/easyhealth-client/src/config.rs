//! # App Configuration
//!
//! Endpoints, credentials and tunables for the services in this crate.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     EASYHEALTH_SUPABASE_URL=https://abcd.supabase.co                   │
//! │     EASYHEALTH_SUPABASE_ANON_KEY=eyJ...                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/easyhealth/config.toml (Linux)                           │
//! │     ~/Library/Application Support/com.easyhealth.app/config.toml       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [auth]
//! url = "https://abcd.supabase.co"
//! anon_key = "eyJ..."
//! auto_refresh_token = true
//! persist_session = true
//!
//! [lookup]
//! base_url = "https://world.openfoodfacts.net"
//! user_agent = "EasyHealth/1.0"
//!
//! [scanner]
//! cooldown_ms = 2000
//!
//! [storage]
//! backend = "keyring"  # keyring | sqlite | memory
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use easyhealth_core::{DEFAULT_PRODUCT_API_URL, SCAN_COOLDOWN_MS, USER_AGENT};
use easyhealth_store::StorageBackend;

use crate::error::{ClientError, ClientResult};

pub const ENV_SUPABASE_URL: &str = "EASYHEALTH_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "EASYHEALTH_SUPABASE_ANON_KEY";
pub const ENV_PRODUCT_API_URL: &str = "EASYHEALTH_PRODUCT_API_URL";
pub const ENV_USER_AGENT: &str = "EASYHEALTH_USER_AGENT";
pub const ENV_SCAN_COOLDOWN_MS: &str = "EASYHEALTH_SCAN_COOLDOWN_MS";
pub const ENV_STORAGE: &str = "EASYHEALTH_STORAGE";
pub const ENV_DB_PATH: &str = "EASYHEALTH_DB_PATH";

const DB_FILE_NAME: &str = "easyhealth.db";

// =============================================================================
// Auth Settings
// =============================================================================

/// Auth backend connection and session behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Project URL of the auth backend. Required.
    #[serde(default)]
    pub url: String,

    /// Public (anon) API key. Required.
    #[serde(default)]
    pub anon_key: String,

    /// Refresh the access token in the background before it expires.
    #[serde(default = "default_true")]
    pub auto_refresh_token: bool,

    /// Keep the session in the credential store across launches.
    #[serde(default = "default_true")]
    pub persist_session: bool,

    /// Override for the credential store key. Defaults to
    /// `sb-<project-ref>-auth-token`.
    #[serde(default)]
    pub storage_key: Option<String>,

    /// Refresh once the session is this close to expiry (seconds).
    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_secs: u64,

    /// How often the background refresher checks expiry (seconds).
    #[serde(default = "default_refresh_tick")]
    pub refresh_tick_secs: u64,

    /// First retry delay for a failed refresh (milliseconds).
    #[serde(default = "default_retry_initial")]
    pub refresh_retry_initial_ms: u64,

    /// Give up retrying a refresh after this long (seconds).
    #[serde(default = "default_retry_max_elapsed")]
    pub refresh_retry_max_elapsed_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_refresh_margin() -> u64 {
    90
}

fn default_refresh_tick() -> u64 {
    30
}

fn default_retry_initial() -> u64 {
    200
}

fn default_retry_max_elapsed() -> u64 {
    10
}

impl Default for AuthSettings {
    fn default() -> Self {
        AuthSettings {
            url: String::new(),
            anon_key: String::new(),
            auto_refresh_token: true,
            persist_session: true,
            storage_key: None,
            refresh_margin_secs: default_refresh_margin(),
            refresh_tick_secs: default_refresh_tick(),
            refresh_retry_initial_ms: default_retry_initial(),
            refresh_retry_max_elapsed_secs: default_retry_max_elapsed(),
        }
    }
}

impl AuthSettings {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.trim().is_empty()
    }

    /// Credential store key for the persisted session.
    ///
    /// `sb-<first host label>-auth-token`, e.g. `sb-abcd-auth-token` for
    /// `https://abcd.supabase.co`.
    pub fn storage_key(&self) -> String {
        if let Some(key) = self.storage_key.as_deref().filter(|k| !k.is_empty()) {
            return key.to_string();
        }

        let project_ref = Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.split('.').next().unwrap_or(h).to_string()))
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "local".to_string());

        format!("sb-{}-auth-token", project_ref)
    }

    pub fn refresh_margin(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_margin_secs as i64)
    }

    pub fn refresh_tick(&self) -> Duration {
        Duration::from_secs(self.refresh_tick_secs.max(1))
    }
}

// =============================================================================
// Lookup Settings
// =============================================================================

/// Product database client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupSettings {
    #[serde(default = "default_product_api_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout. `None` leaves the HTTP client default in place.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_product_api_url() -> String {
    DEFAULT_PRODUCT_API_URL.to_string()
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

impl Default for LookupSettings {
    fn default() -> Self {
        LookupSettings {
            base_url: default_product_api_url(),
            user_agent: default_user_agent(),
            timeout_secs: None,
        }
    }
}

// =============================================================================
// Scanner / Storage Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerSettings {
    /// Delay after a settled lookup before the next scan is accepted.
    #[serde(default = "default_cooldown")]
    pub cooldown_ms: u64,
}

fn default_cooldown() -> u64 {
    SCAN_COOLDOWN_MS
}

impl Default for ScannerSettings {
    fn default() -> Self {
        ScannerSettings {
            cooldown_ms: default_cooldown(),
        }
    }
}

impl ScannerSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,

    /// SQLite file, also used when the keyring is unreachable. Defaults to
    /// the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub lookup: LookupSettings,

    #[serde(default)]
    pub scanner: ScannerSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (config.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults (plus environment) if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            let mut config = Self::default();
            config.apply_env_overrides();
            config
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ClientResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ClientError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClientError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ClientError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Checks the values that are present. Missing auth credentials are not
    /// an error here; see [`AuthSettings::is_configured`].
    pub fn validate(&self) -> ClientResult<()> {
        if !self.auth.url.trim().is_empty() {
            validate_http_url("auth.url", &self.auth.url)?;
        }

        validate_http_url("lookup.base_url", &self.lookup.base_url)?;

        if self.lookup.user_agent.trim().is_empty() {
            return Err(ClientError::InvalidConfig(
                "lookup.user_agent must not be empty".into(),
            ));
        }

        if self.scanner.cooldown_ms == 0 {
            return Err(ClientError::InvalidConfig(
                "scanner.cooldown_ms must be greater than 0".into(),
            ));
        }

        if self.auth.refresh_tick_secs == 0 {
            return Err(ClientError::InvalidConfig(
                "auth.refresh_tick_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `EASYHEALTH_*` environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from any variable source.
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var(ENV_SUPABASE_URL) {
            debug!(url = %url, "Overriding auth URL from environment");
            self.auth.url = url;
        }

        if let Some(key) = var(ENV_SUPABASE_ANON_KEY) {
            self.auth.anon_key = key;
        }

        if let Some(url) = var(ENV_PRODUCT_API_URL) {
            debug!(url = %url, "Overriding product API URL from environment");
            self.lookup.base_url = url;
        }

        if let Some(agent) = var(ENV_USER_AGENT) {
            self.lookup.user_agent = agent;
        }

        if let Some(raw) = var(ENV_SCAN_COOLDOWN_MS) {
            match raw.parse::<u64>() {
                Ok(ms) => self.scanner.cooldown_ms = ms,
                Err(_) => warn!(value = %raw, "Ignoring invalid scan cooldown in environment"),
            }
        }

        if let Some(raw) = var(ENV_STORAGE) {
            match raw.parse::<StorageBackend>() {
                Ok(backend) => self.storage.backend = backend,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring storage backend in environment"),
            }
        }

        if let Some(path) = var(ENV_DB_PATH) {
            self.storage.path = Some(PathBuf::from(path));
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "easyhealth", "app")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// SQLite path: explicit setting, else the platform data dir, else the
    /// working directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.storage.path {
            return path.clone();
        }

        directories::ProjectDirs::from("com", "easyhealth", "app")
            .map(|dirs| dirs.data_dir().join(DB_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(DB_FILE_NAME))
    }
}

fn validate_http_url(field: &str, raw: &str) -> ClientResult<()> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ClientError::InvalidUrl(format!("{} '{}': {}", field, raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ClientError::InvalidUrl(format!(
            "{} must use http or https, got {}",
            field, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.lookup.base_url, "https://world.openfoodfacts.net");
        assert_eq!(config.lookup.user_agent, "EasyHealth/1.0");
        assert_eq!(config.scanner.cooldown(), Duration::from_millis(2000));
        assert_eq!(config.storage.backend, StorageBackend::Keyring);
        assert!(config.auth.auto_refresh_token);
        assert!(config.auth.persist_session);
        assert!(!config.auth.is_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [auth]
            url = "https://abcd.supabase.co"
            anon_key = "anon"

            [scanner]
            cooldown_ms = 500

            [storage]
            backend = "sqlite"
            "#,
        )
        .unwrap();

        assert!(config.auth.is_configured());
        assert_eq!(config.auth.refresh_margin_secs, 90);
        assert_eq!(config.scanner.cooldown_ms, 500);
        assert_eq!(config.lookup.user_agent, "EasyHealth/1.0");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_SUPABASE_URL, "http://localhost:54321"),
            (ENV_SUPABASE_ANON_KEY, "local-key"),
            (ENV_SCAN_COOLDOWN_MS, "750"),
            (ENV_STORAGE, "memory"),
            (ENV_DB_PATH, "/tmp/eh.db"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.auth.url, "http://localhost:54321");
        assert_eq!(config.auth.anon_key, "local-key");
        assert_eq!(config.scanner.cooldown_ms, 750);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/eh.db"));
    }

    #[test]
    fn test_bad_override_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(|name| match name {
            ENV_SCAN_COOLDOWN_MS => Some("soon".to_string()),
            ENV_STORAGE => Some("floppy".to_string()),
            _ => None,
        });
        assert_eq!(config.scanner.cooldown_ms, 2000);
        assert_eq!(config.storage.backend, StorageBackend::Keyring);
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.auth.url = "ftp://abcd.supabase.co".into();
        assert!(matches!(config.validate(), Err(ClientError::InvalidUrl(_))));

        config.auth.url = "https://abcd.supabase.co".into();
        assert!(config.validate().is_ok());

        config.lookup.base_url = "not a url".into();
        assert!(config.validate().is_err());

        config.lookup.base_url = DEFAULT_PRODUCT_API_URL.into();
        config.scanner.cooldown_ms = 0;
        assert!(matches!(config.validate(), Err(ClientError::InvalidConfig(_))));
    }

    #[test]
    fn test_storage_key() {
        let mut auth = AuthSettings {
            url: "https://abcd.supabase.co".into(),
            ..Default::default()
        };
        assert_eq!(auth.storage_key(), "sb-abcd-auth-token");

        auth.storage_key = Some("custom".into());
        assert_eq!(auth.storage_key(), "custom");

        auth.storage_key = None;
        auth.url = String::new();
        assert_eq!(auth.storage_key(), "sb-local-auth-token");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.auth.url = "https://abcd.supabase.co".into();
        config.auth.anon_key = "anon".into();
        config.scanner.cooldown_ms = 1234;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[auth]"));
        assert!(contents.contains("[scanner]"));

        let loaded: AppConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.scanner.cooldown_ms, 1234);
        assert_eq!(loaded.auth.url, "https://abcd.supabase.co");
    }
}
