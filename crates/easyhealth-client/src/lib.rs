//! # easyhealth-client: Services and Controllers for EasyHealth
//!
//! The async half of the app. Core decides; this crate performs the I/O and
//! publishes the resulting state.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          easyhealth-client                              │
//! │                                                                         │
//! │  ┌──────────────────┐   watch<AuthSnapshot>   ┌──────────────────────┐  │
//! │  │  AuthController  │────────────────────────►│  Navigator           │  │
//! │  └────────┬─────────┘                         │  watch<NavState>     │  │
//! │           │ broadcast<AuthChange>             └──────────────────────┘  │
//! │  ┌────────▼─────────┐   ┌──────────────────┐                            │
//! │  │  SessionService  │──►│ CredentialStore  │  (easyhealth-store)        │
//! │  │  (GoTrue REST)   │   └──────────────────┘                            │
//! │  └──────────────────┘                                                   │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐                            │
//! │  │ ScanOrchestrator │──►│  ProductLookup   │  (Open Food Facts)         │
//! │  │ watch<ScanState> │   └──────────────────┘                            │
//! │  └──────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - `AppConfig` (TOML + env + defaults)
//! - [`error`] - Client error types
//! - [`lookup`] - Product lookup client
//! - [`session`] - Session service and persistence
//! - [`auth`] - Auth state controller
//! - [`navigator`] - Route gate
//! - [`scanner`] - Scan orchestrator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use easyhealth_client::{AppConfig, AuthController, SupabaseSessionService};
//!
//! let config = AppConfig::load_or_default(None);
//! let service = Arc::new(SupabaseSessionService::new(&config.auth, store)?);
//! let auth = AuthController::new(service);
//! auth.initialize().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod config;
pub mod error;
pub mod lookup;
pub mod navigator;
pub mod scanner;
pub mod session;

// =============================================================================
// Re-exports
// =============================================================================

pub use auth::{AuthController, AuthSnapshot};
pub use config::{AppConfig, AuthSettings, LookupSettings, ScannerSettings, StorageSettings};
pub use error::{ClientError, ClientResult};
pub use lookup::{LookupOutcome, OpenFoodFactsClient, ProductLookup};
pub use navigator::{NavigationState, Navigator};
pub use scanner::{ScanOrchestrator, ScanOutcome};
pub use session::{AuthChange, SessionService, SignUpOutcome, SupabaseSessionService};
