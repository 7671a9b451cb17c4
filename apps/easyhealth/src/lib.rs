//! # EasyHealth App Library
//!
//! Wires the crates into a running app and drives it from a line-oriented shell.
//!
//! ## Module Organization
//! ```text
//! easyhealth_lib/
//! ├── lib.rs          ◄─── You are here (startup & run)
//! ├── state/
//! │   ├── mod.rs      ◄─── AppState: auth, navigation, scanner, camera
//! │   └── camera.rs   ◄─── Camera permission + torch
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command exports
//! │   ├── auth.rs     ◄─── Sign up / in / out
//! │   ├── navigation.rs
//! │   ├── scan.rs     ◄─── Barcode callback + product panel
//! │   └── camera.rs
//! ├── shell.rs        ◄─── stdin command loop
//! └── error.rs        ◄─── API error type for commands
//! ```

pub mod commands;
pub mod error;
pub mod shell;
pub mod state;

use tokio::io::{stdin, stdout, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use easyhealth_client::AppConfig;
use easyhealth_store::open_store;

use state::AppState;

/// Runs the app until stdin closes, `quit` is entered or Ctrl-C arrives.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Application Startup                               │
/// │                                                                         │
/// │  1. Initialize Logging ───────────────────────────────────────────────► │
/// │     • tracing-subscriber with env filter, written to stderr             │
/// │     • Default: INFO, can be overridden with RUST_LOG                    │
/// │                                                                         │
/// │  2. Load Configuration ───────────────────────────────────────────────► │
/// │     • config.toml (if present) then EASYHEALTH_* / SUPABASE_* env       │
/// │                                                                         │
/// │  3. Open Credential Store ────────────────────────────────────────────► │
/// │     • OS keyring, else 0600 SQLite under the platform data dir          │
/// │                                                                         │
/// │  4. Start Services ───────────────────────────────────────────────────► │
/// │     • Session service (+ auto refresh), product lookup                  │
/// │     • Auth controller restores any stored session                       │
/// │     • Navigator + scanner                                               │
/// │                                                                         │
/// │  5. Shell ────────────────────────────────────────────────────────────► │
/// │     • One command per line on stdin, replies on stdout                  │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting EasyHealth");

    let config = AppConfig::load_or_default(None);
    let db_path = config.database_path();
    info!(backend = ?config.storage.backend, ?db_path, "Opening credential store");

    let store = open_store(config.storage.backend, &db_path).await?;
    let state = AppState::start(config, store).await?;

    info!("State initialized");

    tokio::select! {
        result = shell::run(&state, BufReader::new(stdin()), stdout()) => result?,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Failed to listen for Ctrl-C");
            }
        }
    }

    info!("Shutting down");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=easyhealth_client=trace` - Trace the service layer only
/// - Default: INFO, DEBUG for the app
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,easyhealth=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
