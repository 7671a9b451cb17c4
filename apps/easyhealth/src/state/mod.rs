//! # State Module
//!
//! Everything the commands operate on, built once at start-up and passed
//! around explicitly.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          AppState                                       │
//! │                                                                         │
//! │  ┌────────────────┐  watch   ┌────────────────┐                         │
//! │  │ AuthController │─────────►│   Navigator    │                         │
//! │  └───────┬────────┘          └────────────────┘                         │
//! │          │                                                              │
//! │  ┌───────▼────────┐          ┌────────────────┐   ┌──────────────────┐  │
//! │  │ SessionService │          │ScanOrchestrator│   │   CameraState    │  │
//! │  │ (+ refresher)  │          │ (ProductLookup)│   │ permission/torch │  │
//! │  └────────────────┘          └────────────────┘   └──────────────────┘  │
//! │                                                                         │
//! │  AppConfig: read-only after start-up                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod camera;

pub use camera::{Camera, CameraState};

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use easyhealth_client::{
    AppConfig, AuthController, ClientResult, Navigator, OpenFoodFactsClient, ProductLookup,
    ScanOrchestrator, SessionService, SupabaseSessionService,
};
use easyhealth_store::CredentialStore;

pub struct AppState {
    pub config: AppConfig,
    pub auth: Arc<AuthController>,
    pub navigator: Navigator,
    pub scanner: ScanOrchestrator,
    pub camera: CameraState,
    refresher: Option<JoinHandle<()>>,
}

impl AppState {
    /// Wires the production services on top of an opened credential store.
    pub async fn start(config: AppConfig, store: Arc<dyn CredentialStore>) -> ClientResult<Self> {
        let session = Arc::new(SupabaseSessionService::new(&config.auth, store)?);
        let refresher = config
            .auth
            .auto_refresh_token
            .then(|| session.spawn_auto_refresh(config.auth.refresh_tick()));

        let lookup = Arc::new(OpenFoodFactsClient::from_settings(&config.lookup)?);

        let mut state = Self::with_services(config, session, lookup).await;
        state.refresher = refresher;
        Ok(state)
    }

    /// Builds state from already constructed services and restores auth.
    pub async fn with_services(
        config: AppConfig,
        session: Arc<dyn SessionService>,
        lookup: Arc<dyn ProductLookup>,
    ) -> Self {
        let auth = Arc::new(AuthController::new(session));
        let navigator = Navigator::new(auth.subscribe());
        let scanner = ScanOrchestrator::new(lookup, config.scanner.cooldown());

        auth.initialize().await;
        info!(
            signed_in = auth.snapshot().is_signed_in(),
            cooldown_ms = config.scanner.cooldown_ms,
            "App state initialized"
        );

        AppState {
            config,
            auth,
            navigator,
            scanner,
            camera: CameraState::new(),
            refresher: None,
        }
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        if let Some(handle) = self.refresher.take() {
            handle.abort();
        }
    }
}
