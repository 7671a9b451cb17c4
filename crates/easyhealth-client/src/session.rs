//! # Session Service
//!
//! Sign-up, sign-in, sign-out and session restore against a GoTrue-compatible
//! auth backend, with the session persisted in a [`CredentialStore`].
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Session Lifecycle                               │
//! │                                                                         │
//! │   sign_in / sign_up ──► install ──► memory + store ──► SIGNED_IN        │
//! │                                                                         │
//! │   get_session                                                           │
//! │     memory ─► store (corrupt blob → removed)                            │
//! │       │                                                                 │
//! │       ├─ fresh ─────────────────────────────► Some(session)             │
//! │       ├─ near expiry ─► refresh ─► ok ──────► Some(new) TOKEN_REFRESHED │
//! │       │                  │  transient ──────► Some(old) (still valid)   │
//! │       ├─ expired ──────► refresh ─► transient ► Err                     │
//! │       │                  └ rejected ────────► None      SIGNED_OUT      │
//! │                                                                         │
//! │   sign_out ──► POST /logout (best effort) ──► clear ──► SIGNED_OUT      │
//! │                                                                         │
//! │   auto refresh: ticker ─► near expiry? ─► refresh (with backoff)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Endpoints
//! | Operation | Request                                         |
//! |-----------|-------------------------------------------------|
//! | sign up   | `POST /auth/v1/signup`                          |
//! | sign in   | `POST /auth/v1/token?grant_type=password`       |
//! | refresh   | `POST /auth/v1/token?grant_type=refresh_token`  |
//! | sign out  | `POST /auth/v1/logout`                          |
//!
//! Every request carries `apikey: <anon key>` and an `Authorization: Bearer`
//! header (the anon key, or the access token for sign-out).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use url::Url;

use easyhealth_core::{AuthChangeEvent, Session, User};
use easyhealth_store::CredentialStore;

use crate::config::AuthSettings;
use crate::error::{ClientError, ClientResult};

/// Capacity of the session event channel.
const EVENT_CAPACITY: usize = 16;

// =============================================================================
// Public Types
// =============================================================================

/// A session change, as delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

impl AuthChange {
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }
}

/// How a successful sign-up ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// The backend issued a session straight away.
    SignedIn(Session),
    /// The account exists but the email must be confirmed first.
    ConfirmationRequired(User),
}

/// The authentication backend as the rest of the app sees it.
#[async_trait]
pub trait SessionService: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> ClientResult<SignUpOutcome>;

    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<Session>;

    /// Ends the session. The local session is cleared even if the backend
    /// call fails.
    async fn sign_out(&self) -> ClientResult<()>;

    /// Current session, restored from storage and refreshed if needed.
    async fn get_session(&self) -> ClientResult<Option<Session>>;

    /// Session change events. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> ClientResult<Session> {
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(ts), _) => DateTime::from_timestamp(ts, 0),
            (None, Some(secs)) => Some(now + chrono::Duration::seconds(secs)),
            (None, None) => None,
        }
        .ok_or_else(|| ClientError::InvalidResponse("token response without expiry".into()))?;

        Ok(Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
            expires_at,
            user: self.user,
        })
    }
}

/// Sign-up answers with a session when no confirmation is needed, otherwise
/// with the bare user (older servers wrap it in `user`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(User),
    Wrapped { user: User },
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
    }
}

async fn error_from_response(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    if (400..500).contains(&status) && status != 429 {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| format!("Request rejected with status {}", status));
        ClientError::AuthRejected { status, message }
    } else {
        ClientError::UnexpectedStatus { status, body }
    }
}

// =============================================================================
// Supabase Session Service
// =============================================================================

/// [`SessionService`] backed by Supabase Auth (GoTrue).
pub struct SupabaseSessionService {
    http: Client,
    auth_url: String,
    anon_key: String,
    store: Arc<dyn CredentialStore>,
    storage_key: String,
    persist_session: bool,
    refresh_margin: chrono::Duration,
    retry_initial: Duration,
    retry_max_elapsed: Duration,
    session: Arc<RwLock<Option<Session>>>,
    events: broadcast::Sender<AuthChange>,
    refresh_lock: Mutex<()>,
}

impl SupabaseSessionService {
    pub fn new(settings: &AuthSettings, store: Arc<dyn CredentialStore>) -> ClientResult<Self> {
        if !settings.is_configured() {
            return Err(ClientError::InvalidConfig(
                "auth.url and auth.anon_key are required".into(),
            ));
        }

        let base = Url::parse(settings.url.trim())?;
        let auth_url = format!("{}/auth/v1", base.as_str().trim_end_matches('/'));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        info!(auth_url = %auth_url, persist = settings.persist_session, "Session service ready");

        Ok(SupabaseSessionService {
            http: Client::builder().build()?,
            auth_url,
            anon_key: settings.anon_key.trim().to_string(),
            store,
            storage_key: settings.storage_key(),
            persist_session: settings.persist_session,
            refresh_margin: settings.refresh_margin(),
            retry_initial: Duration::from_millis(settings.refresh_retry_initial_ms),
            retry_max_elapsed: Duration::from_secs(settings.refresh_retry_max_elapsed_secs),
            session: Arc::new(RwLock::new(None)),
            events,
            refresh_lock: Mutex::new(()),
        })
    }

    /// Overrides the refresh retry schedule.
    pub fn with_retry_policy(mut self, initial: Duration, max_elapsed: Duration) -> Self {
        self.retry_initial = initial;
        self.retry_max_elapsed = max_elapsed;
        self
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// In-memory session, without restore or refresh.
    pub async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Starts the background refresher. Abort the handle to stop it.
    pub fn spawn_auto_refresh(self: &Arc<Self>, tick: Duration) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!(tick_secs = tick.as_secs(), "Auto refresh started");
            loop {
                interval.tick().await;
                service.refresh_tick().await;
            }
        })
    }

    async fn refresh_tick(&self) {
        let Some(session) = self.current_session().await else {
            return;
        };
        if !session.needs_refresh(Utc::now(), self.refresh_margin) {
            return;
        }

        match self.refresh(&session).await {
            Ok(Some(_)) => {}
            Ok(None) => info!("Session ended by the auth backend"),
            Err(e) => warn!(error = %e, "Background session refresh failed"),
        }
    }

    // =========================================================================
    // HTTP
    // =========================================================================

    fn post(&self, path: &str, bearer: &str) -> RequestBuilder {
        self.http
            .post(format!("{}{}", self.auth_url, path))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn request_token(&self, grant_type: &str, body: serde_json::Value) -> ClientResult<Session> {
        let response = self
            .post("/token", &self.anon_key)
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let token: TokenResponse = serde_json::from_str(&response.text().await?)?;
        token.into_session(Utc::now())
    }

    async fn refresh_with_backoff(&self, refresh_token: &str) -> ClientResult<Session> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.retry_initial)
            .with_max_elapsed_time(Some(self.retry_max_elapsed))
            .build();

        let this = self;
        let refresh_token = refresh_token.to_string();
        let operation = move || {
            let token = refresh_token.clone();
            async move {
                this.request_token("refresh_token", json!({ "refresh_token": token }))
                    .await
                    .map_err(|e| {
                        if e.is_retryable() {
                            debug!(error = %e, "Session refresh failed, retrying");
                            backoff::Error::transient(e)
                        } else {
                            backoff::Error::permanent(e)
                        }
                    })
            }
        };

        backoff::future::retry(policy, operation).await
    }

    // =========================================================================
    // Local State
    // =========================================================================

    async fn install(&self, session: Session, event: AuthChangeEvent) {
        *self.session.write().await = Some(session.clone());

        if self.persist_session {
            match serde_json::to_string(&session) {
                Ok(blob) => {
                    if let Err(e) = self.store.set_item(&self.storage_key, &blob).await {
                        warn!(error = %e, "Failed to persist session");
                    }
                }
                Err(e) => warn!(error = %e, "Failed to serialize session"),
            }
        }

        debug!(event = %event, expires_at = %session.expires_at, "Session installed");
        self.emit(event, Some(session));
    }

    async fn clear(&self) {
        *self.session.write().await = None;

        if let Err(e) = self.store.remove_item(&self.storage_key).await {
            warn!(error = %e, "Failed to remove persisted session");
        }

        self.emit(AuthChangeEvent::SignedOut, None);
    }

    fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
        // No receivers is fine.
        let _ = self.events.send(AuthChange { event, session });
    }

    async fn load_persisted(&self) -> Option<Session> {
        if !self.persist_session {
            return None;
        }

        let raw = match self.store.get_item(&self.storage_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                return None;
            }
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => {
                debug!(user_id = %session.user.id, "Restored persisted session");
                Some(session)
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted session");
                if let Err(e) = self.store.remove_item(&self.storage_key).await {
                    warn!(error = %e, "Failed to remove persisted session");
                }
                None
            }
        }
    }

    /// Refreshes `seen` unless another caller already did.
    ///
    /// `Ok(None)` means the backend rejected the refresh token and the
    /// session has been cleared.
    async fn refresh(&self, seen: &Session) -> ClientResult<Option<Session>> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.session.read().await.as_ref() {
            if current.refresh_token != seen.refresh_token {
                return Ok(Some(current.clone()));
            }
        }

        match self.refresh_with_backoff(&seen.refresh_token).await {
            Ok(fresh) => {
                info!(user_id = %fresh.user.id, expires_at = %fresh.expires_at, "Session refreshed");
                self.install(fresh.clone(), AuthChangeEvent::TokenRefreshed)
                    .await;
                Ok(Some(fresh))
            }
            Err(e) if e.is_retryable() => Err(e),
            Err(e) => {
                warn!(error = %e, "Refresh token rejected, signing out");
                self.clear().await;
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl SessionService for SupabaseSessionService {
    async fn sign_up(&self, email: &str, password: &str) -> ClientResult<SignUpOutcome> {
        let response = self
            .post("/signup", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let err = error_from_response(response).await;
            warn!(error = %err, "Sign-up rejected");
            return Err(err);
        }

        let parsed: SignUpResponse = serde_json::from_str(&response.text().await?)?;
        match parsed {
            SignUpResponse::Session(token) => {
                let session = token.into_session(Utc::now())?;
                info!(user_id = %session.user.id, "Signed up and signed in");
                self.install(session.clone(), AuthChangeEvent::SignedIn)
                    .await;
                Ok(SignUpOutcome::SignedIn(session))
            }
            SignUpResponse::User(user) | SignUpResponse::Wrapped { user } => {
                info!(user_id = %user.id, "Signed up, email confirmation pending");
                Ok(SignUpOutcome::ConfirmationRequired(user))
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<Session> {
        let session = self
            .request_token("password", json!({ "email": email, "password": password }))
            .await
            .map_err(|e| {
                warn!(error = %e, "Sign-in failed");
                e
            })?;

        info!(user_id = %session.user.id, "Signed in");
        self.install(session.clone(), AuthChangeEvent::SignedIn)
            .await;
        Ok(session)
    }

    async fn sign_out(&self) -> ClientResult<()> {
        if let Some(session) = self.current_session().await {
            let result = self.post("/logout", &session.access_token).send().await;
            match result {
                Ok(response) if response.status().is_success() => {
                    debug!("Session revoked on server");
                }
                Ok(response) => {
                    warn!(status = response.status().as_u16(), "Failed to revoke session on server");
                }
                Err(e) => warn!(error = %e, "Failed to revoke session on server"),
            }
        }

        self.clear().await;
        info!("Signed out");
        Ok(())
    }

    async fn get_session(&self) -> ClientResult<Option<Session>> {
        let in_memory = self.current_session().await;
        let restored = match in_memory.clone() {
            Some(session) => Some(session),
            None => self.load_persisted().await,
        };
        let Some(session) = restored else {
            return Ok(None);
        };

        let now = Utc::now();
        if !session.needs_refresh(now, self.refresh_margin) {
            if in_memory.is_none() {
                *self.session.write().await = Some(session.clone());
            }
            return Ok(Some(session));
        }

        match self.refresh(&session).await {
            Ok(result) => Ok(result),
            Err(e) if !session.is_expired(now) => {
                warn!(error = %e, "Refresh failed, keeping the still-valid session");
                if in_memory.is_none() {
                    *self.session.write().await = Some(session.clone());
                }
                Ok(Some(session))
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
