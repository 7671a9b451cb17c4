//! # Auth Controller
//!
//! App-wide authentication state: who is signed in, and whether we know yet.
//!
//! ```text
//!   SessionService ──events──► listener task ──► watch<AuthSnapshot>
//!         ▲                                             │
//!         │ sign_up / sign_in / sign_out                ├──► Navigator
//!         │ (validated first)                           └──► UI
//!   AuthController
//! ```
//!
//! The controller never sets `user` from a sign-in or sign-up result. The user
//! changes only through session events, so every path (including a refresh
//! token rejected in the background) updates state the same way.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{watch, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use easyhealth_core::validation::{validate_sign_in, validate_sign_up};
use easyhealth_core::User;

use crate::error::ClientResult;
use crate::session::{SessionService, SignUpOutcome};

/// What subscribers see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    /// True until the first session restore has finished.
    pub loading: bool,
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        AuthSnapshot {
            user: None,
            loading: true,
        }
    }
}

impl AuthSnapshot {
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

pub struct AuthController {
    service: Arc<dyn SessionService>,
    state: Arc<watch::Sender<AuthSnapshot>>,
    initialized: OnceCell<()>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl AuthController {
    pub fn new(service: Arc<dyn SessionService>) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::default());
        AuthController {
            service,
            state: Arc::new(state),
            initialized: OnceCell::new(),
            listener: Mutex::new(None),
        }
    }

    /// Subscribes to session events and restores the persisted session.
    ///
    /// Runs once per controller; later calls return immediately.
    pub async fn initialize(&self) {
        self.initialized.get_or_init(|| self.start()).await;
    }

    async fn start(&self) {
        // Subscribe before restoring so no event between the two is lost.
        let events = self.service.subscribe();
        let handle = tokio::spawn(listen(
            events,
            Arc::clone(&self.state),
            Arc::clone(&self.service),
        ));
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        let user = match self.service.get_session().await {
            Ok(session) => session.map(|s| s.user),
            Err(e) => {
                warn!(error = %e, "Session restore failed, starting signed out");
                None
            }
        };

        info!(signed_in = user.is_some(), "Auth state restored");
        self.state.send_modify(|snapshot| {
            snapshot.user = user;
            snapshot.loading = false;
        });
    }

    /// Receives every change; dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Validates the form, then creates the account.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> ClientResult<SignUpOutcome> {
        validate_sign_up(email, password, confirmation)?;
        self.service.sign_up(email.trim(), password).await
    }

    /// Validates the form, then signs in.
    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<()> {
        validate_sign_in(email, password)?;
        self.service.sign_in(email.trim(), password).await?;
        Ok(())
    }

    pub async fn sign_out(&self) -> ClientResult<()> {
        self.service.sign_out().await
    }
}

impl Drop for AuthController {
    fn drop(&mut self) {
        if let Some(handle) = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

async fn listen(
    mut events: tokio::sync::broadcast::Receiver<crate::session::AuthChange>,
    state: Arc<watch::Sender<AuthSnapshot>>,
    service: Arc<dyn SessionService>,
) {
    loop {
        match events.recv().await {
            Ok(change) => {
                debug!(event = %change.event, "Session event");
                apply_user(&state, change.session.map(|s| s.user));
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Missed session events, re-reading session");
                let user = match service.get_session().await {
                    Ok(session) => session.map(|s| s.user),
                    Err(e) => {
                        warn!(error = %e, "Session re-read failed");
                        continue;
                    }
                };
                apply_user(&state, user);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Notifies only when the user actually changed.
fn apply_user(state: &watch::Sender<AuthSnapshot>, user: Option<User>) {
    state.send_if_modified(|snapshot| {
        if snapshot.user == user {
            false
        } else {
            snapshot.user = user;
            true
        }
    });
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::session::AuthChange;
    use async_trait::async_trait;
    use chrono::Utc;
    use easyhealth_core::{AuthChangeEvent, Session, ValidationError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::broadcast;
    use uuid::Uuid;

    /// Scriptable in-process session backend.
    pub(crate) struct FakeSessions {
        events: broadcast::Sender<AuthChange>,
        session: Mutex<Option<Session>>,
        pub calls: AtomicUsize,
        pub restores: AtomicUsize,
    }

    impl FakeSessions {
        pub(crate) fn new(restored: Option<Session>) -> Arc<Self> {
            let (events, _) = broadcast::channel(16);
            Arc::new(FakeSessions {
                events,
                session: Mutex::new(restored),
                calls: AtomicUsize::new(0),
                restores: AtomicUsize::new(0),
            })
        }

        pub(crate) fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
            *self.session.lock().unwrap() = session.clone();
            let _ = self.events.send(AuthChange { event, session });
        }
    }

    pub(crate) fn session_for(email: &str) -> Session {
        Session {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "bearer".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            user: User {
                id: Uuid::new_v4(),
                email: Some(email.to_string()),
            },
        }
    }

    #[async_trait]
    impl SessionService for FakeSessions {
        async fn sign_up(&self, email: &str, _password: &str) -> ClientResult<SignUpOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SignUpOutcome::ConfirmationRequired(session_for(email).user))
        }

        async fn sign_in(&self, email: &str, password: &str) -> ClientResult<Session> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if password == "wrong-pass" {
                return Err(ClientError::AuthRejected {
                    status: 400,
                    message: "Invalid login credentials".to_string(),
                });
            }
            let session = session_for(email);
            self.emit(AuthChangeEvent::SignedIn, Some(session.clone()));
            Ok(session)
        }

        async fn sign_out(&self) -> ClientResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.emit(AuthChangeEvent::SignedOut, None);
            Ok(())
        }

        async fn get_session(&self) -> ClientResult<Option<Session>> {
            self.restores.fetch_add(1, Ordering::SeqCst);
            Ok(self.session.lock().unwrap().clone())
        }

        fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
            self.events.subscribe()
        }
    }

    #[tokio::test]
    async fn test_loading_until_initialized() {
        let controller = AuthController::new(FakeSessions::new(None));
        assert!(controller.is_loading());

        controller.initialize().await;
        let snapshot = controller.snapshot();
        assert!(!snapshot.loading);
        assert!(snapshot.user.is_none());
    }

    #[tokio::test]
    async fn test_restores_persisted_user() {
        let restored = session_for("ada@example.com");
        let controller = AuthController::new(FakeSessions::new(Some(restored.clone())));

        controller.initialize().await;
        assert_eq!(controller.user(), Some(restored.user));
    }

    #[tokio::test]
    async fn test_initialize_runs_once() {
        let fake = FakeSessions::new(None);
        let controller = AuthController::new(fake.clone());

        controller.initialize().await;
        controller.initialize().await;
        assert_eq!(fake.restores.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_service() {
        let fake = FakeSessions::new(None);
        let controller = AuthController::new(fake.clone());
        controller.initialize().await;

        let err = controller.sign_in("", "secret1").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(ValidationError::MissingFields)));

        let err = controller.sign_in("ada.example.com", "secret1").await.unwrap_err();
        assert_eq!(err.user_message(), "Please enter a valid email");

        let err = controller
            .sign_up("ada@example.com", "secret1", "secret2")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Passwords do not match");

        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_user_follows_session_events() {
        let controller = AuthController::new(FakeSessions::new(None));
        controller.initialize().await;
        let mut rx = controller.subscribe();

        controller.sign_in(" ada@example.com ", "secret1").await.unwrap();
        let snapshot = rx.wait_for(|s| s.user.is_some()).await.unwrap().clone();
        assert_eq!(
            snapshot.user.and_then(|u| u.email).as_deref(),
            Some("ada@example.com")
        );

        controller.sign_out().await.unwrap();
        rx.wait_for(|s| s.user.is_none()).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_sign_in_leaves_user_unset() {
        let controller = AuthController::new(FakeSessions::new(None));
        controller.initialize().await;

        let err = controller
            .sign_in("ada@example.com", "wrong-pass")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Invalid login credentials");
        assert!(controller.user().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_events_do_not_notify() {
        let fake = FakeSessions::new(None);
        let controller = AuthController::new(fake.clone());
        controller.initialize().await;
        let mut rx = controller.subscribe();

        let session = session_for("ada@example.com");
        fake.emit(AuthChangeEvent::SignedIn, Some(session.clone()));
        rx.changed().await.unwrap();
        rx.borrow_and_update();

        fake.emit(AuthChangeEvent::TokenRefreshed, Some(session.clone()));
        fake.emit(AuthChangeEvent::SignedOut, None);
        rx.changed().await.unwrap();

        // The duplicate was skipped, so the next change seen is the sign-out.
        assert!(rx.borrow_and_update().user.is_none());
    }

    #[tokio::test]
    async fn test_external_sign_out_clears_user() {
        let fake = FakeSessions::new(Some(session_for("ada@example.com")));
        let controller = AuthController::new(fake.clone());
        controller.initialize().await;
        assert!(controller.snapshot().is_signed_in());

        let mut rx = controller.subscribe();
        fake.emit(AuthChangeEvent::SignedOut, None);
        rx.wait_for(|s| s.user.is_none()).await.unwrap();
    }
}
