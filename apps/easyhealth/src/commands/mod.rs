//! # Commands Module
//!
//! Every action the UI (here: the shell) can take.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs         ◄─── You are here (exports)
//! ├── auth.rs        ◄─── sign_up, sign_in, sign_out, current_user
//! ├── navigation.rs  ◄─── navigate, current_route
//! ├── scan.rs        ◄─── barcode_scanned, start_scan, dismiss_panel, scan_state, product_card
//! └── camera.rs      ◄─── toggle_torch, set_camera_permission, scanner_view
//! ```
//!
//! Each command takes `&AppState` plus its arguments and returns
//! `Result<T, ApiError>`; `T` and `ApiError` are both serializable.

pub mod auth;
pub mod camera;
pub mod navigation;
pub mod scan;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use easyhealth_client::AppConfig;
    use easyhealth_core::navigation::{GateState, Route};
    use easyhealth_core::permission::CameraPermission;
    use easyhealth_store::MemoryCredentialStore;

    use super::*;
    use crate::error::ErrorCode;
    use crate::state::AppState;

    const USER_ID: &str = "6f1c1d2e-8c55-4a0e-9d0c-2b2f7f1d9a11";

    async fn state_for(server: &MockServer) -> AppState {
        let mut config = AppConfig::default();
        config.auth.url = server.uri();
        config.auth.anon_key = "anon-key".to_string();
        config.auth.auto_refresh_token = false;
        config.lookup.base_url = server.uri();

        AppState::start(config, Arc::new(MemoryCredentialStore::new()))
            .await
            .unwrap()
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "token_type": "bearer",
                "expires_in": 3600,
                "user": { "id": USER_ID, "email": "ada@example.com" }
            })))
            .mount(server)
            .await;
    }

    async fn mount_logout(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(204))
            .mount(server)
            .await;
    }

    async fn mount_product(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/v2/product/3017620422003.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "3017620422003",
                "status": 1,
                "product": {
                    "product_name": "Nutella",
                    "brands": "Ferrero",
                    "nutrition_grades": "e",
                    "nova_group": 4,
                    "nutrient_levels": { "sugars": "high" }
                }
            })))
            .mount(server)
            .await;
    }

    async fn signed_in(server: &MockServer) -> AppState {
        mount_login(server).await;
        let state = state_for(server).await;
        auth::sign_in(&state, "ada@example.com", "secret1").await.unwrap();
        state
            .auth
            .subscribe()
            .wait_for(|s| s.user.is_some())
            .await
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_starts_on_login_when_signed_out() {
        let server = MockServer::start().await;
        let state = state_for(&server).await;

        let mut nav = state.navigator.subscribe();
        let current = *nav.wait_for(|n| n.route.is_some()).await.unwrap();
        assert_eq!(current.route, Some(Route::Login));
        assert_eq!(auth::current_user(&state).unwrap(), None);
    }

    #[tokio::test]
    async fn test_sign_in_moves_to_scanner() {
        let server = MockServer::start().await;
        let state = signed_in(&server).await;

        let mut nav = state.navigator.subscribe();
        nav.wait_for(|n| n.route == Some(Route::Home)).await.unwrap();

        let user = auth::current_user(&state).unwrap().unwrap();
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn test_sign_in_validation_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let state = state_for(&server).await;

        let err = auth::sign_in(&state, "", "").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.title, "Error");
        assert_eq!(err.message, "Please fill in all fields");

        let err = auth::sign_in(&state, "ada@example.com", "12345").await.unwrap_err();
        assert_eq!(err.message, "Password must be at least 6 characters");
    }

    #[tokio::test]
    async fn test_sign_in_rejection_alert() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;
        let state = state_for(&server).await;

        let err = auth::sign_in(&state, "ada@example.com", "wrong-pass")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthError);
        assert_eq!(err.title, "Login Failed");
        assert_eq!(err.message, "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_sign_up_needing_confirmation_returns_to_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": USER_ID,
                "email": "ada@example.com"
            })))
            .mount(&server)
            .await;
        let state = state_for(&server).await;
        state
            .navigator
            .subscribe()
            .wait_for(|n| n.route.is_some())
            .await
            .unwrap();
        navigation::navigate(&state, "/auth/signup").unwrap();

        let reply = auth::sign_up(&state, "ada@example.com", "secret1", "secret1")
            .await
            .unwrap();
        assert_eq!(reply.notice.as_deref(), Some(auth::CONFIRM_EMAIL_NOTICE));
        assert_eq!(reply.navigation.route, Some(Route::Login));
        assert!(auth::current_user(&state).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_up_with_session_replies_with_tabs_route() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "token_type": "bearer",
                "expires_in": 3600,
                "user": { "id": USER_ID, "email": "ada@example.com" }
            })))
            .mount(&server)
            .await;
        let state = state_for(&server).await;
        state
            .navigator
            .subscribe()
            .wait_for(|n| n.route == Some(Route::Login))
            .await
            .unwrap();

        let reply = auth::sign_up(&state, "ada@example.com", "secret1", "secret1")
            .await
            .unwrap();
        assert_eq!(reply.notice, None);
        assert_eq!(reply.navigation.gate, GateState::Authenticated);
        assert_eq!(reply.navigation.route, Some(Route::Home));
    }

    #[tokio::test]
    async fn test_sign_up_mismatch_is_local() {
        let server = MockServer::start().await;
        let state = state_for(&server).await;

        let err = auth::sign_up(&state, "ada@example.com", "secret1", "secret2")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "Passwords do not match");
    }

    #[tokio::test]
    async fn test_navigation_is_gated() {
        let server = MockServer::start().await;
        let state = state_for(&server).await;
        state
            .navigator
            .subscribe()
            .wait_for(|n| n.route.is_some())
            .await
            .unwrap();

        let nav = navigation::navigate(&state, "/(tabs)/explore").unwrap();
        assert_eq!(nav.route, Some(Route::Login));

        let err = navigation::navigate(&state, "/nowhere").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(
            navigation::current_route(&state).unwrap().route,
            Some(Route::Login)
        );
    }

    #[tokio::test]
    async fn test_scan_requires_sign_in_and_camera() {
        let server = MockServer::start().await;
        let state = state_for(&server).await;
        camera::set_camera_permission(&state, CameraPermission::Granted).unwrap();

        let err = scan::barcode_scanned(&state, "3017620422003", None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotSignedIn);

        let state = signed_in(&server).await;
        let err = scan::barcode_scanned(&state, "3017620422003", None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CameraUnavailable);
    }

    #[tokio::test]
    async fn test_scan_opens_panel_and_dismiss_clears() {
        let server = MockServer::start().await;
        mount_product(&server).await;
        let state = signed_in(&server).await;
        camera::set_camera_permission(&state, CameraPermission::Granted).unwrap();

        let reply = scan::barcode_scanned(&state, "3017620422003", Some("EAN-13"))
            .await
            .unwrap();
        let scan::ScanReply::PanelOpened { card } = reply else {
            panic!("expected the panel to open");
        };
        assert_eq!(card.title, "Nutella");
        assert_eq!(card.nutri_score.map(|b| b.label).as_deref(), Some("E"));
        assert_eq!(card.nova.map(|b| b.label).as_deref(), Some("NOVA 4"));
        assert_eq!(card.snap_points, easyhealth_core::panel::SNAP_POINTS);

        let reply = scan::barcode_scanned(&state, "3017620422003", None)
            .await
            .unwrap();
        assert_eq!(reply, scan::ScanReply::Ignored { reason: "cooling_down" });
        assert!(scan::product_card(&state).unwrap().is_some());

        let after = scan::dismiss_panel(&state).unwrap();
        assert!(after.product.is_none());
        assert!(!after.is_scanning);
        assert!(scan::scan_state(&state).unwrap().product.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_format_is_rejected() {
        let server = MockServer::start().await;
        let state = signed_in(&server).await;
        camera::set_camera_permission(&state, CameraPermission::Granted).unwrap();

        let err = scan::barcode_scanned(&state, "3017620422003", Some("qr"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "Unsupported barcode format: qr");
    }

    #[tokio::test]
    async fn test_torch_needs_camera() {
        let server = MockServer::start().await;
        let state = state_for(&server).await;

        let err = camera::toggle_torch(&state).unwrap_err();
        assert_eq!(err.code, ErrorCode::CameraUnavailable);

        camera::set_camera_permission(&state, CameraPermission::Granted).unwrap();
        assert!(camera::toggle_torch(&state).unwrap());
        assert_eq!(
            camera::scanner_view(&state).unwrap(),
            easyhealth_core::permission::ScannerView::Camera
        );
    }

    #[tokio::test]
    async fn test_sign_out_returns_to_login() {
        let server = MockServer::start().await;
        mount_logout(&server).await;
        let state = signed_in(&server).await;
        navigation::navigate(&state, "explore").unwrap();

        auth::sign_out(&state).await.unwrap();
        let mut nav = state.navigator.subscribe();
        nav.wait_for(|n| n.route == Some(Route::Login)).await.unwrap();
        assert!(auth::current_user(&state).unwrap().is_none());
    }
}
