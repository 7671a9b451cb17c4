//! # Shell
//!
//! Line-oriented front end: one command per line on stdin, replies on stdout.
//!
//! ```text
//! > camera granted
//! > login ada@example.com secret1
//! Signed in
//! > scan 3017620422003
//! [3017620422003] Nutella (Ferrero)
//!   Nutri-Score E   #e63e11
//!   NOVA 4          #ee0000
//!   Sugars          high
//! > dismiss
//! Panel closed
//! ```

use std::fmt::Write as _;

use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::{JoinError, JoinSet};
use tracing::debug;

use easyhealth_client::{NavigationState, ScanOutcome};
use easyhealth_core::panel::{ProductCard, ProductImage};
use easyhealth_core::permission::{CameraPermission, ScannerView};

use crate::commands::scan::ScanReply;
use crate::commands::{auth, camera, navigation, scan};
use crate::error::ApiError;
use crate::state::AppState;

pub const HELP: &str = "\
Commands:
  signup <email> <password> <confirm>   create an account
  login <email> <password>              sign in
  logout                                sign out
  scan <code> [format]                  feed a decoded barcode (ean13, ean8, upc_a, upc_e)
  dismiss                               close the product panel
  go <route>                            open a screen (/auth/login, /(tabs)/explore, ...)
  route                                 show the current screen
  whoami                                show the signed-in email
  torch                                 toggle the flashlight
  camera <granted|denied|blocked>       set the camera permission
  state                                 dump app state as JSON
  help                                  show this help
  quit                                  exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    SignUp {
        email: String,
        password: String,
        confirmation: String,
    },
    Login {
        email: String,
        password: String,
    },
    Logout,
    Scan {
        code: String,
        format: Option<String>,
    },
    Dismiss,
    Go(String),
    Route,
    WhoAmI,
    Torch,
    Camera(CameraPermission),
    State,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<ShellCommand>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((name, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match (name.to_ascii_lowercase().as_str(), args) {
        ("signup", [email, password, confirmation]) => ShellCommand::SignUp {
            email: email.to_string(),
            password: password.to_string(),
            confirmation: confirmation.to_string(),
        },
        // Missing fields go through validation like an empty form would.
        ("signup", [email, password]) => ShellCommand::SignUp {
            email: email.to_string(),
            password: password.to_string(),
            confirmation: String::new(),
        },
        ("login", [email, password]) => ShellCommand::Login {
            email: email.to_string(),
            password: password.to_string(),
        },
        ("logout", []) => ShellCommand::Logout,
        ("scan", [code]) => ShellCommand::Scan {
            code: code.to_string(),
            format: None,
        },
        ("scan", [code, format]) => ShellCommand::Scan {
            code: code.to_string(),
            format: Some(format.to_string()),
        },
        ("dismiss", []) => ShellCommand::Dismiss,
        ("go", [route]) => ShellCommand::Go(route.to_string()),
        ("route", []) => ShellCommand::Route,
        ("whoami", []) => ShellCommand::WhoAmI,
        ("torch", []) => ShellCommand::Torch,
        ("camera", [status]) => ShellCommand::Camera(parse_permission(status)?),
        ("state", []) => ShellCommand::State,
        ("help", _) | ("?", _) => ShellCommand::Help,
        ("quit", []) | ("exit", []) => ShellCommand::Quit,
        (other, _) => return Err(format!("Unknown or malformed command: {} (try 'help')", other)),
    };

    Ok(Some(command))
}

fn parse_permission(raw: &str) -> Result<CameraPermission, String> {
    match raw.to_ascii_lowercase().as_str() {
        "granted" => Ok(CameraPermission::Granted),
        "denied" => Ok(CameraPermission::Denied {
            can_ask_again: true,
        }),
        "blocked" => Ok(CameraPermission::Denied {
            can_ask_again: false,
        }),
        "undetermined" => Ok(CameraPermission::Undetermined),
        other => Err(format!("Unknown camera permission: {}", other)),
    }
}

/// Runs one command and renders the reply.
pub async fn execute(state: &AppState, command: ShellCommand) -> String {
    debug!(?command, "Shell command");
    let result = match command {
        ShellCommand::SignUp {
            email,
            password,
            confirmation,
        } => auth::sign_up(state, &email, &password, &confirmation)
            .await
            .map(|reply| {
                reply
                    .notice
                    .unwrap_or_else(|| "Account created".to_string())
            }),
        ShellCommand::Login { email, password } => auth::sign_in(state, &email, &password)
            .await
            .map(|_| "Signed in".to_string()),
        ShellCommand::Logout => auth::sign_out(state).await.map(|_| "Signed out".to_string()),
        ShellCommand::Scan { code, format } => match scan::start_scan(state, &code, format.as_deref()) {
            Ok(handle) => return render_settled(&code, handle.await),
            Err(e) => Err(e),
        },
        ShellCommand::Dismiss => scan::dismiss_panel(state).map(|_| "Panel closed".to_string()),
        ShellCommand::Go(path) => navigation::navigate(state, &path).map(|nav| render_route(&nav)),
        ShellCommand::Route => navigation::current_route(state).map(|nav| render_route(&nav)),
        ShellCommand::WhoAmI => auth::current_user(state).map(|user| {
            user.map(|u| u.email.unwrap_or_else(|| u.id.to_string()))
                .unwrap_or_else(|| "Not signed in".to_string())
        }),
        ShellCommand::Torch => camera::toggle_torch(state)
            .map(|on| if on { "Torch on" } else { "Torch off" }.to_string()),
        ShellCommand::Camera(permission) => {
            camera::set_camera_permission(state, permission).map(|view| render_view(&view))
        }
        ShellCommand::State => Ok(render_state(state)),
        ShellCommand::Help => Ok(HELP.to_string()),
        ShellCommand::Quit => Ok(String::new()),
    };

    result.unwrap_or_else(|e: ApiError| e.to_string())
}

/// Reads commands until EOF or `quit`.
///
/// `scan` returns to the prompt as soon as the scanner has taken (or
/// ignored) the code; each outcome is printed when its lookup settles.
/// Lookups still pending at exit are waited for and reported.
pub async fn run<R, W>(state: &AppState, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut pending: JoinSet<String> = JoinSet::new();

    loop {
        let reply = tokio::select! {
            Some(settled) = pending.join_next(), if !pending.is_empty() => {
                settled.unwrap_or_else(|e| format!("Scan task failed: {}", e))
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse(&line) {
                    Ok(None) => continue,
                    Ok(Some(ShellCommand::Quit)) => break,
                    Ok(Some(ShellCommand::Scan { code, format })) => {
                        match scan::start_scan(state, &code, format.as_deref()) {
                            Ok(handle) => {
                                pending.spawn(async move { render_settled(&code, handle.await) });
                                continue;
                            }
                            Err(e) => e.to_string(),
                        }
                    }
                    Ok(Some(command)) => execute(state, command).await,
                    Err(message) => message,
                }
            }
        };

        write_reply(&mut output, &reply).await?;
    }

    while let Some(settled) = pending.join_next().await {
        let reply = settled.unwrap_or_else(|e| format!("Scan task failed: {}", e));
        write_reply(&mut output, &reply).await?;
    }

    output.flush().await
}

async fn write_reply<W: AsyncWrite + Unpin>(output: &mut W, reply: &str) -> std::io::Result<()> {
    output.write_all(reply.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}

// =============================================================================
// Rendering
// =============================================================================

fn render_settled(code: &str, joined: Result<ScanOutcome, JoinError>) -> String {
    match joined {
        Ok(outcome) => format!("[{}] {}", code, render_scan(&ScanReply::from(outcome))),
        Err(e) => format!("[{}] Scan task failed: {}", code, e),
    }
}

fn render_scan(reply: &ScanReply) -> String {
    match reply {
        ScanReply::PanelOpened { card } => render_card(card),
        ScanReply::NotFound => "Product not found".to_string(),
        ScanReply::Failed => "Lookup failed".to_string(),
        ScanReply::Ignored { reason } => format!("Ignored ({})", reason),
        ScanReply::Stale => "Discarded".to_string(),
    }
}

fn render_card(card: &ProductCard) -> String {
    let mut out = format!("{} ({})", card.title, card.brand);

    if let Some(badge) = &card.nutri_score {
        let _ = write!(out, "\n  Nutri-Score {:<3} {}", badge.label, badge.color);
    }
    if let Some(badge) = &card.nova {
        let _ = write!(out, "\n  {:<15} {}", badge.label, badge.color);
    }
    for row in &card.nutrients {
        let _ = write!(out, "\n  {:<15} {}", row.label, row.level.as_str());
    }
    match &card.image {
        ProductImage::Url(url) => {
            let _ = write!(out, "\n  Image: {}", url);
        }
        ProductImage::Placeholder(text) => {
            let _ = write!(out, "\n  {}", text);
        }
    }

    out
}

fn render_route(nav: &NavigationState) -> String {
    match nav.route {
        Some(route) => route.path().to_string(),
        None => "(waiting for auth)".to_string(),
    }
}

fn render_view(view: &ScannerView) -> String {
    match view {
        ScannerView::Loading => "Camera: waiting for permission".to_string(),
        ScannerView::Camera => "Camera: on".to_string(),
        ScannerView::Prompt { prompt } => {
            let mut out = format!("{}\n{}\n[{}]", prompt.title, prompt.message, prompt.button_label);
            if let Some(hint) = &prompt.hint {
                let _ = write!(out, "\n{}", hint);
            }
            out
        }
    }
}

fn render_state(state: &AppState) -> String {
    let snapshot = json!({
        "auth": state.auth.snapshot(),
        "navigation": state.navigator.current(),
        "scan": state.scanner.state(),
        "camera": state.camera.snapshot(),
    });
    serde_json::to_string_pretty(&snapshot).unwrap_or_else(|e| format!("State unavailable: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use easyhealth_client::AppConfig;
    use easyhealth_store::MemoryCredentialStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("   ").unwrap(), None);
        assert_eq!(
            parse("login ada@example.com secret1").unwrap(),
            Some(ShellCommand::Login {
                email: "ada@example.com".to_string(),
                password: "secret1".to_string(),
            })
        );
        assert_eq!(
            parse("scan 3017620422003 ean13").unwrap(),
            Some(ShellCommand::Scan {
                code: "3017620422003".to_string(),
                format: Some("ean13".to_string()),
            })
        );
        assert_eq!(
            parse("camera blocked").unwrap(),
            Some(ShellCommand::Camera(CameraPermission::Denied {
                can_ask_again: false
            }))
        );
        assert_eq!(parse("QUIT").unwrap(), Some(ShellCommand::Quit));
        assert!(parse("fly away").is_err());
        assert!(parse("camera maybe").is_err());
        assert!(parse("login only-email").is_err());
    }

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

    #[tokio::test]
    async fn test_session_script() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "msg": "Invalid login credentials"
            })))
            .mount(&server)
            .await;
        let state = state_for(&server).await;

        let script = "\
help
camera blocked
login ada@example.com short
login ada@example.com wrong-pass
whoami
bogus
quit
scan 3017620422003
";
        let mut output = Vec::new();
        run(&state, script.as_bytes(), &mut output).await.unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("Commands:"));
        assert!(text.contains("Camera Access"));
        assert!(text.contains("Open Settings"));
        assert!(text.contains("Error: Password must be at least 6 characters"));
        assert!(text.contains("Login Failed: Invalid login credentials"));
        assert!(text.contains("Not signed in"));
        assert!(text.contains("Unknown or malformed command: bogus"));
        // Nothing after quit runs.
        assert!(!text.contains("Please sign in first"));
    }

    async fn scanning_state(server: &MockServer, delay: Duration) -> AppState {
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "token_type": "bearer",
                "expires_in": 3600,
                "user": { "id": "6f1c1d2e-8c55-4a0e-9d0c-2b2f7f1d9a11", "email": "ada@example.com" }
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/product/3017620422003.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({
                        "code": "3017620422003",
                        "status": 1,
                        "product": { "product_name": "Nutella", "brands": "Ferrero" }
                    }))
                    .set_delay(delay),
            )
            .expect(1)
            .mount(server)
            .await;

        let state = state_for(server).await;
        auth::sign_in(&state, "ada@example.com", "secret1").await.unwrap();
        state
            .auth
            .subscribe()
            .wait_for(|s| s.user.is_some())
            .await
            .unwrap();
        camera::set_camera_permission(&state, CameraPermission::Granted).unwrap();
        state
    }

    #[tokio::test]
    async fn test_scan_returns_before_lookup_settles() {
        let server = MockServer::start().await;
        let state = scanning_state(&server, Duration::from_millis(200)).await;

        let mut output = Vec::new();
        run(&state, "scan 3017620422003\nscan 3017620422003\n".as_bytes(), &mut output)
            .await
            .unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("[3017620422003] Ignored (lookup_in_flight)"));
        assert!(text.contains("[3017620422003] Nutella (Ferrero)"));
        assert!(state.scanner.state().product.is_some());
    }

    #[tokio::test]
    async fn test_dismiss_during_lookup_discards_result() {
        let server = MockServer::start().await;
        let state = scanning_state(&server, Duration::from_millis(200)).await;

        let mut output = Vec::new();
        run(&state, "scan 3017620422003\ndismiss\n".as_bytes(), &mut output)
            .await
            .unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("Panel closed"));
        assert!(text.contains("[3017620422003] Discarded"));
        assert!(!text.contains("Nutella"));
        assert!(state.scanner.state().product.is_none());
    }

    #[test]
    fn test_render_card() {
        let card = ProductCard::from(&easyhealth_core::Product {
            name: Some("Nutella".to_string()),
            brand: Some("Ferrero".to_string()),
            nutrition_grade: Some("e".to_string()),
            nova_group: Some(4),
            ..Default::default()
        });
        let text = render_scan(&ScanReply::PanelOpened { card });
        assert!(text.starts_with("Nutella (Ferrero)"));
        assert!(text.contains("Nutri-Score E"));
        assert!(text.contains("NOVA 4"));
        assert!(text.contains("No Image Available"));
    }
}
