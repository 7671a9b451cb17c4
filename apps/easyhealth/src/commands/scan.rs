//! # Scan Commands
//!
//! The camera callback and the detail panel.
//!
//! ```text
//!   camera decodes ──► barcode_scanned(code, format)   (waits for the lookup)
//!                      start_scan(code, format)        (returns once guarded)
//!                         │  signed in? camera granted? format accepted?
//!                         ▼
//!                  ScanOrchestrator ──► ScanReply
//!                                         ├─ panel_opened { card }
//!                                         ├─ not_found / failed (panel unchanged)
//!                                         ├─ ignored { reason }
//!                                         └─ stale
//!   swipe down ──────► dismiss_panel
//! ```

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::debug;

use easyhealth_client::ScanOutcome;
use easyhealth_core::panel::ProductCard;
use easyhealth_core::scan::{IgnoreReason, ScanState};
use easyhealth_core::BarcodeFormat;

use crate::error::{ApiError, ErrorCode};
use crate::state::AppState;

/// Format assumed when the camera does not report one.
pub const DEFAULT_FORMAT: BarcodeFormat = BarcodeFormat::Ean13;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum ScanReply {
    Ignored { reason: &'static str },
    PanelOpened { card: ProductCard },
    NotFound,
    Failed,
    Stale,
}

impl From<ScanOutcome> for ScanReply {
    fn from(outcome: ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::Ignored(reason) => ScanReply::Ignored {
                reason: ignore_reason(reason),
            },
            ScanOutcome::PanelOpened(product) => ScanReply::PanelOpened {
                card: ProductCard::from(&product),
            },
            ScanOutcome::NotFound => ScanReply::NotFound,
            ScanOutcome::Failed(_) => ScanReply::Failed,
            ScanOutcome::Stale => ScanReply::Stale,
        }
    }
}

fn ignore_reason(reason: IgnoreReason) -> &'static str {
    match reason {
        IgnoreReason::LookupInFlight => "lookup_in_flight",
        IgnoreReason::CoolingDown => "cooling_down",
        IgnoreReason::InvalidBarcode => "invalid_barcode",
    }
}

pub async fn barcode_scanned(
    state: &AppState,
    code: &str,
    format: Option<&str>,
) -> Result<ScanReply, ApiError> {
    debug!(barcode = %code, "barcode_scanned command");
    let format = scan_preconditions(state, format)?;
    let outcome = state.scanner.on_barcode_detected(code, format).await;
    Ok(ScanReply::from(outcome))
}

/// Hands the code to the scanner without waiting for the lookup.
///
/// The handle resolves once the lookup settles; a detection made after this
/// returns already sees the guard.
pub fn start_scan(
    state: &AppState,
    code: &str,
    format: Option<&str>,
) -> Result<JoinHandle<ScanOutcome>, ApiError> {
    debug!(barcode = %code, "start_scan command");
    let format = scan_preconditions(state, format)?;
    Ok(state.scanner.spawn_detection(code, format))
}

fn scan_preconditions(state: &AppState, format: Option<&str>) -> Result<BarcodeFormat, ApiError> {
    if !state.auth.snapshot().is_signed_in() {
        return Err(ApiError::not_signed_in());
    }
    if !state.camera.is_granted() {
        return Err(ApiError::new(
            ErrorCode::CameraUnavailable,
            "Camera access has not been granted",
        ));
    }

    match format {
        Some(raw) => Ok(raw.parse::<BarcodeFormat>()?),
        None => Ok(DEFAULT_FORMAT),
    }
}

pub fn dismiss_panel(state: &AppState) -> Result<ScanState, ApiError> {
    state.scanner.dismiss_panel();
    Ok(state.scanner.state())
}

pub fn scan_state(state: &AppState) -> Result<ScanState, ApiError> {
    Ok(state.scanner.state())
}

pub fn product_card(state: &AppState) -> Result<Option<ProductCard>, ApiError> {
    Ok(state.scanner.product_card())
}
