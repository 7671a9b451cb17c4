//! # Scan State Machine
//!
//! One explicit guard replaces the pair of "is scanning" / "already scanned"
//! flags, so the scanner can never be half-armed. The detail panel is
//! tracked beside the guard: it stays up across later scans until it is
//! dismissed or replaced by a newer product.
//!
//! ## State Diagram
//! ```text
//!                 detect (accepted)
//!   ┌───────┐ ──────────────────────► ┌────────┐
//!   │ Armed │                         │ Lookup │ (request in flight)
//!   └───────┘ ◄──────┐                └───┬────┘
//!       ▲            │ rearm(g)           │ settle(g, ..)
//!       │            │                    │   found ──► panel = product
//!       │       ┌────┴────┐               │   miss / fail ──► panel kept
//!       │       │ Cooling │◄──────────────┘
//!       │       └─────────┘
//!       └──────── dismiss (from anywhere): panel cleared
//! ```
//!
//! ## Generation Guard
//! Every accepted detection and every dismiss bumps `generation`. A lookup
//! result or cool-down expiry carrying an older generation is stale and
//! leaves the machine untouched, so a slow response can never reopen a panel
//! the user already closed.

use serde::Serialize;
use ts_rs::TS;

use crate::types::{BarcodeFormat, Product};
use crate::validation::validate_barcode;

// =============================================================================
// Guard
// =============================================================================

/// Whether the scanner takes the next code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanGuard {
    /// Camera armed, waiting for a code.
    Armed,

    /// A lookup for `code` is in flight.
    Lookup { code: String, format: BarcodeFormat },

    /// Lookup settled; waiting out the cool-down.
    Cooling,
}

/// Payload-free phase tag for UI snapshots and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhaseKind {
    Idle,
    Scanning,
    Cooldown,
    PanelOpen,
}

impl std::fmt::Display for ScanPhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScanPhaseKind::Idle => "idle",
            ScanPhaseKind::Scanning => "scanning",
            ScanPhaseKind::Cooldown => "cooldown",
            ScanPhaseKind::PanelOpen => "panel_open",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Transition Inputs / Outputs
// =============================================================================

/// Issued for an accepted detection; the lookup must hand `generation` back
/// to [`ScanMachine::settle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    pub generation: u64,
    pub code: String,
    pub format: BarcodeFormat,
}

/// Why a detection was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    LookupInFlight,
    CoolingDown,
    InvalidBarcode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    Accepted(LookupTicket),
    Ignored(IgnoreReason),
}

/// How a lookup ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupSettlement {
    Found(Product),
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    /// Applied; `panel_opened` tells the caller whether to present the panel.
    Applied { panel_opened: bool },
    /// Generation mismatch or no lookup in flight; nothing changed.
    Stale,
}

// =============================================================================
// Snapshot
// =============================================================================

/// What the UI renders from.
///
/// `is_scanning` and `scanned` are always equal, and both are true exactly
/// when a detection would be ignored. Both are kept because the camera
/// overlay and the barcode callback each read one of them.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct ScanState {
    pub phase: ScanPhaseKind,
    pub is_scanning: bool,
    pub scanned: bool,
    pub product: Option<Product>,
}

impl Default for ScanState {
    fn default() -> Self {
        ScanMachine::new().snapshot()
    }
}

// =============================================================================
// Machine
// =============================================================================

#[derive(Debug, Clone)]
pub struct ScanMachine {
    guard: ScanGuard,
    panel: Option<Product>,
    generation: u64,
}

impl Default for ScanMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanMachine {
    pub fn new() -> Self {
        Self {
            guard: ScanGuard::Armed,
            panel: None,
            generation: 0,
        }
    }

    pub fn guard(&self) -> &ScanGuard {
        &self.guard
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A lookup in flight wins over an open panel, which wins over the
    /// cool-down.
    pub fn phase(&self) -> ScanPhaseKind {
        match (&self.guard, &self.panel) {
            (ScanGuard::Lookup { .. }, _) => ScanPhaseKind::Scanning,
            (_, Some(_)) => ScanPhaseKind::PanelOpen,
            (ScanGuard::Cooling, None) => ScanPhaseKind::Cooldown,
            (ScanGuard::Armed, None) => ScanPhaseKind::Idle,
        }
    }

    /// Product shown in the panel.
    pub fn product(&self) -> Option<&Product> {
        self.panel.as_ref()
    }

    /// Lookup in flight or cool-down not yet elapsed.
    pub fn is_scanning(&self) -> bool {
        !self.accepts_scans()
    }

    /// A new detection would start a lookup.
    pub fn accepts_scans(&self) -> bool {
        self.guard == ScanGuard::Armed
    }

    /// Offers a decoded barcode to the machine.
    pub fn detect(&mut self, code: &str, format: BarcodeFormat) -> Detection {
        match &self.guard {
            ScanGuard::Armed => {}
            ScanGuard::Lookup { .. } => return Detection::Ignored(IgnoreReason::LookupInFlight),
            ScanGuard::Cooling => return Detection::Ignored(IgnoreReason::CoolingDown),
        }

        let code = match validate_barcode(code) {
            Ok(code) => code.to_string(),
            Err(_) => return Detection::Ignored(IgnoreReason::InvalidBarcode),
        };

        self.generation += 1;
        self.guard = ScanGuard::Lookup {
            code: code.clone(),
            format,
        };

        Detection::Accepted(LookupTicket {
            generation: self.generation,
            code,
            format,
        })
    }

    /// Applies a lookup result if it still belongs to the current cycle.
    ///
    /// A found product replaces whatever the panel showed; a miss leaves the
    /// panel as it was.
    pub fn settle(&mut self, generation: u64, settlement: LookupSettlement) -> Settle {
        if generation != self.generation || !matches!(self.guard, ScanGuard::Lookup { .. }) {
            return Settle::Stale;
        }

        self.guard = ScanGuard::Cooling;
        match settlement {
            LookupSettlement::Found(product) => {
                self.panel = Some(product);
                Settle::Applied { panel_opened: true }
            }
            LookupSettlement::NotFound | LookupSettlement::Failed(_) => Settle::Applied {
                panel_opened: false,
            },
        }
    }

    /// End of the cool-down started by the lookup of `generation`.
    ///
    /// Returns true if anything changed.
    pub fn rearm(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.guard != ScanGuard::Cooling {
            return false;
        }
        self.guard = ScanGuard::Armed;
        true
    }

    /// Closes the panel and re-arms the scanner immediately.
    ///
    /// Bumps the generation so in-flight lookups and pending cool-downs from
    /// before the dismiss are ignored.
    pub fn dismiss(&mut self) {
        self.generation += 1;
        self.guard = ScanGuard::Armed;
        self.panel = None;
    }

    pub fn snapshot(&self) -> ScanState {
        let guard = self.is_scanning();
        ScanState {
            phase: self.phase(),
            is_scanning: guard,
            scanned: guard,
            product: self.panel.clone(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
