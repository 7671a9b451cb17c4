//! # Scan Orchestrator
//!
//! Drives [`ScanMachine`] from camera callbacks and lookup results.
//!
//! ## One Scan Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  camera ──► on_barcode_detected(code, format)                           │
//! │               │                                                         │
//! │               ├─ lock ─► detect() ─► Ignored? ──► return (no lookup)    │
//! │               │          (guard checked before any await or spawn)      │
//! │               ▼                                                         │
//! │          lookup(code)  ◄── exactly one per accepted detection           │
//! │               │                                                         │
//! │               ├─ lock ─► settle(generation, result)                     │
//! │               │            Stale ──► dropped                            │
//! │               ▼                                                         │
//! │          Found ──► panel open        NotFound / error ──► logged        │
//! │               │                                │                        │
//! │               └──── sleep(cool-down) ─► rearm(generation) ◄─┘           │
//! │                                                                         │
//! │  dismiss_panel() ─► idle immediately (pending results become stale)     │
//! │  panel open + cool-down over ─► next code starts a new cycle            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The machine mutex is never held across an await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use easyhealth_core::panel::ProductCard;
use easyhealth_core::scan::{
    Detection, IgnoreReason, LookupSettlement, LookupTicket, ScanMachine, ScanState, Settle,
};
use easyhealth_core::{BarcodeFormat, Product};

use crate::lookup::{LookupOutcome, ProductLookup};

/// What happened to one detection.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Ignored(IgnoreReason),
    PanelOpened(Product),
    NotFound,
    /// Lookup error, already logged. Carries the message for diagnostics.
    Failed(String),
    /// The scanner moved on (panel dismissed) before the lookup finished.
    Stale,
}

struct Inner {
    machine: Mutex<ScanMachine>,
    lookup: Arc<dyn ProductLookup>,
    cooldown: Duration,
    state: watch::Sender<ScanState>,
}

impl Inner {
    fn machine(&self) -> MutexGuard<'_, ScanMachine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, machine: &ScanMachine) {
        let next = machine.snapshot();
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

#[derive(Clone)]
pub struct ScanOrchestrator {
    inner: Arc<Inner>,
}

impl ScanOrchestrator {
    pub fn new(lookup: Arc<dyn ProductLookup>, cooldown: Duration) -> Self {
        let (state, _) = watch::channel(ScanState::default());
        ScanOrchestrator {
            inner: Arc::new(Inner {
                machine: Mutex::new(ScanMachine::new()),
                lookup,
                cooldown,
                state,
            }),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.inner.cooldown
    }

    /// Handles one decoded barcode from the camera.
    pub async fn on_barcode_detected(&self, code: &str, format: BarcodeFormat) -> ScanOutcome {
        match self.begin(code, format) {
            Ok(ticket) => self.complete(ticket).await,
            Err(reason) => ScanOutcome::Ignored(reason),
        }
    }

    /// Fire-and-forget variant for camera callbacks.
    ///
    /// The guard is checked before this returns, so a detection made right
    /// after it sees the lookup as in flight.
    pub fn spawn_detection(&self, code: &str, format: BarcodeFormat) -> JoinHandle<ScanOutcome> {
        match self.begin(code, format) {
            Ok(ticket) => {
                let orchestrator = self.clone();
                tokio::spawn(async move { orchestrator.complete(ticket).await })
            }
            Err(reason) => tokio::spawn(async move { ScanOutcome::Ignored(reason) }),
        }
    }

    fn begin(&self, code: &str, format: BarcodeFormat) -> Result<LookupTicket, IgnoreReason> {
        let detection = {
            let mut machine = self.inner.machine();
            let detection = machine.detect(code, format);
            self.inner.publish(&machine);
            detection
        };

        match detection {
            Detection::Accepted(ticket) => {
                info!(barcode = %ticket.code, format = %ticket.format, "Barcode scanned");
                Ok(ticket)
            }
            Detection::Ignored(reason) => {
                debug!(barcode = %code, ?reason, "Detection ignored");
                Err(reason)
            }
        }
    }

    /// Runs the lookup for an accepted detection and settles it.
    async fn complete(&self, ticket: LookupTicket) -> ScanOutcome {
        let settlement = match self.inner.lookup.lookup(&ticket.code).await {
            Ok(LookupOutcome::Found(product)) => LookupSettlement::Found(product),
            Ok(LookupOutcome::NotFound) => LookupSettlement::NotFound,
            Err(e) => {
                error!(barcode = %ticket.code, error = %e, "Error fetching product");
                LookupSettlement::Failed(e.to_string())
            }
        };

        let outcome = match &settlement {
            LookupSettlement::Found(product) => ScanOutcome::PanelOpened(product.clone()),
            LookupSettlement::NotFound => ScanOutcome::NotFound,
            LookupSettlement::Failed(message) => ScanOutcome::Failed(message.clone()),
        };

        let settled = {
            let mut machine = self.inner.machine();
            let settled = machine.settle(ticket.generation, settlement);
            self.inner.publish(&machine);
            settled
        };

        match settled {
            Settle::Stale => {
                debug!(barcode = %ticket.code, "Discarding stale lookup result");
                ScanOutcome::Stale
            }
            Settle::Applied { panel_opened } => {
                debug!(barcode = %ticket.code, panel_opened, "Lookup settled");
                self.schedule_rearm(ticket.generation);
                outcome
            }
        }
    }

    /// Closes the panel and re-arms the scanner at once.
    pub fn dismiss_panel(&self) {
        let mut machine = self.inner.machine();
        machine.dismiss();
        self.inner.publish(&machine);
        debug!("Panel dismissed");
    }

    pub fn state(&self) -> ScanState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.inner.state.subscribe()
    }

    /// Panel view-model for the product on screen.
    pub fn product_card(&self) -> Option<ProductCard> {
        self.inner.machine().product().map(ProductCard::from)
    }

    fn schedule_rearm(&self, generation: u64) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.cooldown).await;
            let mut machine = inner.machine();
            if machine.rearm(generation) {
                inner.publish(&machine);
                debug!(generation, "Scanner re-armed");
            }
        });
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
