//! # easyhealth-core: Pure Application Logic for EasyHealth
//!
//! Every decision the scanner app makes lives here as plain data and pure
//! functions. The async services in `easyhealth-client` feed events in and
//! carry the resulting effects out.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       EasyHealth Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Mobile UI / headless shell                      │   │
//! │  │    Login ──► Signup ──► Scanner ──► Detail panel ──► Settings   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ commands                               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │         easyhealth-client (lookup, session, auth, scanner)      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ easyhealth-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌──────────┐ ┌───────┐  │   │
//! │  │   │  types  │ │validation│ │  scan   │ │navigation│ │ panel │  │   │
//! │  │   │ Product │ │  email   │ │ScanPhase│ │  Route   │ │ Card  │  │   │
//! │  │   │ Session │ │ password │ │ Machine │ │   Gate   │ │ Badge │  │   │
//! │  │   └─────────┘ └──────────┘ └─────────┘ └──────────┘ └───────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO TIMERS • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, session and barcode types
//! - [`grading`] - Nutri-Score and Nova colour tables
//! - [`validation`] - Credential and barcode checks
//! - [`scan`] - Scan state machine with generation guard
//! - [`navigation`] - Routes and the auth gate
//! - [`permission`] - Camera permission prompt model
//! - [`panel`] - Detail panel view-model
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use easyhealth_core::grading::nutri_score_color;
//! use easyhealth_core::types::NutriGrade;
//!
//! let grade: NutriGrade = "a".parse().unwrap();
//! assert_eq!(nutri_score_color(Some(grade)), "#008b4c");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod grading;
pub mod navigation;
pub mod panel;
pub mod permission;
pub mod scan;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Fixed delay between a settled lookup and the scanner accepting codes again.
pub const SCAN_COOLDOWN_MS: u64 = 2000;

/// User-Agent sent with every product lookup.
pub const USER_AGENT: &str = "EasyHealth/1.0";

/// Default product database endpoint.
pub const DEFAULT_PRODUCT_API_URL: &str = "https://world.openfoodfacts.net";

/// Minimum password length accepted locally before any backend call.
pub const MIN_PASSWORD_LEN: usize = 6;
