//! # EasyHealth Entry Point
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        EasyHealth (headless)                            │
//! │                                                                         │
//! │  camera / keyboard ──► stdin ──► shell ──► commands ──► AppState        │
//! │                                                            │            │
//! │                     stdout ◄── replies ◄───────────────────┘            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The actual setup is in lib.rs for better testability.

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    easyhealth_lib::run().await
}
