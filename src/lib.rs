//! # Reconcile Core
//!
//! Bank-statement ingestion and reconciliation pipeline: validate an
//! uploaded PDF or CSV file, extract its credit transactions, match each
//! transaction reference against the organization's payer-reference
//! registry, and durably record the result, all-or-nothing per file.
//!
//! ## Features
//!
//! - **File validation**: size cap and extension/MIME whitelist before any
//!   storage or database work
//! - **Heuristic classification**: deterministic, model-free checks that a
//!   document plausibly is a bank statement
//! - **AI fallback**: generative classification and extraction behind a
//!   narrow trait, gated by a hard confidence threshold
//! - **Reference reconciliation**: case- and whitespace-insensitive
//!   matching into allocated and unallocated payments
//! - **Failure-safe persistence**: explicit unit of work plus compensating
//!   storage cleanup, so a failed run leaves neither rows nor blobs behind
//! - **Backend abstraction**: storage, database, extraction, and
//!   notification collaborators are traits, swappable for in-memory
//!   implementations in tests
//!
//! ## Quick Start
//!
//! ```rust
//! use reconcile_core::{IngestionOrchestrator, IngestionRequest};
//!
//! // Wire the orchestrator with your backends (or the in-memory ones from
//! // reconcile_core::utils) and call orchestrator.process(request).
//! ```

pub mod notifications;
pub mod pipeline;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use notifications::*;
pub use pipeline::*;
pub use traits::*;
pub use types::*;
