//! Ingestion pipeline: content loading, classification, extraction,
//! reconciliation, and orchestration

pub mod classifier;
pub mod extractor;
pub mod loader;
pub mod orchestrator;
pub mod reconciler;

pub use classifier::*;
pub use extractor::*;
pub use loader::*;
pub use orchestrator::*;
pub use reconciler::*;
