//! Utility implementations and helpers

pub mod memory_storage;
pub mod stubs;
pub mod validation;

pub use memory_storage::{MemoryObjectStorage, MemoryPaymentStore};
pub use stubs::{RecordingNotifier, ScriptedExtractionService, StaticPdfText};
pub use validation::*;
