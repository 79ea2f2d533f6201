//! Traits for the external collaborators of the ingestion pipeline
//!
//! The pipeline never talks to a concrete storage bucket, database, or
//! generative model. Each collaborator sits behind a narrow trait so that
//! backends can be swapped (Supabase, S3, Postgres, in-memory) and so that
//! tests can substitute deterministic stubs.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notifications::PaymentNotification;
use crate::types::*;

/// Metadata attached to an uploaded statement blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub organization_id: i64,
    pub uploaded_by: Uuid,
    pub original_name: String,
    pub process_immediately: bool,
}

/// Result of a successful blob upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub path: String,
}

/// Object storage collaborator
///
/// Persists the original uploaded file and deletes it again when a run
/// fails after the upload (a compensating action, since storage writes are
/// not part of the database unit of work).
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store a blob at the given path. Fails if the path already exists.
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        metadata: &UploadMetadata,
    ) -> IngestResult<StoredObject>;

    /// Resolve the public URL for a stored blob
    async fn get_public_url(&self, path: &str) -> IngestResult<String>;

    /// Delete a stored blob
    async fn delete(&self, path: &str) -> IngestResult<()>;
}

/// Relational store collaborator with an explicit unit of work
///
/// Backends map these operations onto the five tables (organizations,
/// statements, payments, unallocated_payments, payer_references). Isolation
/// between concurrent runs is delegated entirely to the backend's
/// transaction semantics.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Open a unit of work
    async fn begin(&mut self) -> IngestResult<()>;

    /// Commit the current unit of work
    async fn commit(&mut self) -> IngestResult<()>;

    /// Roll back the current unit of work
    async fn rollback(&mut self) -> IngestResult<()>;

    /// Look up an organization by id
    async fn organization(&self, organization_id: i64) -> IngestResult<Option<Organization>>;

    /// Insert a statement row and return it with its assigned id
    async fn insert_statement(&mut self, statement: &NewStatement) -> IngestResult<Statement>;

    /// Flip a statement's processed flag to true
    async fn mark_statement_processed(&mut self, statement_id: i64) -> IngestResult<()>;

    /// Batch-insert allocated payments
    async fn insert_allocated_payments(
        &mut self,
        payments: &[AllocatedPayment],
    ) -> IngestResult<()>;

    /// Batch-insert unallocated payments
    async fn insert_unallocated_payments(
        &mut self,
        payments: &[UnallocatedPayment],
    ) -> IngestResult<()>;

    /// Payer-reference registry for one organization
    async fn payer_references(&self, organization_id: i64) -> IngestResult<Vec<PayerReference>>;
}

/// Verdict returned by the generative model when asked whether a document
/// is a bank statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    pub is_valid: bool,
    pub message: String,
    pub confidence: f64,
}

/// Transaction shape returned by the extraction oracle. Dates arrive as
/// strings and are parsed (and rejected) by the extractor, not trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTransaction {
    pub date: String,
    pub amount: BigDecimal,
    pub transaction_reference: String,
}

/// Outcome of an extraction call
///
/// A tagged variant rather than a struct with ad hoc optional fields: the
/// oracle either recognized a statement and produced transactions, or it
/// did not and gave a reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Valid { transactions: Vec<ExtractedTransaction> },
    Invalid { reason: String },
}

/// Generative extraction and classification collaborator
///
/// Treated as an untrusted, best-effort oracle. Any transport failure or
/// schema violation surfaces as `IngestError::Processing`, never as a
/// classification verdict.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Ask the model whether the given content is a bank statement
    async fn classify(&self, prompt: &str) -> IngestResult<ClassificationVerdict>;

    /// Ask the model to extract credit transactions from the given content
    async fn extract(&self, prompt: &str) -> IngestResult<ExtractionOutcome>;
}

/// Text extraction from PDF bytes
///
/// A pure transform over the uploaded bytes; no OCR fallback, so image-only
/// PDFs yield sparse text and are rejected downstream by the short-content
/// check.
pub trait PdfTextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> IngestResult<String>;
}

/// Notification dispatch collaborator
///
/// Fire-and-forget side channel invoked after a commit; failures are logged
/// by the orchestrator and never fail the pipeline.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &PaymentNotification) -> IngestResult<()>;
}
