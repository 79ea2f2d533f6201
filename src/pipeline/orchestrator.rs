//! Ingestion orchestration
//!
//! Ties the pipeline stages together with the store's unit of work and the
//! compensating storage cleanup. Storage writes are not transactional, so a
//! failure after the upload deletes the blob again; database work is
//! all-or-nothing behind begin/commit/rollback.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::notifications::PaymentNotification;
use crate::pipeline::classifier::StatementClassifier;
use crate::pipeline::extractor::TransactionExtractor;
use crate::pipeline::loader::ContentLoader;
use crate::pipeline::reconciler::ReferenceReconciler;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::sanitize_storage_path;

/// States of one ingestion run. `Failed` is terminal and reachable from
/// every non-terminal state; success is only ever reported from
/// `Committed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestionState {
    Uploading,
    Uploaded,
    Classifying,
    Extracting,
    Reconciling,
    Persisting,
    Committed,
    Failed,
}

/// One uploaded file to ingest
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub organization_id: i64,
    /// Caller identity; `None` fails as `Unauthorized` before any pipeline
    /// step runs
    pub uploaded_by: Option<Uuid>,
    /// When false, the file is stored and recorded but not processed
    pub process_file: bool,
}

/// Counts reported for a processed statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingSummary {
    pub total_transactions: usize,
    pub allocated_payments: usize,
    pub unallocated_payments: usize,
}

/// Result of a committed ingestion run
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionOutcome {
    pub statement: Statement,
    /// `None` when the caller asked for upload-only (`process_file: false`)
    pub processing: Option<ProcessingSummary>,
}

/// Top-level state machine driving one ingestion run at a time
pub struct IngestionOrchestrator<S, D, X, P, N>
where
    S: ObjectStorage,
    D: PaymentStore,
    X: ExtractionService,
    P: PdfTextExtractor,
    N: NotificationSender,
{
    storage: S,
    store: D,
    extraction: X,
    pdf_extractor: P,
    notifier: N,
}

impl<S, D, X, P, N> IngestionOrchestrator<S, D, X, P, N>
where
    S: ObjectStorage,
    D: PaymentStore,
    X: ExtractionService,
    P: PdfTextExtractor,
    N: NotificationSender,
{
    pub fn new(storage: S, store: D, extraction: X, pdf_extractor: P, notifier: N) -> Self {
        Self {
            storage,
            store,
            extraction,
            pdf_extractor,
            notifier,
        }
    }

    /// Run the full pipeline for one uploaded file.
    ///
    /// Either the whole batch (statement row plus payment rows) commits and
    /// the blob stays in storage, or nothing is persisted and the blob is
    /// deleted again. Cleanup failures are logged, not retried, and never
    /// replace the primary error.
    pub async fn process(&mut self, request: IngestionRequest) -> IngestResult<IngestionOutcome> {
        let uploaded_by = request.uploaded_by.ok_or(IngestError::Unauthorized)?;

        let organization = self
            .store
            .organization(request.organization_id)
            .await?
            .ok_or_else(|| {
                IngestError::Processing(format!(
                    "organization {} not found",
                    request.organization_id
                ))
            })?;

        // File-level validation happens before the upload so rejected files
        // never touch storage or the database.
        let content = ContentLoader::load(
            &request.bytes,
            &request.file_name,
            &request.mime_type,
            &self.pdf_extractor,
        )?;

        self.transition(IngestionState::Uploading);
        let path = Self::build_storage_path(&organization, &request.file_name);
        let metadata = UploadMetadata {
            organization_id: organization.organization_id,
            uploaded_by,
            original_name: request.file_name.clone(),
            process_immediately: request.process_file,
        };
        let stored = self.storage.put(&path, &request.bytes, &metadata).await?;
        let public_url = match self.storage.get_public_url(&stored.path).await {
            Ok(url) => url,
            Err(err) => {
                self.transition(IngestionState::Failed);
                self.cleanup_upload(&stored.path).await;
                return Err(err);
            }
        };
        self.transition(IngestionState::Uploaded);

        self.transition(IngestionState::Classifying);
        if let Err(err) = StatementClassifier::classify(&content, &self.extraction).await {
            // File-level rejection: no statement row exists yet, only the
            // blob needs compensating cleanup.
            self.transition(IngestionState::Failed);
            self.cleanup_upload(&stored.path).await;
            return Err(err);
        }

        let new_statement = NewStatement {
            organization_id: organization.organization_id,
            storage_path: stored.path.clone(),
            public_url,
            file_type: request.mime_type.clone(),
            uploaded_by,
            uploaded_at: Utc::now(),
            processed: false,
        };

        match self
            .persist(&content, &organization, new_statement, request.process_file)
            .await
        {
            Ok((outcome, allocated)) => {
                self.transition(IngestionState::Committed);
                info!(
                    statement_id = outcome.statement.id,
                    organization_id = organization.organization_id,
                    "statement ingestion committed"
                );
                self.notify(&organization, &allocated).await;
                Ok(outcome)
            }
            Err(err) => {
                self.transition(IngestionState::Failed);
                if let Err(rollback_err) = self.store.rollback().await {
                    warn!(error = %rollback_err, "unit-of-work rollback failed");
                }
                self.cleanup_upload(&stored.path).await;
                Err(err)
            }
        }
    }

    /// The transactional block: statement insert, extraction,
    /// reconciliation, payment inserts, processed flag, commit.
    async fn persist(
        &mut self,
        content: &crate::pipeline::loader::StatementContent,
        organization: &Organization,
        new_statement: NewStatement,
        process_file: bool,
    ) -> IngestResult<(IngestionOutcome, Vec<AllocatedPayment>)> {
        self.store.begin().await?;
        let statement = self.store.insert_statement(&new_statement).await?;

        if !process_file {
            self.store.commit().await?;
            return Ok((
                IngestionOutcome {
                    statement,
                    processing: None,
                },
                Vec::new(),
            ));
        }

        self.transition(IngestionState::Extracting);
        let transactions = TransactionExtractor::extract(content, &self.extraction).await?;

        self.transition(IngestionState::Reconciling);
        let registry = self
            .store
            .payer_references(organization.organization_id)
            .await?;
        let reconciliation = ReferenceReconciler::reconcile(
            statement.id,
            organization.organization_id,
            &transactions,
            &registry,
        );

        self.transition(IngestionState::Persisting);
        self.store
            .insert_allocated_payments(&reconciliation.allocated)
            .await?;
        self.store
            .insert_unallocated_payments(&reconciliation.unallocated)
            .await?;
        self.store.mark_statement_processed(statement.id).await?;
        self.store.commit().await?;

        let summary = ProcessingSummary {
            total_transactions: reconciliation.total_transactions(),
            allocated_payments: reconciliation.allocated.len(),
            unallocated_payments: reconciliation.unallocated.len(),
        };

        Ok((
            IngestionOutcome {
                statement: Statement {
                    processed: true,
                    ..statement
                },
                processing: Some(summary),
            },
            reconciliation.allocated,
        ))
    }

    /// Best-effort blob deletion after a failed run
    async fn cleanup_upload(&self, path: &str) {
        if let Err(err) = self.storage.delete(path).await {
            warn!(%path, error = %err, "failed to clean up uploaded file");
        }
    }

    /// Fire-and-forget payment notifications after a commit. Failures are
    /// logged; the run has already succeeded.
    async fn notify(&self, organization: &Organization, allocated: &[AllocatedPayment]) {
        for payment in allocated {
            let notification = PaymentNotification::for_allocated_payment(
                organization.created_by,
                &organization.name,
                payment,
            );
            if let Err(err) = self.notifier.send(&notification).await {
                warn!(error = %err, "failed to dispatch payment notification");
            }
        }
    }

    fn transition(&self, state: IngestionState) {
        debug!(?state, "ingestion state transition");
    }

    /// Storage layout: `{owner}/{org_id}-{org_name}/{file_name}`, with
    /// unsafe characters replaced by dashes.
    fn build_storage_path(organization: &Organization, file_name: &str) -> String {
        sanitize_storage_path(&format!(
            "{}/{}-{}/{}",
            organization.created_by, organization.organization_id, organization.name, file_name
        ))
    }
}
