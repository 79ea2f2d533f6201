//! In-memory collaborator implementations for testing and development

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::traits::*;
use crate::types::*;

/// In-memory object storage. Cloning shares the underlying state so tests
/// can keep a handle while the orchestrator owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStorage {
    inner: Arc<RwLock<MemoryObjectStorageInner>>,
}

#[derive(Debug, Default)]
struct MemoryObjectStorageInner {
    objects: HashMap<String, Vec<u8>>,
    deleted_paths: Vec<String>,
    fail_next_put: bool,
    fail_deletes: bool,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `put` fail, for upload-failure scenarios
    pub fn fail_next_put(&self) {
        self.inner.write().unwrap().fail_next_put = true;
    }

    /// Make every `delete` fail, for cleanup-failure scenarios
    pub fn fail_deletes(&self) {
        self.inner.write().unwrap().fail_deletes = true;
    }

    pub fn contains(&self, path: &str) -> bool {
        self.inner.read().unwrap().objects.contains_key(path)
    }

    pub fn object_count(&self) -> usize {
        self.inner.read().unwrap().objects.len()
    }

    /// Paths passed to `delete`, in order
    pub fn deleted_paths(&self) -> Vec<String> {
        self.inner.read().unwrap().deleted_paths.clone()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        _metadata: &UploadMetadata,
    ) -> IngestResult<StoredObject> {
        let mut inner = self.inner.write().unwrap();
        if inner.fail_next_put {
            inner.fail_next_put = false;
            return Err(IngestError::Processing("storage upload failed".to_string()));
        }
        if inner.objects.contains_key(path) {
            return Err(IngestError::Processing("File already exists".to_string()));
        }
        inner.objects.insert(path.to_string(), bytes.to_vec());
        Ok(StoredObject {
            path: path.to_string(),
        })
    }

    async fn get_public_url(&self, path: &str) -> IngestResult<String> {
        Ok(format!("memory://organization-files/{path}"))
    }

    async fn delete(&self, path: &str) -> IngestResult<()> {
        let mut inner = self.inner.write().unwrap();
        if inner.fail_deletes {
            return Err(IngestError::Processing("storage delete failed".to_string()));
        }
        inner.objects.remove(path);
        inner.deleted_paths.push(path.to_string());
        Ok(())
    }
}

/// Committed table state of the in-memory store
#[derive(Debug, Clone, Default)]
struct Tables {
    organizations: HashMap<i64, Organization>,
    statements: HashMap<i64, Statement>,
    allocated_payments: Vec<AllocatedPayment>,
    unallocated_payments: Vec<UnallocatedPayment>,
    payer_references: Vec<PayerReference>,
    next_statement_id: i64,
}

#[derive(Debug, Default)]
struct MemoryPaymentStoreInner {
    committed: Tables,
    /// Snapshot taken at `begin`; mutated until commit or rollback
    working: Option<Tables>,
    fail_payment_inserts: bool,
    fail_statement_inserts: bool,
}

impl MemoryPaymentStoreInner {
    fn tables_mut(&mut self) -> &mut Tables {
        self.working.as_mut().unwrap_or(&mut self.committed)
    }

    fn tables(&self) -> &Tables {
        self.working.as_ref().unwrap_or(&self.committed)
    }
}

/// In-memory relational store with snapshot-based unit-of-work semantics:
/// `begin` snapshots the committed state, `commit` swaps the snapshot in,
/// `rollback` discards it.
#[derive(Debug, Clone, Default)]
pub struct MemoryPaymentStore {
    inner: Arc<RwLock<MemoryPaymentStoreInner>>,
}

impl MemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an organization row
    pub fn add_organization(&self, organization: Organization) {
        let mut inner = self.inner.write().unwrap();
        inner
            .committed
            .organizations
            .insert(organization.organization_id, organization);
    }

    /// Seed a payer-reference registry entry
    pub fn add_payer_reference(&self, reference: PayerReference) {
        self.inner
            .write()
            .unwrap()
            .committed
            .payer_references
            .push(reference);
    }

    /// Make payment batch inserts fail, for rollback scenarios
    pub fn fail_payment_inserts(&self) {
        self.inner.write().unwrap().fail_payment_inserts = true;
    }

    /// Make statement inserts fail
    pub fn fail_statement_inserts(&self) {
        self.inner.write().unwrap().fail_statement_inserts = true;
    }

    pub fn statements(&self) -> Vec<Statement> {
        let inner = self.inner.read().unwrap();
        let mut statements: Vec<Statement> =
            inner.committed.statements.values().cloned().collect();
        statements.sort_by_key(|s| s.id);
        statements
    }

    pub fn allocated_payments(&self) -> Vec<AllocatedPayment> {
        self.inner.read().unwrap().committed.allocated_payments.clone()
    }

    pub fn unallocated_payments(&self) -> Vec<UnallocatedPayment> {
        self.inner
            .read()
            .unwrap()
            .committed
            .unallocated_payments
            .clone()
    }

    /// True while a unit of work is open
    pub fn in_transaction(&self) -> bool {
        self.inner.read().unwrap().working.is_some()
    }
}

#[async_trait]
impl PaymentStore for MemoryPaymentStore {
    async fn begin(&mut self) -> IngestResult<()> {
        let mut inner = self.inner.write().unwrap();
        if inner.working.is_some() {
            return Err(IngestError::Processing(
                "unit of work already open".to_string(),
            ));
        }
        inner.working = Some(inner.committed.clone());
        Ok(())
    }

    async fn commit(&mut self) -> IngestResult<()> {
        let mut inner = self.inner.write().unwrap();
        match inner.working.take() {
            Some(tables) => {
                inner.committed = tables;
                Ok(())
            }
            None => Err(IngestError::Processing(
                "commit without an open unit of work".to_string(),
            )),
        }
    }

    async fn rollback(&mut self) -> IngestResult<()> {
        // Rolling back without an open unit of work is a no-op; the
        // orchestrator calls rollback on any persistence failure, including
        // a failed begin.
        self.inner.write().unwrap().working = None;
        Ok(())
    }

    async fn organization(&self, organization_id: i64) -> IngestResult<Option<Organization>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .tables()
            .organizations
            .get(&organization_id)
            .cloned())
    }

    async fn insert_statement(&mut self, statement: &NewStatement) -> IngestResult<Statement> {
        let mut inner = self.inner.write().unwrap();
        if inner.fail_statement_inserts {
            return Err(IngestError::Processing(
                "statement insert failed".to_string(),
            ));
        }
        let tables = inner.tables_mut();
        tables.next_statement_id += 1;
        let row = Statement {
            id: tables.next_statement_id,
            organization_id: statement.organization_id,
            storage_path: statement.storage_path.clone(),
            public_url: statement.public_url.clone(),
            file_type: statement.file_type.clone(),
            uploaded_by: statement.uploaded_by,
            uploaded_at: statement.uploaded_at,
            processed: statement.processed,
        };
        tables.statements.insert(row.id, row.clone());
        Ok(row)
    }

    async fn mark_statement_processed(&mut self, statement_id: i64) -> IngestResult<()> {
        let mut inner = self.inner.write().unwrap();
        match inner.tables_mut().statements.get_mut(&statement_id) {
            Some(statement) => {
                statement.processed = true;
                Ok(())
            }
            None => Err(IngestError::Processing(format!(
                "statement {statement_id} not found"
            ))),
        }
    }

    async fn insert_allocated_payments(
        &mut self,
        payments: &[AllocatedPayment],
    ) -> IngestResult<()> {
        let mut inner = self.inner.write().unwrap();
        if inner.fail_payment_inserts {
            return Err(IngestError::Processing("payment insert failed".to_string()));
        }
        inner
            .tables_mut()
            .allocated_payments
            .extend_from_slice(payments);
        Ok(())
    }

    async fn insert_unallocated_payments(
        &mut self,
        payments: &[UnallocatedPayment],
    ) -> IngestResult<()> {
        let mut inner = self.inner.write().unwrap();
        if inner.fail_payment_inserts {
            return Err(IngestError::Processing("payment insert failed".to_string()));
        }
        inner
            .tables_mut()
            .unallocated_payments
            .extend_from_slice(payments);
        Ok(())
    }

    async fn payer_references(&self, organization_id: i64) -> IngestResult<Vec<PayerReference>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .tables()
            .payer_references
            .iter()
            .filter(|reference| reference.organization_id == organization_id)
            .cloned()
            .collect())
    }
}
