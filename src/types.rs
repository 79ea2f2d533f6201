//! Core types and data structures for the ingestion pipeline

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum accepted upload size. Files of exactly this size are accepted;
/// one byte more is rejected.
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// MIME types accepted by the ingestion endpoint in addition to the
/// extension check. Some browsers report CSV uploads as Excel.
pub const ALLOWED_MIME_TYPES: [&str; 3] =
    ["text/csv", "application/vnd.ms-excel", "application/pdf"];

/// Supported statement file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    Pdf,
    Csv,
}

impl FileType {
    /// Resolve the file type from the file name extension, falling back to
    /// the declared MIME type. Returns `InvalidFileType` for anything that
    /// is not a PDF or CSV.
    pub fn resolve(file_name: &str, mime_type: &str) -> IngestResult<Self> {
        let extension = file_name
            .rsplit('.')
            .next()
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => return Ok(FileType::Pdf),
            Some("csv") => return Ok(FileType::Csv),
            _ => {}
        }

        match mime_type {
            "application/pdf" => Ok(FileType::Pdf),
            "text/csv" | "application/vnd.ms-excel" => Ok(FileType::Csv),
            other => Err(IngestError::InvalidFileType(format!(
                "Only PDF and CSV files are supported, got '{other}'"
            ))),
        }
    }
}

/// One uploaded bank-statement file and its processing record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Row id assigned by the store
    pub id: i64,
    /// Owning organization
    pub organization_id: i64,
    /// Path of the original file in object storage
    pub storage_path: String,
    /// Public URL resolved from the storage path
    pub public_url: String,
    /// Declared MIME type of the upload
    pub file_type: String,
    /// User that uploaded the file
    pub uploaded_by: Uuid,
    /// When the file was uploaded
    pub uploaded_at: DateTime<Utc>,
    /// Flips to true only after reconciliation commits
    pub processed: bool,
}

/// Insert shape for a statement, before the store assigns an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStatement {
    pub organization_id: i64,
    pub storage_path: String,
    pub public_url: String,
    pub file_type: String,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
    pub processed: bool,
}

/// Transient transaction extracted from statement content. Never persisted
/// as-is; reconciliation turns it into an allocated or unallocated payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub date: NaiveDate,
    pub amount: BigDecimal,
    pub reference: String,
}

/// Registry entry mapping a payer to the reference they are expected to use
/// on deposits to one organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayerReference {
    pub organization_id: i64,
    pub payer_id: Uuid,
    pub reference_details: String,
}

/// Payment matched to a known payer reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedPayment {
    pub organization_id: i64,
    pub statement_id: i64,
    pub payer_id: Uuid,
    pub amount: BigDecimal,
    pub date: NaiveDate,
    /// The payer's canonical (normalized) reference
    pub transaction_reference: String,
    /// The exact reference string found on the statement, preserved for
    /// audit even when casing or whitespace differed
    pub reference_on_deposit: String,
}

/// Payment with no matching payer reference, awaiting manual assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnallocatedPayment {
    pub organization_id: i64,
    pub statement_id: i64,
    pub amount: BigDecimal,
    pub date: NaiveDate,
    pub transaction_reference: String,
    pub is_allocated: bool,
}

/// Organization that owns statements, payments, and payer references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub organization_id: i64,
    pub name: String,
    pub created_by: Uuid,
}

/// Errors that can occur in the ingestion pipeline
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("File size exceeds 10MB limit ({0} bytes)")]
    FileTooLarge(u64),
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),
    #[error("Not a bank statement: {0}")]
    NotABankStatement(String),
    #[error("Processing error: {0}")]
    Processing(String),
    #[error("Unauthorized")]
    Unauthorized,
}

impl IngestError {
    /// HTTP status code for surfacing this error at the ingestion endpoint
    pub fn status_code(&self) -> u16 {
        match self {
            IngestError::FileTooLarge(_)
            | IngestError::InvalidFileType(_)
            | IngestError::NotABankStatement(_) => 400,
            IngestError::Unauthorized => 401,
            IngestError::Processing(_) => 500,
        }
    }
}

/// Result type for pipeline operations
pub type IngestResult<T> = Result<T, IngestError>;
