use shared_pdf::PdfError;
use std::fmt;
use thiserror::Error;

/// Failures of the SQLite stores and the file storage
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Stored {column} is corrupt: {reason}")]
    Corrupt { column: &'static str, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Upload rejected or not stored
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Uploaded file is empty")]
    Empty,

    #[error("Uploaded file is not a readable PDF: {0}")]
    InvalidPdf(#[source] PdfError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persistence step that failed after the signed bytes were produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStage {
    SignedFile,
    AuditRecord,
}

impl fmt::Display for PersistStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistStage::SignedFile => f.write_str("writing the signed file"),
            PersistStage::AuditRecord => f.write_str("recording the audit"),
        }
    }
}

/// Signing failures. Per-field image decode problems are not errors; they
/// come back as diagnostics on a successful outcome.
#[derive(Error, Debug)]
pub enum SignError {
    #[error("Invalid signing request: {0}")]
    Validation(String),

    #[error("Could not load the source of document {document_id}: {reason}")]
    SourceLoad { document_id: String, reason: String },

    #[error("Could not render the signed output of document {document_id}: {source}")]
    Render {
        document_id: String,
        #[source]
        source: PdfError,
    },

    #[error("Document {document_id} was signed (hash {signed_hash}) but {stage} failed: {reason}")]
    Persistence {
        document_id: String,
        stage: PersistStage,
        signed_hash: String,
        reason: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Signing task failed: {0}")]
    Internal(String),
}

impl SignError {
    pub fn validation(message: impl Into<String>) -> Self {
        SignError::Validation(message.into())
    }
}
