//! Document signing core for formsign
//!
//! Ties the pure geometry and PDF crates to storage:
//!
//! - [`store`]: SQLite stores for documents, fields, and audit records
//! - [`storage`]: source and signed PDFs on disk
//! - [`library`]: upload validation and document removal
//! - [`signing`]: resolves field values and rasterizes them, then records the audit
//! - [`cache`]: single-flight source cache and per-document locks

pub mod cache;
pub mod error;
pub mod library;
pub mod signing;
pub mod storage;
pub mod store;

pub use cache::{DocumentLocks, SourceCache};
pub use error::{IngestError, PersistStage, SignError, StoreError};
pub use library::DocumentLibrary;
pub use signing::{resolve_stored_values, SignOutcome, SignRequest, SigningService};
pub use storage::Storage;
pub use store::{AuditStore, DocumentStore, DocumentSummary, FieldStore, StoreStats};
