//! Shared domain types for formsign
//!
//! Pure data and math: coordinate spaces, field definitions, submitted
//! values, audit records. Nothing in here touches a PDF or a database.

pub mod audit;
pub mod document;
pub mod field;
pub mod geometry;

pub use audit::{hash_document, AuditRecord, AuditSummary, FieldSnapshot, IntegrityStatus, VerifyOutcome};
pub use document::DocumentInfo;
pub use field::{FieldDefinition, FieldType, FieldValue, NewField, SubmittedValue};
pub use geometry::{GeometryError, PageGeometry, Percent, PdfPoints, Rect, Screen};
