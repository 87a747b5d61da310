//! Source document metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An ingested source PDF
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: String,
    pub file_name: String,
    pub file_size: u64,
    pub page_count: u32,
    /// SHA-256 of the bytes as uploaded; never changes afterwards
    pub original_hash: String,
    /// Storage-relative location of the source bytes
    pub source_location: String,
    pub created_at: DateTime<Utc>,
}
