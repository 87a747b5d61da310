//! Audit records linking a document to its original and signed content hashes

use crate::field::{FieldType, FieldValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Trimmed projection of a submitted field, kept for provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub field_type: FieldType,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub page: u32,
}

impl From<&FieldValue> for FieldSnapshot {
    fn from(value: &FieldValue) -> Self {
        Self {
            field_type: value.field_type,
            x: value.x,
            y: value.y,
            width: value.width,
            height: value.height,
            page: value.page,
        }
    }
}

/// The latest signing of a document. One per document id; re-signing overwrites it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub document_id: String,
    pub original_hash: String,
    pub signed_hash: String,
    pub signed_at: DateTime<Utc>,
    pub fields: Vec<FieldSnapshot>,
    pub signed_location: String,
    pub original_location: String,
    pub file_name: String,
    pub file_size: u64,
    pub page_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Whether the signed bytes differ from the original.
///
/// Rasterizing anything changes the bytes, so `Modified` is the normal state
/// of a signed document. This is provenance, not a tamper signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityStatus {
    Intact,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub document_id: String,
    pub original_hash: String,
    pub signed_hash: String,
    pub signed_at: DateTime<Utc>,
    pub field_count: usize,
    pub integrity: IntegrityStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyOutcome {
    pub is_valid: bool,
    pub supplied_hash: String,
    pub stored_hash: String,
    pub signed_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn integrity(&self) -> IntegrityStatus {
        if self.original_hash == self.signed_hash {
            IntegrityStatus::Intact
        } else {
            IntegrityStatus::Modified
        }
    }

    pub fn summary(&self) -> AuditSummary {
        AuditSummary {
            document_id: self.document_id.clone(),
            original_hash: self.original_hash.clone(),
            signed_hash: self.signed_hash.clone(),
            signed_at: self.signed_at,
            field_count: self.fields.len(),
            integrity: self.integrity(),
        }
    }

    /// Compare a caller-supplied hash against the stored signed hash.
    /// Surrounding whitespace and hex case are ignored.
    pub fn verify(&self, supplied_hash: &str) -> VerifyOutcome {
        let supplied = normalize_hash(supplied_hash);
        VerifyOutcome {
            is_valid: supplied == normalize_hash(&self.signed_hash),
            supplied_hash: supplied,
            stored_hash: self.signed_hash.clone(),
            signed_at: self.signed_at,
        }
    }
}

fn normalize_hash(hash: &str) -> String {
    hash.trim().to_ascii_lowercase()
}

/// Compute SHA-256 hash of document bytes
pub fn hash_document(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: Document hash function is deterministic
        #[test]
        fn hash_document_deterministic(data in prop::collection::vec(any::<u8>(), 0..1024)) {
            let hash1 = hash_document(&data);
            let hash2 = hash_document(&data);
            prop_assert_eq!(&hash1, &hash2);
            prop_assert_eq!(hash1.len(), 64); // SHA-256 hex is 64 chars
        }

        /// Property: A record always verifies against its own signed hash
        #[test]
        fn verify_own_hash(data in prop::collection::vec(any::<u8>(), 0..256)) {
            let hash = hash_document(&data);
            let now = Utc::now();
            let rec = AuditRecord {
                document_id: "d".to_string(),
                original_hash: hash_document(b"original"),
                signed_hash: hash.clone(),
                signed_at: now,
                fields: Vec::new(),
                signed_location: String::new(),
                original_location: String::new(),
                file_name: String::new(),
                file_size: 0,
                page_count: 1,
                created_at: now,
            };
            prop_assert!(rec.verify(&hash.to_uppercase()).is_valid);
        }
    }
}
