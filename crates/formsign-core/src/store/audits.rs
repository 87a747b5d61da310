use crate::error::StoreError;
use chrono::{DateTime, Utc};
use shared_types::{AuditRecord, FieldSnapshot, VerifyOutcome};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
struct DbAudit {
    document_id: String,
    original_hash: String,
    signed_hash: String,
    signed_at: DateTime<Utc>,
    fields_json: String,
    signed_location: String,
    original_location: String,
    file_name: String,
    file_size: i64,
    page_count: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<DbAudit> for AuditRecord {
    type Error = StoreError;

    fn try_from(row: DbAudit) -> Result<Self, Self::Error> {
        let fields: Vec<FieldSnapshot> =
            serde_json::from_str(&row.fields_json).map_err(|e| StoreError::Corrupt {
                column: "fields_json",
                reason: e.to_string(),
            })?;
        Ok(AuditRecord {
            document_id: row.document_id,
            original_hash: row.original_hash,
            signed_hash: row.signed_hash,
            signed_at: row.signed_at,
            fields,
            signed_location: row.signed_location,
            original_location: row.original_location,
            file_name: row.file_name,
            file_size: row.file_size.max(0) as u64,
            page_count: row.page_count.max(0) as u32,
            created_at: row.created_at,
        })
    }
}

/// One audit record per document; signing again overwrites it
#[derive(Debug, Clone)]
pub struct AuditStore {
    pool: SqlitePool,
}

impl AuditStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or overwrite the record for `record.document_id`.
    ///
    /// The first `original_hash` and `created_at` stick; everything else
    /// reflects the latest signing.
    pub async fn upsert(&self, record: &AuditRecord) -> Result<(), StoreError> {
        let fields_json = serde_json::to_string(&record.fields).map_err(|e| StoreError::Corrupt {
            column: "fields_json",
            reason: e.to_string(),
        })?;

        sqlx::query(
            r#"
            INSERT INTO audits (document_id, original_hash, signed_hash, signed_at, fields_json,
                                signed_location, original_location, file_name, file_size,
                                page_count, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(document_id) DO UPDATE SET
                signed_hash = excluded.signed_hash,
                signed_at = excluded.signed_at,
                fields_json = excluded.fields_json,
                signed_location = excluded.signed_location,
                original_location = excluded.original_location,
                file_name = excluded.file_name,
                file_size = excluded.file_size,
                page_count = excluded.page_count
            "#,
        )
        .bind(&record.document_id)
        .bind(&record.original_hash)
        .bind(&record.signed_hash)
        .bind(record.signed_at.to_rfc3339())
        .bind(&fields_json)
        .bind(&record.signed_location)
        .bind(&record.original_location)
        .bind(&record.file_name)
        .bind(record.file_size as i64)
        .bind(record.page_count as i64)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, document_id: &str) -> Result<AuditRecord, StoreError> {
        let row: Option<DbAudit> = sqlx::query_as(
            r#"
            SELECT document_id, original_hash, signed_hash, signed_at, fields_json,
                   signed_location, original_location, file_name, file_size,
                   page_count, created_at
            FROM audits
            WHERE document_id = ?
            "#,
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StoreError::not_found("Audit record", document_id))?
            .try_into()
    }

    /// Compare a supplied hash with the stored signed hash
    pub async fn verify(&self, document_id: &str, supplied_hash: &str) -> Result<VerifyOutcome, StoreError> {
        Ok(self.get(document_id).await?.verify(supplied_hash))
    }
}
