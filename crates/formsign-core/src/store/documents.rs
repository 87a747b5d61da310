use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use shared_types::DocumentInfo;
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
struct DbDocument {
    id: String,
    file_name: String,
    file_size: i64,
    page_count: i64,
    original_hash: String,
    source_location: String,
    created_at: DateTime<Utc>,
}

impl From<DbDocument> for DocumentInfo {
    fn from(row: DbDocument) -> Self {
        DocumentInfo {
            id: row.id,
            file_name: row.file_name,
            file_size: row.file_size.max(0) as u64,
            page_count: row.page_count.max(0) as u32,
            original_hash: row.original_hash,
            source_location: row.source_location,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct DbDocumentSummary {
    #[sqlx(flatten)]
    document: DbDocument,
    field_count: i64,
    signed: bool,
}

/// Document listing entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    #[serde(flatten)]
    pub document: DocumentInfo,
    pub field_count: u64,
    pub signed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub documents: u64,
    pub fields: u64,
    pub signed_documents: u64,
}

const SUMMARY_QUERY: &str = r#"
    SELECT d.id, d.file_name, d.file_size, d.page_count, d.original_hash,
           d.source_location, d.created_at,
           (SELECT COUNT(*) FROM fields f WHERE f.document_id = d.id) AS field_count,
           EXISTS (SELECT 1 FROM audits a WHERE a.document_id = d.id) AS signed
    FROM documents d
"#;

#[derive(Debug, Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, document: &DocumentInfo) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, file_name, file_size, page_count, original_hash, source_location, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&document.id)
        .bind(&document.file_name)
        .bind(document.file_size as i64)
        .bind(document.page_count as i64)
        .bind(&document.original_hash)
        .bind(&document.source_location)
        .bind(document.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<DocumentInfo, StoreError> {
        let row: Option<DbDocument> = sqlx::query_as(
            r#"
            SELECT id, file_name, file_size, page_count, original_hash, source_location, created_at
            FROM documents
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentInfo::from)
            .ok_or_else(|| StoreError::not_found("Document", id))
    }

    /// Newest first
    pub async fn list(&self) -> Result<Vec<DocumentSummary>, StoreError> {
        let rows: Vec<DbDocumentSummary> =
            sqlx::query_as(&format!("{} ORDER BY d.created_at DESC, d.id", SUMMARY_QUERY))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|row| DocumentSummary {
                document: row.document.into(),
                field_count: row.field_count.max(0) as u64,
                signed: row.signed,
            })
            .collect())
    }

    /// Delete a document; its fields and audit record go with it
    pub async fn delete(&self, id: &str) -> Result<DocumentInfo, StoreError> {
        let document = self.get(id).await?;
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Document", id));
        }
        Ok(document)
    }

    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        let (documents, fields, signed_documents): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT (SELECT COUNT(*) FROM documents),
                   (SELECT COUNT(*) FROM fields),
                   (SELECT COUNT(*) FROM audits)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            documents: documents.max(0) as u64,
            fields: fields.max(0) as u64,
            signed_documents: signed_documents.max(0) as u64,
        })
    }
}
