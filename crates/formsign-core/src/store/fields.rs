use crate::error::StoreError;
use chrono::{DateTime, Utc};
use shared_types::{FieldDefinition, FieldType, NewField};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct DbField {
    id: String,
    document_id: String,
    field_type: String,
    page_number: i64,
    x_percent: f64,
    y_percent: f64,
    width_percent: f64,
    height_percent: f64,
    label: String,
    required: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<DbField> for FieldDefinition {
    type Error = StoreError;

    fn try_from(row: DbField) -> Result<Self, Self::Error> {
        let field_type: FieldType = row.field_type.parse().map_err(|reason| StoreError::Corrupt {
            column: "field_type",
            reason,
        })?;
        Ok(FieldDefinition {
            id: row.id,
            document_id: row.document_id,
            field_type,
            page_number: row.page_number.max(0) as u32,
            x_percent: row.x_percent,
            y_percent: row.y_percent,
            width_percent: row.width_percent,
            height_percent: row.height_percent,
            label: row.label,
            required: row.required,
            created_at: row.created_at,
        })
    }
}

/// Field definitions, stored in percent space, keyed by document and page
#[derive(Debug, Clone)]
pub struct FieldStore {
    pool: SqlitePool,
}

impl FieldStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fields of a document in draw order (page, then insertion order),
    /// optionally restricted to one page
    pub async fn list(&self, document_id: &str, page: Option<u32>) -> Result<Vec<FieldDefinition>, StoreError> {
        let rows: Vec<DbField> = sqlx::query_as(
            r#"
            SELECT id, document_id, field_type, page_number, x_percent, y_percent,
                   width_percent, height_percent, label, required, created_at
            FROM fields
            WHERE document_id = ? AND (? IS NULL OR page_number = ?)
            ORDER BY page_number, position
            "#,
        )
        .bind(document_id)
        .bind(page.map(i64::from))
        .bind(page.map(i64::from))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FieldDefinition::try_from).collect()
    }

    /// Replace every field on one page of a document in a single transaction.
    /// Fields on other pages are untouched. Returns the number inserted.
    pub async fn replace_page(
        &self,
        document_id: &str,
        page_number: u32,
        fields: &[NewField],
    ) -> Result<usize, StoreError> {
        if page_number == 0 {
            return Err(StoreError::InvalidField("Page numbers start at 1".to_string()));
        }
        for (index, field) in fields.iter().enumerate() {
            field
                .validate()
                .map_err(|reason| StoreError::InvalidField(format!("field {}: {}", index, reason)))?;
        }

        let mut tx = self.pool.begin().await?;

        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM documents WHERE id = ?")
            .bind(document_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::not_found("Document", document_id));
        }

        sqlx::query("DELETE FROM fields WHERE document_id = ? AND page_number = ?")
            .bind(document_id)
            .bind(page_number as i64)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now().to_rfc3339();
        for (position, field) in fields.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO fields (id, document_id, field_type, page_number, position,
                                    x_percent, y_percent, width_percent, height_percent,
                                    label, required, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(document_id)
            .bind(field.field_type.as_str())
            .bind(page_number as i64)
            .bind(position as i64)
            .bind(field.x_percent)
            .bind(field.y_percent)
            .bind(field.width_percent)
            .bind(field.height_percent)
            .bind(&field.label)
            .bind(field.required)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(document_id, page_number, count = fields.len(), "Replaced page fields");
        Ok(fields.len())
    }

    pub async fn delete(&self, field_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM fields WHERE id = ?")
            .bind(field_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Field", field_id));
        }
        Ok(())
    }
}
