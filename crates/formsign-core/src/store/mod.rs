//! SQLite-backed stores for documents, fields, and audit records

mod audits;
mod documents;
mod fields;

pub use audits::AuditStore;
pub use documents::{DocumentStore, DocumentSummary, StoreStats};
pub use fields::FieldStore;

use crate::error::StoreError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Open a pool and bring the schema up to date
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, StoreError> {
    tracing::info!("Connecting to database: {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Idempotent schema setup
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            file_name TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            page_count INTEGER NOT NULL,
            original_hash TEXT NOT NULL,
            source_location TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fields (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            field_type TEXT NOT NULL,
            page_number INTEGER NOT NULL,
            position INTEGER NOT NULL,
            x_percent REAL NOT NULL,
            y_percent REAL NOT NULL,
            width_percent REAL NOT NULL,
            height_percent REAL NOT NULL,
            label TEXT NOT NULL DEFAULT '',
            required INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_fields_document_page ON fields(document_id, page_number)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audits (
            document_id TEXT PRIMARY KEY REFERENCES documents(id) ON DELETE CASCADE,
            original_hash TEXT NOT NULL,
            signed_hash TEXT NOT NULL,
            signed_at TEXT NOT NULL,
            fields_json TEXT NOT NULL,
            signed_location TEXT NOT NULL,
            original_location TEXT NOT NULL,
            file_name TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            page_count INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Migrations complete");
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::memory_pool;
    use super::*;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert_eq!(names, vec!["audits", "documents", "fields"]);
    }
}
