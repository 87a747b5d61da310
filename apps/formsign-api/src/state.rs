//! Application state for the formsign API

use crate::config::Config;
use anyhow::Result;
use formsign_core::{
    store, AuditStore, DocumentLibrary, DocumentLocks, DocumentStore, FieldStore, SigningService,
    SourceCache, Storage,
};
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;

const MAX_CONNECTIONS: u32 = 5;

pub struct AppState {
    pub config: Config,
    pub documents: DocumentStore,
    pub fields: FieldStore,
    pub audits: AuditStore,
    pub library: DocumentLibrary,
    pub signer: SigningService,
    pub storage: Arc<Storage>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        if let Some(dir) = sqlite_file_dir(&config.database_url) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let pool = store::connect(&config.database_url, MAX_CONNECTIONS).await?;
        Self::with_pool(config, pool).await
    }

    /// Build on an existing, migrated pool
    pub async fn with_pool(config: Config, pool: SqlitePool) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config.storage_dir).await?);
        tracing::info!("Storing files in {}", storage.root().display());

        let cache = Arc::new(SourceCache::with_capacity(config.source_cache_entries));
        let locks = Arc::new(DocumentLocks::new());
        let documents = DocumentStore::new(pool.clone());
        let fields = FieldStore::new(pool.clone());
        let audits = AuditStore::new(pool);

        let library = DocumentLibrary::new(
            documents.clone(),
            storage.clone(),
            cache.clone(),
            locks.clone(),
        );
        let signer = SigningService::new(
            documents.clone(),
            fields.clone(),
            audits.clone(),
            storage.clone(),
            cache,
            locks,
            config.render_width,
        );

        Ok(Self {
            config,
            documents,
            fields,
            audits,
            library,
            signer,
            storage,
        })
    }
}

/// Parent directory of a file-backed SQLite URL
fn sqlite_file_dir(database_url: &str) -> Option<std::path::PathBuf> {
    let path = database_url.strip_prefix("sqlite:")?;
    let path = path.trim_start_matches("//");
    let path = path.split('?').next()?;
    if path.is_empty() || path.starts_with(':') {
        return None;
    }
    std::path::Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
}
