//! Document ingestion and removal

use crate::cache::{DocumentLocks, SourceCache};
use crate::error::{IngestError, StoreError};
use crate::storage::Storage;
use crate::store::DocumentStore;
use chrono::Utc;
use shared_pdf::{PdfDocument, PdfError};
use shared_types::{hash_document, DocumentInfo};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const DEFAULT_FILE_NAME: &str = "document.pdf";

/// Keeps the document table, stored files, and the source cache in step
#[derive(Debug, Clone)]
pub struct DocumentLibrary {
    documents: DocumentStore,
    storage: Arc<Storage>,
    cache: Arc<SourceCache>,
    locks: Arc<DocumentLocks>,
}

impl DocumentLibrary {
    pub fn new(
        documents: DocumentStore,
        storage: Arc<Storage>,
        cache: Arc<SourceCache>,
        locks: Arc<DocumentLocks>,
    ) -> Self {
        Self {
            documents,
            storage,
            cache,
            locks,
        }
    }

    /// Validate and store an uploaded PDF
    pub async fn ingest(&self, file_name: &str, bytes: Vec<u8>) -> Result<DocumentInfo, IngestError> {
        if bytes.is_empty() {
            return Err(IngestError::Empty);
        }

        let page_count = PdfDocument::from_bytes(&bytes)
            .map(|pdf| pdf.page_count())
            .map_err(IngestError::InvalidPdf)?;
        if page_count == 0 {
            return Err(IngestError::InvalidPdf(PdfError::NoPages));
        }

        let id = Uuid::new_v4().to_string();
        let source_location = Storage::upload_location(&id);
        let document = DocumentInfo {
            id: id.clone(),
            file_name: clean_file_name(file_name),
            file_size: bytes.len() as u64,
            page_count,
            original_hash: hash_document(&bytes),
            source_location: source_location.clone(),
            created_at: Utc::now(),
        };

        self.storage
            .write(&source_location, &bytes)
            .await
            .map_err(StoreError::from)?;
        if let Err(e) = self.documents.insert(&document).await {
            self.storage.remove(&source_location).await.ok();
            return Err(e.into());
        }
        self.cache.insert(&id, bytes);

        info!(document_id = %id, file_name = %document.file_name, page_count, "Document ingested");
        Ok(document)
    }

    pub async fn get(&self, id: &str) -> Result<DocumentInfo, StoreError> {
        self.documents.get(id).await
    }

    /// Original bytes as uploaded
    pub async fn original_bytes(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let document = self.documents.get(id).await?;
        if let Some(bytes) = self.cache.get(id) {
            return Ok(bytes.as_ref().clone());
        }
        self.read_file(id, "Source file", &document.source_location).await
    }

    /// Latest signed output
    pub async fn signed_bytes(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        self.documents.get(id).await?;
        self.read_file(id, "Signed document", &Storage::signed_location(id))
            .await
    }

    async fn read_file(&self, id: &str, entity: &'static str, location: &str) -> Result<Vec<u8>, StoreError> {
        match self.storage.read(location).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::not_found(entity, id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a document with its fields, audit record, files, and cached bytes.
    /// Waits for any in-flight signing of the same document.
    pub async fn remove(&self, id: &str) -> Result<DocumentInfo, StoreError> {
        let _guard = self.locks.lock(id).await;
        let document = self.documents.delete(id).await?;

        for location in [document.source_location.clone(), Storage::signed_location(id)] {
            if let Err(e) = self.storage.remove(&location).await {
                warn!(document_id = %id, %location, error = %e, "Failed to remove stored file");
            }
        }
        self.cache.evict(id);

        info!(document_id = %id, "Document deleted");
        Ok(document)
    }
}

/// Last path segment of an uploaded file name, or a default
fn clean_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        base.to_string()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::store::test_support::memory_pool;
    use crate::store::{AuditStore, FieldStore};
    use tempfile::TempDir;

    pub struct Harness {
        pub dir: TempDir,
        pub library: DocumentLibrary,
        pub documents: DocumentStore,
        pub fields: FieldStore,
        pub audits: AuditStore,
        pub storage: Arc<Storage>,
        pub cache: Arc<SourceCache>,
        pub locks: Arc<DocumentLocks>,
    }

    pub async fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let pool = memory_pool().await;
        let storage = Arc::new(Storage::open(dir.path()).await.unwrap());
        let cache = Arc::new(SourceCache::new());
        let locks = Arc::new(DocumentLocks::new());
        let documents = DocumentStore::new(pool.clone());
        Harness {
            library: DocumentLibrary::new(documents.clone(), storage.clone(), cache.clone(), locks.clone()),
            documents,
            fields: FieldStore::new(pool.clone()),
            audits: AuditStore::new(pool),
            storage,
            cache,
            locks,
            dir,
        }
    }

    pub fn sample_pdf() -> Vec<u8> {
        shared_pdf::placeholder_pdf("Lease Agreement", "Sign below").unwrap()
    }
}
