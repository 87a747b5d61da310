//! The signing pipeline
//!
//! 1. validate the request and take the per-document lock
//! 2. load document metadata and the stored fields referenced by `values`
//! 3. resolve source bytes: cache, then stored upload, then a placeholder
//! 4. convert stored percent rectangles to PDF points per page geometry
//! 5. rasterize on a blocking thread
//! 6. write the signed file and upsert the audit record

use crate::cache::{DocumentLocks, SourceCache};
use crate::error::{PersistStage, SignError, StoreError};
use crate::storage::Storage;
use crate::store::{AuditStore, DocumentStore, FieldStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_pdf::{placeholder_pdf, rasterize_into, Diagnostic, PdfDocument, PdfError};
use shared_types::geometry::percent_to_pdf;
use shared_types::{
    hash_document, AuditRecord, DocumentInfo, FieldDefinition, FieldSnapshot, FieldValue,
    PageGeometry, SubmittedValue,
};
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;
use tracing::{info, warn};

const PLACEHOLDER_BODY: &str = "Original document unavailable";

/// Values to draw: explicit PDF-point fields, plus values for stored fields
/// keyed by field id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignRequest {
    #[serde(default)]
    pub fields: Vec<FieldValue>,
    #[serde(default)]
    pub values: HashMap<String, SubmittedValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignOutcome {
    pub document_id: String,
    pub original_hash: String,
    pub signed_hash: String,
    pub processed_fields: usize,
    pub signed_location: String,
    pub signed_at: DateTime<Utc>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip)]
    pub signed_bytes: Vec<u8>,
}

struct Rendered {
    bytes: Vec<u8>,
    entries: Vec<FieldValue>,
    processed: usize,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct SigningService {
    documents: DocumentStore,
    fields: FieldStore,
    audits: AuditStore,
    storage: Arc<Storage>,
    cache: Arc<SourceCache>,
    locks: Arc<DocumentLocks>,
    render_width: f64,
}

impl SigningService {
    pub fn new(
        documents: DocumentStore,
        fields: FieldStore,
        audits: AuditStore,
        storage: Arc<Storage>,
        cache: Arc<SourceCache>,
        locks: Arc<DocumentLocks>,
        render_width: f64,
    ) -> Self {
        Self {
            documents,
            fields,
            audits,
            storage,
            cache,
            locks,
            render_width,
        }
    }

    pub async fn sign(&self, document_id: &str, request: SignRequest) -> Result<SignOutcome, SignError> {
        if document_id.trim().is_empty() {
            return Err(SignError::validation("document id is required"));
        }
        if request.fields.is_empty() && request.values.is_empty() {
            return Err(SignError::validation("at least one field value is required"));
        }

        let _guard = self.locks.lock(document_id).await;

        let document = self
            .documents
            .get(document_id)
            .await
            .map_err(|e| source_error(document_id, e))?;

        let stored = if request.values.is_empty() {
            Vec::new()
        } else {
            let all = self
                .fields
                .list(document_id, None)
                .await
                .map_err(|e| source_error(document_id, e))?;
            select_stored(all, &request.values)?
        };

        let source = self.load_source(&document).await?;

        let render_width = self.render_width;
        let id = document.id.clone();
        let rendered = tokio::task::spawn_blocking(move || {
            render(&id, &source, request.fields, &stored, &request.values, render_width)
        })
        .await
        .map_err(|e| SignError::Internal(e.to_string()))??;

        self.persist(document, rendered).await
    }

    /// Source bytes through the cache; a missing upload falls back to a
    /// placeholder, which is never cached
    async fn load_source(&self, document: &DocumentInfo) -> Result<Arc<Vec<u8>>, SignError> {
        let storage = self.storage.clone();
        let location = document.source_location.clone();
        let loaded = self
            .cache
            .get_or_load(&document.id, move || async move { storage.read(&location).await })
            .await;

        match loaded {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(document_id = %document.id, "Source file missing, signing a placeholder");
                placeholder_pdf(&document.file_name, PLACEHOLDER_BODY)
                    .map(Arc::new)
                    .map_err(|e| SignError::SourceLoad {
                        document_id: document.id.clone(),
                        reason: e.to_string(),
                    })
            }
            Err(e) => Err(SignError::SourceLoad {
                document_id: document.id.clone(),
                reason: e.to_string(),
            }),
        }
    }

    async fn persist(&self, document: DocumentInfo, rendered: Rendered) -> Result<SignOutcome, SignError> {
        let signed_hash = hash_document(&rendered.bytes);
        let signed_location = Storage::signed_location(&document.id);

        self.storage
            .write(&signed_location, &rendered.bytes)
            .await
            .map_err(|e| SignError::Persistence {
                document_id: document.id.clone(),
                stage: PersistStage::SignedFile,
                signed_hash: signed_hash.clone(),
                reason: e.to_string(),
            })?;

        let signed_at = Utc::now();
        let record = AuditRecord {
            document_id: document.id.clone(),
            original_hash: document.original_hash.clone(),
            signed_hash: signed_hash.clone(),
            signed_at,
            fields: rendered.entries.iter().map(FieldSnapshot::from).collect(),
            signed_location: signed_location.clone(),
            original_location: document.source_location.clone(),
            file_name: document.file_name.clone(),
            file_size: document.file_size,
            page_count: document.page_count,
            created_at: signed_at,
        };
        self.audits
            .upsert(&record)
            .await
            .map_err(|e| SignError::Persistence {
                document_id: document.id.clone(),
                stage: PersistStage::AuditRecord,
                signed_hash: signed_hash.clone(),
                reason: e.to_string(),
            })?;

        info!(
            document_id = %document.id,
            processed = rendered.processed,
            skipped = rendered.diagnostics.len(),
            %signed_hash,
            "Document signed"
        );

        Ok(SignOutcome {
            document_id: document.id,
            original_hash: document.original_hash,
            signed_hash,
            processed_fields: rendered.processed,
            signed_location,
            signed_at,
            diagnostics: rendered.diagnostics,
            signed_bytes: rendered.bytes,
        })
    }
}

fn source_error(document_id: &str, error: StoreError) -> SignError {
    match error {
        StoreError::NotFound { entity, id } => SignError::NotFound { entity, id },
        other => SignError::SourceLoad {
            document_id: document_id.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Stored fields that have a submitted value, in stored order. Every key in
/// `values` must name a field of the document.
fn select_stored(
    all: Vec<FieldDefinition>,
    values: &HashMap<String, SubmittedValue>,
) -> Result<Vec<FieldDefinition>, SignError> {
    let known: HashSet<&str> = all.iter().map(|f| f.id.as_str()).collect();
    let mut unknown: Vec<&str> = values
        .keys()
        .map(String::as_str)
        .filter(|id| !known.contains(id))
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        return Err(SignError::validation(format!(
            "unknown field ids: {}",
            unknown.join(", ")
        )));
    }
    Ok(all
        .into_iter()
        .filter(|f| values.contains_key(&f.id))
        .collect())
}

/// Convert stored percent fields to PDF points using each page's geometry
pub fn resolve_stored_values(
    pdf: &PdfDocument,
    stored: &[FieldDefinition],
    values: &HashMap<String, SubmittedValue>,
    render_width: f64,
) -> Result<Vec<FieldValue>, SignError> {
    let mut geometries: HashMap<u32, PageGeometry> = HashMap::new();
    let mut resolved = Vec::with_capacity(stored.len());

    for field in stored {
        let Some(value) = values.get(&field.id) else {
            continue;
        };
        let geometry = match geometries.get(&field.page_number) {
            Some(geometry) => *geometry,
            None => {
                let geometry = pdf
                    .page_geometry(field.page_number, render_width)
                    .map_err(|e| match e {
                        PdfError::PageNotFound { page, page_count } => SignError::validation(format!(
                            "field {} is on page {} but the document has {} pages",
                            field.id, page, page_count
                        )),
                        other => SignError::validation(other.to_string()),
                    })?;
                geometries.insert(field.page_number, geometry);
                geometry
            }
        };
        let rect = percent_to_pdf(&field.rect(), &geometry);
        resolved.push(FieldValue::new(
            field.field_type,
            rect,
            field.page_number,
            Some(value.clone()),
        ));
    }
    Ok(resolved)
}

/// CPU-bound part of signing: parse, resolve, draw, serialize
fn render(
    document_id: &str,
    source: &[u8],
    explicit: Vec<FieldValue>,
    stored: &[FieldDefinition],
    values: &HashMap<String, SubmittedValue>,
    render_width: f64,
) -> Result<Rendered, SignError> {
    let mut pdf = PdfDocument::from_bytes(source).map_err(|e| SignError::SourceLoad {
        document_id: document_id.to_string(),
        reason: e.to_string(),
    })?;

    let mut entries = explicit;
    entries.extend(resolve_stored_values(&pdf, stored, values, render_width)?);

    let report = rasterize_into(&mut pdf, &entries).map_err(|source| SignError::Render {
        document_id: document_id.to_string(),
        source,
    })?;
    let bytes = pdf.save_to_bytes().map_err(|source| SignError::Render {
        document_id: document_id.to_string(),
        source,
    })?;

    Ok(Rendered {
        bytes,
        entries,
        processed: report.processed,
        diagnostics: report.diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::test_support::{harness, sample_pdf, Harness};
    use pretty_assertions::assert_eq;
    use shared_types::{FieldType, IntegrityStatus, NewField, PdfPoints, Rect};

    fn service(h: &Harness) -> SigningService {
        SigningService::new(
            h.documents.clone(),
            h.fields.clone(),
            h.audits.clone(),
            h.storage.clone(),
            h.cache.clone(),
            h.locks.clone(),
            800.0,
        )
    }

    fn text_field(value: &str) -> FieldValue {
        FieldValue::new(
            FieldType::Text,
            Rect::<PdfPoints>::new(72.0, 600.0, 200.0, 30.0),
            1,
            Some(value.into()),
        )
    }

    fn request(fields: Vec<FieldValue>) -> SignRequest {
        SignRequest {
            fields,
            values: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_sign_writes_output_and_audit() {
        let h = harness().await;
        let document = h.library.ingest("lease.pdf", sample_pdf()).await.unwrap();

        let outcome = service(&h)
            .sign(&document.id, request(vec![text_field("Jane Doe")]))
            .await
            .unwrap();

        assert_eq!(outcome.processed_fields, 1);
        assert_eq!(outcome.original_hash, document.original_hash);
        assert_eq!(outcome.signed_hash, hash_document(&outcome.signed_bytes));
        assert_eq!(outcome.signed_location, format!("signed/{}.pdf", document.id));
        assert_eq!(
            h.storage.read(&outcome.signed_location).await.unwrap(),
            outcome.signed_bytes
        );

        let audit = h.audits.get(&document.id).await.unwrap();
        assert_eq!(audit.signed_hash, outcome.signed_hash);
        assert_eq!(audit.original_hash, document.original_hash);
        assert_eq!(audit.fields.len(), 1);
        assert_eq!(audit.summary().integrity, IntegrityStatus::Modified);
    }

    #[tokio::test]
    async fn test_empty_values_process_nothing() {
        let h = harness().await;
        let document = h.library.ingest("a.pdf", sample_pdf()).await.unwrap();
        let outcome = service(&h)
            .sign(&document.id, request(vec![text_field("")]))
            .await
            .unwrap();
        assert_eq!(outcome.processed_fields, 0);
        assert!(h.audits.get(&document.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_resign_keeps_one_audit_record() {
        let h = harness().await;
        let document = h.library.ingest("a.pdf", sample_pdf()).await.unwrap();
        let signer = service(&h);

        let first = signer
            .sign(&document.id, request(vec![text_field("one")]))
            .await
            .unwrap();
        let second = signer
            .sign(&document.id, request(vec![text_field("two")]))
            .await
            .unwrap();
        assert_ne!(first.signed_hash, second.signed_hash);

        let audit = h.audits.get(&document.id).await.unwrap();
        assert_eq!(audit.signed_hash, second.signed_hash);
        assert_eq!(h.documents.stats().await.unwrap().signed_documents, 1);
    }

    #[tokio::test]
    async fn test_stored_values_resolve_through_geometry() {
        let h = harness().await;
        let document = h.library.ingest("a.pdf", sample_pdf()).await.unwrap();
        h.fields
            .replace_page(
                &document.id,
                1,
                &[NewField {
                    field_type: FieldType::Text,
                    x_percent: 10.0,
                    y_percent: 85.0,
                    width_percent: 20.0,
                    height_percent: 5.0,
                    label: "Name".to_string(),
                    required: true,
                }],
            )
            .await
            .unwrap();
        let field_id = h.fields.list(&document.id, None).await.unwrap()[0].id.clone();

        let mut values = HashMap::new();
        values.insert(field_id, SubmittedValue::from("Jane"));
        let outcome = service(&h)
            .sign(
                &document.id,
                SignRequest {
                    fields: Vec::new(),
                    values,
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.processed_fields, 1);

        let audit = h.audits.get(&document.id).await.unwrap();
        let snapshot = &audit.fields[0];
        assert!((snapshot.x - 61.2).abs() < 1e-9);
        assert!((snapshot.y - 673.2).abs() < 1e-9);
        assert!((snapshot.width - 122.4).abs() < 1e-9);
        assert!((snapshot.height - 39.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unknown_field_id_is_validation_error() {
        let h = harness().await;
        let document = h.library.ingest("a.pdf", sample_pdf()).await.unwrap();
        let mut values = HashMap::new();
        values.insert("missing".to_string(), SubmittedValue::from("x"));
        let result = service(&h)
            .sign(
                &document.id,
                SignRequest {
                    fields: Vec::new(),
                    values,
                },
            )
            .await;
        assert!(matches!(result, Err(SignError::Validation(_))));
    }

    #[tokio::test]
    async fn test_request_validation() {
        let h = harness().await;
        let signer = service(&h);
        assert!(matches!(
            signer.sign("doc", SignRequest::default()).await,
            Err(SignError::Validation(_))
        ));
        assert!(matches!(
            signer.sign(" ", request(vec![text_field("x")])).await,
            Err(SignError::Validation(_))
        ));
        assert!(matches!(
            signer.sign("ghost", request(vec![text_field("x")])).await,
            Err(SignError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_source_signs_placeholder() {
        let h = harness().await;
        let document = h.library.ingest("gone.pdf", sample_pdf()).await.unwrap();
        h.cache.evict(&document.id);
        h.storage.remove(&document.source_location).await.unwrap();

        let outcome = service(&h)
            .sign(&document.id, request(vec![text_field("x")]))
            .await
            .unwrap();
        assert_eq!(outcome.processed_fields, 1);
        assert!(h.cache.get(&document.id).is_none());

        let pdf = PdfDocument::from_bytes(&outcome.signed_bytes).unwrap();
        assert_eq!(pdf.page_count(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_source_is_source_load_error() {
        let h = harness().await;
        let document = h.library.ingest("a.pdf", sample_pdf()).await.unwrap();
        h.cache.insert(&document.id, b"not a pdf".to_vec());

        let result = service(&h)
            .sign(&document.id, request(vec![text_field("x")]))
            .await;
        assert!(matches!(result, Err(SignError::SourceLoad { .. })));
        assert!(h.audits.get(&document.id).await.is_err());
    }

    #[test]
    fn test_persistence_error_says_signing_succeeded() {
        let error = SignError::Persistence {
            document_id: "doc".to_string(),
            stage: PersistStage::AuditRecord,
            signed_hash: "abc".to_string(),
            reason: "disk full".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Document doc was signed (hash abc) but recording the audit failed: disk full"
        );
    }

    #[test]
    fn test_sign_request_accepts_client_shapes() {
        let json = r#"{
            "fields": [{"type": "radio", "x": 1, "y": 2, "width": 10, "height": 10, "page": 1, "value": true}],
            "values": {"f1": "Jane", "f2": false}
        }"#;
        let request: SignRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.fields[0].field_type, FieldType::Radio);
        assert_eq!(request.fields[0].value, Some(SubmittedValue::Flag(true)));
        assert_eq!(request.values["f1"], SubmittedValue::from("Jane"));
        assert_eq!(request.values["f2"], SubmittedValue::Flag(false));
    }
}
