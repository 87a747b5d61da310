//! HTTP handlers for the formsign API

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use formsign_core::{DocumentSummary, SignOutcome, SignRequest, StoreError, StoreStats};
use shared_pdf::PdfDocument;
use shared_types::{AuditSummary, DocumentInfo, FieldDefinition, PageGeometry, VerifyOutcome};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// Handler: GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: GET /api/stats
pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<StoreStats>> {
    Ok(Json(state.documents.stats().await?))
}

/// Handler: POST /api/documents (multipart, field `file`)
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<DocumentInfo>)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        let document = state.library.ingest(&file_name, bytes.to_vec()).await?;
        return Ok((StatusCode::CREATED, Json(document)));
    }
    Err(ApiError::Validation(
        "Multipart field 'file' is required".to_string(),
    ))
}

/// Handler: GET /api/documents
pub async fn list_documents(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<DocumentSummary>>> {
    Ok(Json(state.documents.list().await?))
}

/// Handler: GET /api/documents/:id
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DocumentDetail>> {
    let document = state.documents.get(&id).await?;
    let fields = state.fields.list(&id, None).await?;
    let audit = match state.audits.get(&id).await {
        Ok(record) => Some(record.summary()),
        Err(StoreError::NotFound { .. }) => None,
        Err(e) => return Err(e.into()),
    };

    Ok(Json(DocumentDetail {
        document,
        fields,
        audit,
    }))
}

/// Handler: DELETE /api/documents/:id
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.library.remove(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler: GET /api/documents/:id/file
pub async fn download_original(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let document = state.documents.get(&id).await?;
    let bytes = state.library.original_bytes(&id).await?;
    Ok(pdf_response(&document.file_name, bytes))
}

/// Handler: GET /api/documents/:id/signed
pub async fn download_signed(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let document = state.documents.get(&id).await?;
    let bytes = state.library.signed_bytes(&id).await?;
    Ok(pdf_response(&format!("signed-{}", document.file_name), bytes))
}

fn pdf_response(file_name: &str, bytes: Vec<u8>) -> impl IntoResponse {
    let safe: String = file_name
        .chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && *c != '"' && *c != '\\')
        .collect();
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", safe),
            ),
        ],
        bytes,
    )
}

/// Handler: GET /api/documents/:id/fields?page=N
pub async fn list_fields(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<FieldsQuery>,
) -> ApiResult<Json<Vec<FieldDefinition>>> {
    state.documents.get(&id).await?;
    Ok(Json(state.fields.list(&id, query.page).await?))
}

/// Handler: PUT /api/documents/:id/pages/:page/fields
pub async fn replace_page_fields(
    State(state): State<Arc<AppState>>,
    Path((id, page)): Path<(String, u32)>,
    Json(req): Json<ReplaceFieldsRequest>,
) -> ApiResult<Json<ReplaceFieldsResponse>> {
    let document = state.documents.get(&id).await?;
    if page == 0 || page > document.page_count {
        return Err(ApiError::Validation(format!(
            "Page {} is outside the document (1-{})",
            page, document.page_count
        )));
    }

    let count = state.fields.replace_page(&id, page, &req.fields).await?;
    tracing::info!(document_id = %id, page, count, "Replaced page fields");

    Ok(Json(ReplaceFieldsResponse {
        document_id: id,
        page_number: page,
        count,
    }))
}

/// Handler: DELETE /api/fields/:field_id
pub async fn delete_field(
    State(state): State<Arc<AppState>>,
    Path(field_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.fields.delete(&field_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler: GET /api/documents/:id/pages/:page/geometry?width=W
pub async fn page_geometry(
    State(state): State<Arc<AppState>>,
    Path((id, page)): Path<(String, u32)>,
    Query(query): Query<GeometryQuery>,
) -> ApiResult<Json<PageGeometry>> {
    let bytes = state.library.original_bytes(&id).await?;
    let width = query.width.unwrap_or(state.config.render_width);

    let geometry = tokio::task::spawn_blocking(move || {
        PdfDocument::from_bytes(&bytes)?.page_geometry(page, width)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(geometry))
}

/// Handler: POST /api/documents/:id/sign
pub async fn sign_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SignRequest>,
) -> ApiResult<Json<SignOutcome>> {
    Ok(Json(state.signer.sign(&id, req).await?))
}

/// Handler: GET /api/documents/:id/audit
pub async fn get_audit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<AuditSummary>> {
    Ok(Json(state.audits.get(&id).await?.summary()))
}

/// Handler: POST /api/documents/:id/verify
pub async fn verify_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Json<VerifyOutcome>> {
    if req.hash.trim().is_empty() {
        return Err(ApiError::Validation("hash is required".to_string()));
    }
    Ok(Json(state.audits.verify(&id, &req.hash).await?))
}
