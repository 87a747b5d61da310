//! Request and response bodies for the formsign API

use serde::{Deserialize, Serialize};
use shared_types::{AuditSummary, DocumentInfo, FieldDefinition, NewField};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Document metadata with its fields and latest signing, if any
#[derive(Debug, Serialize)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub document: DocumentInfo,
    pub fields: Vec<FieldDefinition>,
    pub audit: Option<AuditSummary>,
}

#[derive(Debug, Deserialize)]
pub struct FieldsQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceFieldsRequest {
    pub fields: Vec<NewField>,
}

#[derive(Debug, Serialize)]
pub struct ReplaceFieldsResponse {
    pub document_id: String,
    pub page_number: u32,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct GeometryQuery {
    /// Render width in pixels; the configured default when absent
    pub width: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub hash: String,
}
