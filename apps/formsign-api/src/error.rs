//! Error types for the formsign API

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use formsign_core::{IngestError, SignError, StoreError};
use serde::Serialize;
use shared_pdf::PdfError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    SourceLoad(String),

    #[error("{0}")]
    Render(String),

    #[error("{0}")]
    Persistence(String),

    #[error("{message}")]
    Upload { status: StatusCode, message: String },

    #[error("{0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
    status: u16,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::SourceLoad(_) => (StatusCode::UNPROCESSABLE_ENTITY, "SOURCE_LOAD_ERROR"),
            ApiError::Render(_) => (StatusCode::INTERNAL_SERVER_ERROR, "RENDER_ERROR"),
            ApiError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
            ApiError::Upload { status, .. } => (*status, "UPLOAD_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(code, "{}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code,
            status: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::InvalidField(_) => ApiError::Validation(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Store(store) => store.into(),
            other => ApiError::Validation(other.to_string()),
        }
    }
}

impl From<SignError> for ApiError {
    fn from(err: SignError) -> Self {
        let message = err.to_string();
        match err {
            SignError::Validation(_) => ApiError::Validation(message),
            SignError::NotFound { .. } => ApiError::NotFound(message),
            SignError::SourceLoad { .. } => ApiError::SourceLoad(message),
            SignError::Render { .. } => ApiError::Render(message),
            SignError::Persistence { .. } => ApiError::Persistence(message),
            SignError::Internal(_) => ApiError::Internal(message),
        }
    }
}

impl From<PdfError> for ApiError {
    fn from(err: PdfError) -> Self {
        match err {
            PdfError::PageNotFound { .. } => ApiError::NotFound(err.to_string()),
            PdfError::Geometry(_) => ApiError::Validation(err.to_string()),
            PdfError::Load(_) | PdfError::NoPages | PdfError::MalformedPage(_) => {
                ApiError::SourceLoad(err.to_string())
            }
            PdfError::Save(_) => ApiError::Render(err.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Upload {
            status: err.status(),
            message: err.body_text(),
        }
    }
}
