//! FormSign API - place fields on uploaded PDFs and sign them
//!
//! Provides REST endpoints for:
//! - Document upload, listing, download and removal
//! - Per-page field layouts stored as page percentages
//! - Page geometry for the web placement client
//! - Signing, audit lookup and hash verification

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    // CORS configuration for web clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        // Health check
        .route("/health", get(handlers::health))
        .route("/api/stats", get(handlers::stats))
        // Documents
        .route(
            "/api/documents",
            get(handlers::list_documents).post(handlers::upload_document),
        )
        .route(
            "/api/documents/:id",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        .route("/api/documents/:id/file", get(handlers::download_original))
        .route("/api/documents/:id/signed", get(handlers::download_signed))
        // Field layouts
        .route("/api/documents/:id/fields", get(handlers::list_fields))
        .route(
            "/api/documents/:id/pages/:page/fields",
            put(handlers::replace_page_fields),
        )
        .route(
            "/api/documents/:id/pages/:page/geometry",
            get(handlers::page_geometry),
        )
        .route("/api/fields/:field_id", delete(handlers::delete_field))
        // Signing
        .route("/api/documents/:id/sign", post(handlers::sign_document))
        .route("/api/documents/:id/audit", get(handlers::get_audit))
        .route("/api/documents/:id/verify", post(handlers::verify_document))
        // Stored files
        .nest_service("/files", ServeDir::new(state.storage.root()));

    if let Some(dir) = &state.config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
