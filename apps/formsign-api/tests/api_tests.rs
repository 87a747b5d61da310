//! End-to-end tests for the formsign HTTP surface

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use formsign_api::{config::Config, router, state::AppState};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use shared_pdf::placeholder_pdf;
use shared_types::hash_document;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "formsign-test-boundary";

struct TestApp {
    router: Router,
    _dir: TempDir,
}

async fn app_with(extra: &[(&str, &str)]) -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut env: HashMap<String, String> = HashMap::new();
    env.insert("DATABASE_URL".into(), "sqlite::memory:".into());
    env.insert(
        "FORMSIGN_STORAGE_DIR".into(),
        dir.path().join("files").display().to_string(),
    );
    for (k, v) in extra {
        env.insert(k.to_string(), v.to_string());
    }
    let config = Config::from_lookup(|key| env.get(key).cloned());

    let pool = formsign_core::store::connect(&config.database_url, 1)
        .await
        .unwrap();
    let state = AppState::with_pool(config, pool).await.unwrap();

    TestApp {
        router: router(Arc::new(state)),
        _dir: dir,
    }
}

async fn app() -> TestApp {
    app_with(&[]).await
}

fn sample_pdf() -> Vec<u8> {
    placeholder_pdf("Lease Agreement", "Sign below").unwrap()
}

fn multipart_body(file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, body) = self.get(uri).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn send_json(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn delete(&self, uri: &str) -> StatusCode {
        let request = Request::delete(uri).body(Body::empty()).unwrap();
        self.send(request).await.0
    }

    async fn upload(&self, file_name: &str, bytes: &[u8]) -> (StatusCode, Value) {
        let body = multipart_body(file_name, bytes);
        let request = Request::post("/api/documents")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();
        let (status, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn upload_sample(&self) -> String {
        let (status, document) = self.upload("lease.pdf", &sample_pdf()).await;
        assert_eq!(status, StatusCode::CREATED);
        document["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = app.get_json("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_upload_list_and_download() {
    let app = app().await;
    let pdf = sample_pdf();
    let (status, document) = app.upload("lease.pdf", &pdf).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(document["file_name"], "lease.pdf");
    assert_eq!(document["page_count"], 1);
    assert_eq!(document["original_hash"], hash_document(&pdf));
    let id = document["id"].as_str().unwrap();

    let (status, list) = app.get_json("/api/documents").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], id);
    assert_eq!(list[0]["field_count"], 0);
    assert_eq!(list[0]["signed"], false);

    let (status, detail) = app.get_json(&format!("/api/documents/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["fields"], json!([]));
    assert_eq!(detail["audit"], Value::Null);

    let (status, bytes) = app.get(&format!("/api/documents/{}/file", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, pdf);

    let (status, bytes) = app.get(&format!("/files/uploads/{}.pdf", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, pdf);
}

#[tokio::test]
async fn test_upload_rejects_non_pdf() {
    let app = app().await;
    let (status, body) = app.upload("notes.pdf", b"just some text").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (_, list) = app.get_json("/api/documents").await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let app = app_with(&[("FORMSIGN_MAX_UPLOAD_MB", "1")]).await;
    let (status, _) = app.upload("big.pdf", &vec![b'x'; 2 * 1024 * 1024]).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_replace_list_and_delete_fields() {
    let app = app().await;
    let id = app.upload_sample().await;

    let fields = json!({
        "fields": [
            {"field_type": "signature", "x_percent": 10.0, "y_percent": 5.0,
             "width_percent": 20.0, "height_percent": 5.0, "label": "Tenant"},
            {"field_type": "date", "x_percent": 60.0, "y_percent": 5.0,
             "width_percent": 90.0, "height_percent": 5.0}
        ]
    });
    let (status, body) = app
        .send_json(Method::PUT, &format!("/api/documents/{}/pages/1/fields", id), fields)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (status, listed) = app
        .get_json(&format!("/api/documents/{}/fields?page=1", id))
        .await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap().clone();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["field_type"], "signature");
    assert_eq!(listed[0]["label"], "Tenant");

    let field_id = listed[0]["id"].as_str().unwrap();
    assert_eq!(
        app.delete(&format!("/api/fields/{}", field_id)).await,
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        app.delete(&format!("/api/fields/{}", field_id)).await,
        StatusCode::NOT_FOUND
    );

    let (_, listed) = app.get_json(&format!("/api/documents/{}/fields", id)).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_replace_fields_validation() {
    let app = app().await;
    let id = app.upload_sample().await;

    let zero_width = json!({"fields": [
        {"field_type": "text", "x_percent": 10.0, "y_percent": 5.0,
         "width_percent": 0.0, "height_percent": 5.0}
    ]});
    let (status, _) = app
        .send_json(Method::PUT, &format!("/api/documents/{}/pages/1/fields", id), zero_width)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send_json(
            Method::PUT,
            &format!("/api/documents/{}/pages/3/fields", id),
            json!({"fields": []}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send_json(
            Method::PUT,
            "/api/documents/missing/pages/1/fields",
            json!({"fields": []}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_page_geometry() {
    let app = app().await;
    let id = app.upload_sample().await;

    let (status, geometry) = app
        .get_json(&format!("/api/documents/{}/pages/1/geometry?width=800", id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(geometry["width_points"], 612.0);
    assert_eq!(geometry["height_points"], 792.0);
    let rendered_height = geometry["height_pixels"].as_f64().unwrap();
    assert!((rendered_height - 1035.294).abs() < 0.01);

    let (status, _) = app
        .get_json(&format!("/api/documents/{}/pages/2/geometry", id))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sign_audit_and_verify() {
    let app = app().await;
    let id = app.upload_sample().await;

    let (_, _) = app
        .send_json(
            Method::PUT,
            &format!("/api/documents/{}/pages/1/fields", id),
            json!({"fields": [
                {"field_type": "radio", "x_percent": 10.0, "y_percent": 20.0,
                 "width_percent": 3.0, "height_percent": 3.0}
            ]}),
        )
        .await;
    let (_, fields) = app.get_json(&format!("/api/documents/{}/fields", id)).await;
    let radio_id = fields[0]["id"].as_str().unwrap().to_string();

    let request = json!({
        "fields": [
            {"type": "text", "x": 72.0, "y": 100.0, "width": 200.0, "height": 20.0,
             "page": 1, "value": "Jane Doe"}
        ],
        "values": { (radio_id.as_str()): true }
    });
    let (status, outcome) = app
        .send_json(Method::POST, &format!("/api/documents/{}/sign", id), request)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["processed_fields"], 2);
    assert_eq!(outcome["diagnostics"], json!([]));
    let signed_hash = outcome["signed_hash"].as_str().unwrap().to_string();

    let (status, signed) = app.get(&format!("/api/documents/{}/signed", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hash_document(&signed), signed_hash);

    let (status, audit) = app.get_json(&format!("/api/documents/{}/audit", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(audit["signed_hash"], signed_hash.as_str());
    assert_eq!(audit["field_count"], 2);
    assert_eq!(audit["integrity"], "Modified");

    let (status, verified) = app
        .send_json(
            Method::POST,
            &format!("/api/documents/{}/verify", id),
            json!({"hash": format!("  {}  ", signed_hash.to_uppercase())}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["is_valid"], true);

    let (_, verified) = app
        .send_json(
            Method::POST,
            &format!("/api/documents/{}/verify", id),
            json!({"hash": "0".repeat(64)}),
        )
        .await;
    assert_eq!(verified["is_valid"], false);

    let (_, list) = app.get_json("/api/documents").await;
    assert_eq!(list[0]["signed"], true);
}

#[tokio::test]
async fn test_sign_errors() {
    let app = app().await;
    let id = app.upload_sample().await;

    let (status, body) = app
        .send_json(Method::POST, &format!("/api/documents/{}/sign", id), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .send_json(
            Method::POST,
            &format!("/api/documents/{}/sign", id),
            json!({"values": {"no-such-field": "x"}}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let text = json!({"fields": [
        {"type": "text", "x": 72.0, "y": 100.0, "width": 200.0, "height": 20.0,
         "page": 1, "value": "x"}
    ]});
    let (status, body) = app
        .send_json(Method::POST, "/api/documents/missing/sign", text)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = app.get_json(&format!("/api/documents/{}/audit", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send_json(
            Method::POST,
            &format!("/api/documents/{}/verify", id),
            json!({"hash": "  "}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_document_and_stats() {
    let app = app().await;
    let id = app.upload_sample().await;
    let _other = app.upload_sample().await;

    let (status, stats) = app.get_json("/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["documents"], 2);

    assert_eq!(
        app.delete(&format!("/api/documents/{}", id)).await,
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        app.delete(&format!("/api/documents/{}", id)).await,
        StatusCode::NOT_FOUND
    );

    let (status, _) = app.get(&format!("/api/documents/{}/file", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/files/uploads/{}.pdf", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, stats) = app.get_json("/api/stats").await;
    assert_eq!(stats["documents"], 1);
}
