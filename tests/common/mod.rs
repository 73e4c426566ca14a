#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Json;
use axum::Router;
use compliance_gateway::app::{build_router, AppState};
use compliance_gateway::config::environment::AppConfig;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const MULTIPART_BOUNDARY: &str = "test-boundary-7f3a91c2";

pub fn test_config() -> AppConfig {
    AppConfig {
        rust_env: "test".to_string(),
        api_host: "127.0.0.1".to_string(),
        api_port: 0,
        mongodb_url: None,
        mongodb_database: None,
        redis_url: None,
        generation_api_url: Some("http://127.0.0.1:9".to_string()),
        generation_api_key: Some("test-key".to_string()),
        generation_model: "gemini-1.5-flash".to_string(),
        generation_max_retries: 0,
        generation_timeout_seconds: 5,
        review_api_url: None,
        review_api_key: None,
        review_model: "llama-3.1-70b-versatile".to_string(),
        review_timeout_seconds: 5,
        similarity_threshold: 0.85,
        similarity_top_k: 3,
        semantic_trigger_threshold: 0.92,
        chunk_min_tokens: 300,
        chunk_max_tokens: 500,
        reference_docs_dir: std::env::temp_dir()
            .join(format!("reference-docs-{}", Uuid::new_v4()))
            .to_string_lossy()
            .to_string(),
    }
}

pub fn build_app(config: AppConfig) -> Router {
    build_router(AppState::new(config, None))
}

pub async fn request_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let request = builder.body(body).expect("request build");
    let response = app.clone().oneshot(request).await.expect("request send");
    read_response(response).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    request_json(app, "POST", uri, Some(body)).await
}

pub async fn put_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    request_json(app, "PUT", uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    request_json(app, "DELETE", uri, None).await
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    request_json(app, "GET", uri, None).await
}

/// Hand-built multipart/form-data request with text fields and an optional
/// file part.
pub async fn post_multipart(
    app: &Router,
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> (StatusCode, Value) {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\ncontent-disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\ncontent-disposition: form-data; name=\"file\"; \
                 filename=\"{file_name}\"\r\ncontent-type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request build");
    let response = app.clone().oneshot(request).await.expect("request send");
    read_response(response).await
}

async fn read_response(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

/// Spawns a provider lookalike that answers every request with a canned
/// generation payload, and returns its base URL.
pub async fn spawn_stub_generator(reply_text: &str) -> String {
    let reply = json!({
        "candidates": [{ "content": { "parts": [{ "text": reply_text }] } }]
    });
    let app = Router::new().fallback(move || {
        let reply = reply.clone();
        async move { Json(reply) }
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("stub bind");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

pub async fn app_with_generator(reply_text: &str) -> Router {
    let base = spawn_stub_generator(reply_text).await;
    let mut config = test_config();
    config.generation_api_url = Some(base);
    build_app(config)
}

pub fn rule_body(text: &str, severity: &str) -> Value {
    json!({
        "rule_text": text,
        "severity": severity,
        "created_by": "admin-1"
    })
}
