//! Router-wide middleware shared by both services

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    response::{ApiError, ErrorDetail},
    settings::CorsSettings,
};

const MAX_REWRITTEN_BODY: usize = 64 * 1024;

/// Log method, path, status and latency of every request
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );
    response
}

/// Rewrite non-JSON error responses into the standard envelope
///
/// Framework rejections (malformed JSON, unsupported media type, wrong
/// method) come back as plain text or empty bodies.
pub async fn envelope_errors(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    let status = response.status();

    if !(status.is_client_error() || status.is_server_error()) || is_json(response.headers()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let text = match to_bytes(body, MAX_REWRITTEN_BODY).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
        Err(_) => String::new(),
    };

    let message = if text.is_empty() {
        default_message(status)
    } else {
        text
    };

    let new_body = json!({ "success": false, "message": message }).to_string();
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(new_body.len()));

    Response::from_parts(parts, Body::from(new_body))
}

/// Whether 5xx bodies include the internal error detail (`app.debug`)
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorDetailPolicy {
    pub expose: bool,
}

/// Copy [`ErrorDetail`] into the body as `debug` when the policy allows it
pub async fn expose_error_detail(
    State(policy): State<ErrorDetailPolicy>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;
    if !policy.expose {
        return response;
    }
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let mut envelope = match to_bytes(body, MAX_REWRITTEN_BODY).await {
        Ok(bytes) => serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null),
        Err(_) => Value::Null,
    };
    if !envelope.is_object() {
        envelope = json!({ "success": false, "message": "Internal server error" });
    }
    if let Some(fields) = envelope.as_object_mut() {
        fields.insert("debug".to_string(), Value::String(detail));
    }

    let new_body = envelope.to_string();
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(new_body.len()));
    Response::from_parts(parts, Body::from(new_body))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

fn default_message(status: StatusCode) -> String {
    match status {
        StatusCode::NOT_FOUND => "Endpoint not found".to_string(),
        StatusCode::METHOD_NOT_ALLOWED => "Method not allowed".to_string(),
        other => other
            .canonical_reason()
            .unwrap_or("An error occurred")
            .to_string(),
    }
}

/// Router fallback for unknown paths
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Endpoint not found".to_string())
}

/// CORS policy resolved from settings
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Arc<Vec<String>>,
}

impl CorsPolicy {
    pub fn new(settings: &CorsSettings) -> Self {
        Self {
            allowed_origins: Arc::new(settings.allowed_origins.clone()),
        }
    }

    fn allows(&self, origin: &str) -> bool {
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed == origin)
    }

    fn apply(&self, origin: Option<&HeaderValue>, headers: &mut HeaderMap) {
        if let Some(origin) = origin {
            if origin.to_str().map(|o| self.allows(o)).unwrap_or(false) {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
                headers.insert(header::VARY, HeaderValue::from_static("Origin"));
            }
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization, X-Requested-With"),
        );
        headers.insert(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static("X-Total-Count, X-Page-Count"),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static("3600"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }
}

/// Attach CORS headers and answer preflight requests
pub async fn cors(State(policy): State<CorsPolicy>, req: Request, next: Next) -> Response {
    let origin = req.headers().get(header::ORIGIN).cloned();

    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };

    policy.apply(origin.as_ref(), response.headers_mut());
    response
}
