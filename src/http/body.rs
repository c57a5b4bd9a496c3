//! Request body buffering and JSON checking.
//!
//! # Responsibilities
//! - Enforce the maximum request body size
//! - Reject bodies declared as JSON that do not parse
//! - Hand the original bytes on unchanged
//!
//! # Design Decisions
//! - Limits checked from Content-Length before reading (early rejection)
//! - Only objects and arrays are accepted at the top level
//! - Non-JSON content types pass through untouched
//! - Return 413 Payload Too Large or 400 Bad Request

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;

/// True when the Content-Type is `application/json` or a `+json` type.
pub fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Check a JSON body the way a strict parser would.
pub fn check_json(bytes: &[u8]) -> Result<(), GatewayError> {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(value) if value.is_object() || value.is_array() => Ok(()),
        Ok(_) => Err(GatewayError::InvalidBody(
            "JSON body must be an object or an array".to_string(),
        )),
        Err(e) => Err(GatewayError::InvalidBody(format!("Invalid JSON body: {}", e))),
    }
}

/// Buffers the body up to `limit` bytes and validates JSON payloads.
pub async fn json_body_middleware(
    State(limit): State<usize>,
    request: Request,
    next: Next,
) -> Response {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return GatewayError::PayloadTooLarge { limit }.into_response();
    }

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, limit, "Failed to buffer request body");
            return GatewayError::PayloadTooLarge { limit }.into_response();
        }
    };

    if !bytes.is_empty() && is_json(&parts.headers) {
        if let Err(err) = check_json(&bytes) {
            tracing::debug!(error = %err, "Rejected request body");
            return err.into_response();
        }
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
