//! Forwarding client for the single upstream service.

use axum::body::Bytes;
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use reqwest::Client;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::auth::Claims;
use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::http::X_REQUEST_ID;
use crate::observability::metrics;

/// Errors from a forwarded call.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The upstream answered with a non-2xx status.
    #[error("Request failed with status code {}", .status.as_u16())]
    Status { status: StatusCode },

    /// The call failed below HTTP (connect, DNS, timeout, body read).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The configured API key header could not be built.
    #[error("invalid upstream credential header: {0}")]
    InvalidCredential(String),
}

impl ForwardError {
    /// Upstream status, when the upstream answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ForwardError::Status { status } => Some(*status),
            _ => None,
        }
    }
}

/// An inbound request, reduced to what gets relayed.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    /// Path relative to the protected prefix, always starting with `/`.
    pub path: String,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
    pub request_id: Option<HeaderValue>,
}

/// A successful upstream reply.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// Relays requests to the configured upstream.
///
/// One attempt per request, no retries. The caller's token is never sent; the
/// static API key is attached instead.
pub struct Forwarder {
    client: Client,
    base_url: String,
    credential: Option<(HeaderName, HeaderValue)>,
}

impl Forwarder {
    pub fn new(config: &UpstreamConfig, timeouts: &TimeoutConfig) -> Result<Self, ForwardError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            .build()?;

        let credential = if config.api_key.is_empty() {
            tracing::warn!("BACKEND_API_KEY is empty, upstream calls carry no credential");
            None
        } else {
            let name = HeaderName::from_bytes(config.api_key_header.as_bytes())
                .map_err(|e| ForwardError::InvalidCredential(e.to_string()))?;
            let mut value = HeaderValue::from_str(&config.api_key)
                .map_err(|e| ForwardError::InvalidCredential(e.to_string()))?;
            value.set_sensitive(true);
            Some((name, value))
        };

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credential,
        })
    }

    /// The URL a relative path is sent to.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send `request` upstream on behalf of `claims`.
    pub async fn forward(
        &self,
        request: ForwardRequest,
        claims: &Claims,
    ) -> Result<UpstreamResponse, ForwardError> {
        let start = Instant::now();
        let url = self.url_for(&request.path);

        tracing::debug!(
            method = %request.method,
            url = %url,
            user_id = claims.id,
            body_bytes = request.body.len(),
            "Forwarding request"
        );

        let mut builder = self.client.request(request.method.clone(), &url);
        if let Some((name, value)) = &self.credential {
            builder = builder.header(name.clone(), value.clone());
        }
        if let Some(request_id) = request.request_id {
            builder = builder.header(X_REQUEST_ID, request_id);
        }
        if !request.body.is_empty() {
            if let Some(content_type) = request.content_type {
                builder = builder.header(header::CONTENT_TYPE, content_type);
            }
            builder = builder.body(request.body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Upstream unreachable");
                metrics::record_upstream("error", start);
                return Err(ForwardError::Transport(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = %status, "Upstream returned error status");
            metrics::record_upstream("status_error", start);
            return Err(ForwardError::Status { status });
        }

        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response.bytes().await.inspect_err(|e| {
            tracing::error!(url = %url, error = %e, "Failed to read upstream body");
            metrics::record_upstream("error", start);
        })?;

        metrics::record_upstream("success", start);
        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Path of `path` relative to `prefix`, or `None` when it is not under it.
///
/// `/api` and `/api/` both map to `/`; `/apix` is not under `/api`.
pub fn relative_path(prefix: &str, path: &str) -> Option<String> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some("/".to_string())
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        None
    }
}
