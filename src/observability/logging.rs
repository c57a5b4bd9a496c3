//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Emit one access event per request (combined log fields)
//! - Configure log level at runtime
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and RUST_LOG

use std::net::SocketAddr;
use std::time::Instant;
use axum::{
    extract::{ConnectInfo, Request},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::http::request::request_id_of;
use crate::observability::metrics;

/// Default filter when RUST_LOG is not set.
pub fn default_filter(config: &ObservabilityConfig) -> String {
    format!("edge_gateway={},tower_http=debug", config.log_level)
}

/// Install the global tracing subscriber.
pub fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(config).into());

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

/// Logs each completed request and records request metrics.
pub async fn access_log_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string());
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();
    let request_id = request_id_of(&request);
    let referrer = header_or_dash(&request, header::REFERER);
    let user_agent = header_or_dash(&request, header::USER_AGENT);

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let content_length = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    tracing::info!(
        target: "access",
        remote_addr = %remote_addr,
        method = %method,
        uri = %uri,
        version = ?version,
        status,
        content_length = %content_length,
        referrer = %referrer,
        user_agent = %user_agent,
        latency_ms = start.elapsed().as_millis() as u64,
        request_id = %request_id,
        "request completed"
    );
    metrics::record_request(method.as_str(), status, start);

    response
}

fn header_or_dash(request: &Request, name: header::HeaderName) -> String {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}
