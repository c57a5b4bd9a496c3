//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the login and protected routes
//! - Wire up the edge pipeline (headers, CORS, body, access log, rate limit)
//! - Bind server to listener
//! - Forward authenticated requests to the upstream
//! - Sweep expired rate limit windows in the background

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::{require_token, Claims, Identity, TokenIssuer, TokenVerifier};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::body::json_body_middleware;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::shutdown::wait as wait_for_shutdown;
use crate::lifecycle::{build_state, StartupError};
use crate::observability::access_log_middleware;
use crate::security::{cors_layer, rate_limit_middleware, security_headers_middleware, RateLimiter};
use crate::upstream::{relative_path, ForwardRequest, Forwarder};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
    pub verifier: Arc<TokenVerifier>,
    pub forwarder: Arc<Forwarder>,
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub protected_prefix: Arc<str>,
    pub propagate_status: bool,
}

/// Body of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails when the configuration is invalid or the signing secret is
    /// unusable.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let state = build_state(&config)?;
        let rate_limiter = state.rate_limiter.clone();
        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            rate_limiter,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// `Router::layer` wraps everything added before it, so layers are listed
    /// innermost first.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let prefix = config.upstream.protected_prefix.as_str();

        let protected = Router::new()
            .route(prefix, any(proxy_handler))
            .route(&format!("{}/", prefix), any(proxy_handler))
            .route(&format!("{}/{{*path}}", prefix), any(proxy_handler))
            .route_layer(middleware::from_fn_with_state(
                state.verifier.clone(),
                require_token,
            ));

        let mut router = Router::new()
            .route(&config.auth.login_path, post(login_handler))
            .merge(protected)
            .fallback(not_found)
            .with_state(state.clone())
            .layer(DefaultBodyLimit::max(config.security.max_body_size));

        // (5) rate limiting
        if let Some(limiter) = state.rate_limiter {
            router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        router
            // (4) access logging
            .layer(middleware::from_fn(access_log_middleware))
            // (3) body parsing
            .layer(middleware::from_fn_with_state(
                config.security.max_body_size,
                json_body_middleware,
            ))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            // (2) cross-origin policy
            .layer(cors_layer(&config.security))
            // (1) security headers
            .layer(middleware::from_fn_with_state(
                config.security.enable_headers,
                security_headers_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            "HTTP server starting"
        );

        if let Some(limiter) = self.rate_limiter.clone() {
            tokio::spawn(sweep_rate_limits(limiter, shutdown.resubscribe()));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Issues a token for the demo identity. The request body is ignored.
async fn login_handler(State(state): State<AppState>) -> Result<Json<TokenResponse>, GatewayError> {
    let identity = Identity::demo();
    let token = state.issuer.issue(&identity)?;

    tracing::info!(user_id = identity.id, username = %identity.username, "Token issued");
    Ok(Json(TokenResponse { token }))
}

/// Relays an authenticated request to the upstream.
async fn proxy_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(path) = relative_path(&state.protected_prefix, uri.path()) else {
        return GatewayError::NotFound.into_response();
    };

    let request = ForwardRequest {
        method,
        path,
        content_type: headers.get(header::CONTENT_TYPE).cloned(),
        body,
        request_id: headers.get(X_REQUEST_ID).cloned(),
    };

    match state.forwarder.forward(request, &claims).await {
        Ok(upstream) => {
            let status = if state.propagate_status {
                upstream.status
            } else {
                StatusCode::OK
            };
            let mut response = (status, upstream.body).into_response();
            match upstream.content_type {
                Some(content_type) => {
                    response.headers_mut().insert(header::CONTENT_TYPE, content_type);
                }
                None => {
                    response.headers_mut().remove(header::CONTENT_TYPE);
                }
            }
            response
        }
        Err(e) => GatewayError::from(e).into_response(),
    }
}

async fn not_found() -> GatewayError {
    GatewayError::NotFound
}

/// Periodically drops elapsed rate limit windows until shutdown.
async fn sweep_rate_limits(limiter: Arc<RateLimiter>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(limiter.window());
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                limiter.prune(Instant::now());
                tracing::trace!("Pruned rate limit windows");
            }
            _ = shutdown.recv() => break,
        }
    }
}
