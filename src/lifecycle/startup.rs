//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the token issuer/verifier, forwarder and rate limiter
//! - Prove the signing secret works before accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Signing problems surface here, never at request time

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::auth::{Identity, SigningError, TokenIssuer, TokenVerifier};
use crate::config::validation::validate_config;
use crate::config::{ConfigError, GatewayConfig, ListenerConfig};
use crate::http::server::AppState;
use crate::security::RateLimiter;
use crate::upstream::{ForwardError, Forwarder};

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("upstream client error: {0}")]
    Upstream(#[from] ForwardError),

    #[error("failed to bind {address}: {source}")]
    Io {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Build the shared handler state from a configuration.
pub fn build_state(config: &GatewayConfig) -> Result<AppState, StartupError> {
    validate_config(config).map_err(ConfigError::Validation)?;

    let ttl = config.auth.token_ttl_secs.map(Duration::from_secs);
    let issuer = TokenIssuer::new(&config.auth.jwt_secret, ttl)?;
    let verifier = TokenVerifier::new(&config.auth.jwt_secret)?;

    // Sign and verify once so a broken secret stops the process here.
    let probe = issuer.issue(&Identity::demo())?;
    verifier
        .verify_token(&probe)
        .map_err(|e| SigningError::Probe(e.to_string()))?;

    let forwarder = Forwarder::new(&config.upstream, &config.timeouts)?;

    let rate_limiter = config
        .rate_limit
        .enabled
        .then(|| Arc::new(RateLimiter::in_memory(&config.rate_limit)));

    Ok(AppState {
        issuer: Arc::new(issuer),
        verifier: Arc::new(verifier),
        forwarder: Arc::new(forwarder),
        rate_limiter,
        protected_prefix: config.upstream.protected_prefix.as_str().into(),
        propagate_status: config.upstream.propagate_status,
    })
}

/// Bind the inbound TCP listener.
pub async fn bind_listener(config: &ListenerConfig) -> Result<TcpListener, StartupError> {
    let address = config.bind_address();
    TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Io { address, source })
}
