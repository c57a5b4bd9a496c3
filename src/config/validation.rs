//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check the upstream URL and route paths are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// Longest accepted token lifetime (100 years).
pub const MAX_TOKEN_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. `auth.jwt_secret`).
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.auth.jwt_secret.is_empty() {
        errors.push(ValidationError::new(
            "auth.jwt_secret",
            "must be set (JWT_SECRET)",
        ));
    }

    match config.auth.token_ttl_secs {
        Some(0) => errors.push(ValidationError::new(
            "auth.token_ttl_secs",
            "must be greater than 0 when set",
        )),
        Some(ttl) if ttl > MAX_TOKEN_TTL_SECS => errors.push(ValidationError::new(
            "auth.token_ttl_secs",
            format!("must not exceed {} seconds", MAX_TOKEN_TTL_SECS),
        )),
        _ => {}
    }

    if !config.auth.login_path.starts_with('/') {
        errors.push(ValidationError::new(
            "auth.login_path",
            "must start with '/'",
        ));
    }

    match url::Url::parse(&config.upstream.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            if url.host_str().is_none() {
                errors.push(ValidationError::new("upstream.base_url", "must include a host"));
            }
        }
        Ok(url) => errors.push(ValidationError::new(
            "upstream.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            "upstream.base_url",
            format!("invalid URL: {}", e),
        )),
    }

    let prefix = &config.upstream.protected_prefix;
    if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
        errors.push(ValidationError::new(
            "upstream.protected_prefix",
            "must start with '/', must not end with '/' and must not be the root",
        ));
    }

    if relative_under(prefix, &config.auth.login_path) {
        errors.push(ValidationError::new(
            "auth.login_path",
            "must not be under upstream.protected_prefix",
        ));
    }

    if config.upstream.api_key_header.is_empty()
        || axum::http::HeaderName::from_bytes(config.upstream.api_key_header.as_bytes()).is_err()
    {
        errors.push(ValidationError::new(
            "upstream.api_key_header",
            "must be a valid header name",
        ));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::new("rate_limit.window_secs", "must be greater than 0"));
        }
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::new("rate_limit.max_requests", "must be greater than 0"));
        }
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn relative_under(prefix: &str, path: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.auth.jwt_secret = "secret".into();
        config
    }

    #[test]
    fn test_defaults_with_secret_are_valid() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_missing_secret_rejected() {
        let errors = validate_config(&GatewayConfig::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "auth.jwt_secret");
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.upstream.base_url = "ftp://files.example.com".into();
        config.upstream.protected_prefix = "api/".into();
        config.timeouts.upstream_secs = 0;
        config.rate_limit.max_requests = 0;

        let fields: Vec<_> = validate_config(&config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec![
                "upstream.base_url",
                "upstream.protected_prefix",
                "timeouts.upstream_secs",
                "rate_limit.max_requests",
            ]
        );
    }

    #[test]
    fn test_login_path_must_not_be_protected() {
        let mut config = valid();
        config.auth.login_path = "/api/login".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "auth.login_path");
    }

    #[test]
    fn test_token_ttl_bounds() {
        for ttl in [0, MAX_TOKEN_TTL_SECS + 1, u64::MAX] {
            let mut config = valid();
            config.auth.token_ttl_secs = Some(ttl);
            let errors = validate_config(&config).unwrap_err();
            assert_eq!(errors.len(), 1, "ttl {}", ttl);
            assert_eq!(errors[0].field, "auth.token_ttl_secs");
        }

        for ttl in [1, 3600, MAX_TOKEN_TTL_SECS] {
            let mut config = valid();
            config.auth.token_ttl_secs = Some(ttl);
            assert!(validate_config(&config).is_ok(), "ttl {}", ttl);
        }
    }

    #[test]
    fn test_disabled_rate_limit_skips_checks() {
        let mut config = valid();
        config.rate_limit.enabled = false;
        config.rate_limit.window_secs = 0;
        assert!(validate_config(&config).is_ok());
    }
}
