//! Request-scoped errors.
//!
//! Every error a request can end in is one of these variants; the handler
//! boundary turns them into a status code plus `{"error": ...}` body (see
//! `http::response`).

use axum::http::StatusCode;
use thiserror::Error;

use crate::auth::{AuthError, SigningError};
use crate::upstream::ForwardError;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// No credential offered.
    #[error("Unauthorized")]
    Unauthenticated,

    /// Credential present but invalid or expired.
    #[error("Forbidden")]
    Forbidden,

    /// Per-client quota exhausted for the current window.
    #[error("Too many requests, please try again later.")]
    RateLimited { retry_after_secs: u64 },

    /// The forwarded call failed. `status` is set when the upstream answered.
    #[error("{message}")]
    Upstream {
        status: Option<StatusCode>,
        message: String,
    },

    /// Body declared as JSON could not be parsed.
    #[error("{0}")]
    InvalidBody(String),

    #[error("request entity too large (limit {limit} bytes)")]
    PayloadTooLarge { limit: usize },

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("Not Found")]
    NotFound,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthenticated => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden => StatusCode::FORBIDDEN,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Upstream { status, .. } => {
                status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            GatewayError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => GatewayError::Unauthenticated,
            AuthError::Forbidden(_) => GatewayError::Forbidden,
        }
    }
}

impl From<ForwardError> for GatewayError {
    fn from(err: ForwardError) -> Self {
        GatewayError::Upstream {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GatewayError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(GatewayError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            GatewayError::RateLimited { retry_after_secs: 1 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            GatewayError::Upstream { status: None, message: "refused".into() }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::Upstream {
                status: Some(StatusCode::NOT_FOUND),
                message: "x".into()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_forbidden_reason_not_exposed() {
        let err = GatewayError::from(AuthError::Forbidden("InvalidSignature".into()));
        assert_eq!(err.to_string(), "Forbidden");
    }
}
