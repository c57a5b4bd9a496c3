//! Token gate for protected routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::auth::token::{AuthError, TokenVerifier};
use crate::error::GatewayError;
use crate::observability::metrics;

/// Verifies the bearer token and attaches [`Claims`](crate::auth::Claims) to
/// the request before passing it on.
pub async fn require_token(
    State(verifier): State<Arc<TokenVerifier>>,
    mut request: Request,
    next: Next,
) -> Response {
    let outcome = match request.headers().get(header::AUTHORIZATION) {
        None => verifier.verify_header(None),
        Some(value) => match value.to_str() {
            Ok(raw) => verifier.verify_header(Some(raw)),
            Err(_) => Err(AuthError::Forbidden(
                "authorization header is not visible ASCII".to_string(),
            )),
        },
    };

    match outcome {
        Ok(claims) => {
            tracing::debug!(
                user_id = claims.id,
                username = %claims.username,
                "Token verified"
            );
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => {
            tracing::debug!(
                path = %request.uri().path(),
                error = %err,
                "Request rejected by auth gate"
            );
            metrics::record_auth_failure(err.kind());
            GatewayError::from(err).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Claims, Identity, TokenIssuer};
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    const SECRET: &str = "middleware-secret";

    fn app() -> Router {
        let verifier = Arc::new(TokenVerifier::new(SECRET).unwrap());
        Router::new()
            .route(
                "/api/whoami",
                get(|Extension(claims): Extension<Claims>| async move { claims.username }),
            )
            .route_layer(middleware::from_fn_with_state(verifier, require_token))
    }

    async fn call(authorization: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/api/whoami");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_valid_token_attaches_claims() {
        let token = TokenIssuer::new(SECRET, None)
            .unwrap()
            .issue(&Identity::demo())
            .unwrap();
        let (status, body) = call(Some(&format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "admin");
    }

    #[tokio::test]
    async fn test_missing_header_is_401() {
        let (status, body) = call(None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, r#"{"error":"Unauthorized"}"#);
    }

    #[tokio::test]
    async fn test_bad_tokens_are_403() {
        for value in ["Bearer garbage", "no-space-no-scheme", "Bearer "] {
            let (status, body) = call(Some(value)).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "header {:?}", value);
            assert_eq!(body, r#"{"error":"Forbidden"}"#);
        }
    }

    #[tokio::test]
    async fn test_non_ascii_header_is_403() {
        let request = Request::builder()
            .uri("/api/whoami")
            .header(
                header::AUTHORIZATION,
                header::HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap(),
            )
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
