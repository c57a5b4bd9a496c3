//! Security response headers.
//!
//! # Responsibilities
//! - Add a hardened default header set to every response
//! - Leave headers the upstream or a handler already set untouched
//!
//! # Design Decisions
//! - Same defaults for every route, including errors and preflights
//! - Switchable via `security.enable_headers`

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Default header set applied to responses.
pub const SECURITY_HEADERS: &[(&str, &str)] = &[
    (
        "content-security-policy",
        "default-src 'self';base-uri 'self';font-src 'self' https: data:;form-action 'self';\
         frame-ancestors 'self';img-src 'self' data:;object-src 'none';script-src 'self';\
         script-src-attr 'none';style-src 'self' https: 'unsafe-inline';upgrade-insecure-requests",
    ),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

/// Adds [`SECURITY_HEADERS`] to the response when enabled.
pub async fn security_headers_middleware(
    State(enabled): State<bool>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    if !enabled {
        return response;
    }

    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers
            .entry(HeaderName::from_static(*name))
            .or_insert_with(|| HeaderValue::from_static(*value));
    }
    headers.remove("x-powered-by");
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(enabled: bool) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .route(
                "/framed",
                get(|| async { ([("x-frame-options", "DENY")], "ok") }),
            )
            .layer(middleware::from_fn_with_state(enabled, security_headers_middleware))
    }

    async fn get_headers(enabled: bool, uri: &str) -> axum::http::HeaderMap {
        app(enabled)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .headers()
            .clone()
    }

    #[tokio::test]
    async fn test_headers_added() {
        let headers = get_headers(true, "/").await;
        for (name, value) in SECURITY_HEADERS {
            assert_eq!(headers[*name], *value, "header {}", name);
        }
    }

    #[tokio::test]
    async fn test_existing_header_kept() {
        let headers = get_headers(true, "/framed").await;
        assert_eq!(headers["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn test_disabled() {
        let headers = get_headers(false, "/").await;
        assert!(headers.get("x-content-type-options").is_none());
    }
}
