//! Cross-origin policy.

use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use crate::config::SecurityConfig;

/// Build the CORS layer. An empty origin list allows any origin.
pub fn cors_layer(config: &SecurityConfig) -> CorsLayer {
    let origin = if config.cors_allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{header, Request}, routing::get, Router};
    use tower::ServiceExt;

    async fn preflight(config: &SecurityConfig, origin: &str) -> axum::http::HeaderMap {
        let app = Router::new()
            .route("/api/items", get(|| async { "ok" }))
            .layer(cors_layer(config));
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/items")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap().headers().clone()
    }

    #[tokio::test]
    async fn test_any_origin_by_default() {
        let headers = preflight(&SecurityConfig::default(), "https://app.example.org").await;
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "authorization,content-type"
        );
    }

    #[tokio::test]
    async fn test_origin_list() {
        let config = SecurityConfig {
            cors_allowed_origins: vec!["https://app.example.org".into()],
            ..SecurityConfig::default()
        };
        let allowed = preflight(&config, "https://app.example.org").await;
        assert_eq!(
            allowed[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example.org"
        );

        let denied = preflight(&config, "https://evil.example.net").await;
        assert!(denied.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
