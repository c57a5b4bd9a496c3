//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Router,
};
use edge_gateway::{GatewayConfig, HttpServer, Shutdown};
use tokio::net::TcpListener;

pub const SECRET: &str = "integration-test-secret";
pub const API_KEY: &str = "backend-api-key";

/// A request as seen by the mock upstream.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A running mock upstream and the requests it received.
pub struct MockUpstream {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

#[allow(dead_code)]
impl MockUpstream {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn received(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a mock upstream.
///
/// - `/status/{code}` answers with that status
/// - `/created` answers 201
/// - `/text` answers a `text/plain` body
/// - anything else echoes method, path and body as JSON
pub async fn start_mock_upstream() -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();

    let app = Router::new().fallback(move |request: Request| {
        let recorded = recorded.clone();
        async move {
            let (parts, body) = request.into_parts();
            let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
            let path = parts.uri.path().to_string();

            recorded.lock().unwrap().push(RecordedRequest {
                method: parts.method.to_string(),
                path: path.clone(),
                query: parts.uri.query().map(str::to_string),
                headers: parts.headers.clone(),
                body: body.clone(),
            });

            if let Some(code) = path.strip_prefix("/status/") {
                let status = code
                    .parse::<u16>()
                    .ok()
                    .and_then(|c| StatusCode::from_u16(c).ok())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                return (status, axum::Json(serde_json::json!({ "upstream": "error" })))
                    .into_response();
            }

            match path.as_str() {
                "/created" => (
                    StatusCode::CREATED,
                    axum::Json(serde_json::json!({ "created": true })),
                )
                    .into_response(),
                "/text" => ([(header::CONTENT_TYPE, "text/plain")], "plain upstream text")
                    .into_response(),
                _ => axum::Json(serde_json::json!({
                    "method": parts.method.to_string(),
                    "path": path,
                    "body": String::from_utf8_lossy(&body),
                }))
                .into_response(),
            }
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream { addr, requests }
}

/// Gateway configuration pointing at `upstream`.
pub fn gateway_config(upstream: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.auth.jwt_secret = SECRET.into();
    config.upstream.base_url = upstream.into();
    config.upstream.api_key = API_KEY.into();
    config
}

/// Start a gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(config).expect("gateway should start");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Log in and return the issued token.
#[allow(dead_code)]
pub async fn login(client: &reqwest::Client, gateway: SocketAddr) -> String {
    let res = client
        .post(format!("http://{}/login", gateway))
        .send()
        .await
        .expect("gateway unreachable");
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}
