//! Rate limiting across the whole edge pipeline.

mod common;

use common::{client, gateway_config, start_gateway, start_mock_upstream};
use serde_json::{json, Value};

#[tokio::test]
async fn test_requests_over_limit_are_rejected() {
    let upstream = start_mock_upstream().await;
    let mut config = gateway_config(&upstream.base_url());
    config.rate_limit.max_requests = 3;
    let (gateway, shutdown) = start_gateway(config).await;
    let client = client();

    for remaining in ["2", "1", "0"] {
        let res = client
            .post(format!("http://{}/login", gateway))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["x-ratelimit-limit"], "3");
        assert_eq!(res.headers()["x-ratelimit-remaining"], remaining);
    }

    let res = client
        .post(format!("http://{}/login", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 429);
    let retry_after: u64 = res.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 15 * 60);
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");

    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "error": "Too many requests, please try again later." })
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_limit_applies_before_authentication() {
    let upstream = start_mock_upstream().await;
    let mut config = gateway_config(&upstream.base_url());
    config.rate_limit.max_requests = 1;
    let (gateway, shutdown) = start_gateway(config).await;
    let client = client();

    let res = client
        .get(format!("http://{}/api/users", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    // Unauthenticated hits still count, and the limit wins over the auth gate.
    let res = client
        .get(format!("http://{}/api/users", gateway))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 429);

    assert!(upstream.received().is_empty());
    shutdown.trigger();
}

#[tokio::test]
async fn test_disabled_limit_never_rejects() {
    let upstream = start_mock_upstream().await;
    let mut config = gateway_config(&upstream.base_url());
    config.rate_limit.enabled = false;
    config.rate_limit.max_requests = 1;
    let (gateway, shutdown) = start_gateway(config).await;
    let client = client();

    for _ in 0..5 {
        let res = client
            .post(format!("http://{}/login", gateway))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        assert!(!res.headers().contains_key("x-ratelimit-limit"));
    }

    shutdown.trigger();
}
