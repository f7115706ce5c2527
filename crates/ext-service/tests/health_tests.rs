//! Health endpoint integration tests.
//!
//! Tests the `/health` (liveness), `/ready` (readiness) and `/metrics`
//! endpoints using the `TestExtServer` harness.
//!
//! `/ready` reflects whether the inter-server verification key is cached.

use ext_test_utils::{TestExtServer, TestKeyServer};

/// Test that /health liveness endpoint returns 200 and plain text "OK".
#[tokio::test]
async fn test_health_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let key_server = TestKeyServer::start().await;
    let server = TestExtServer::spawn(&key_server).await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

/// Liveness does not depend on the key endpoint.
#[tokio::test]
async fn test_health_ok_without_key() -> Result<(), anyhow::Error> {
    let key_server = TestKeyServer::start_failing(503).await;
    let server = TestExtServer::spawn(&key_server).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}

/// Test that /ready returns 200 with the key loaded.
#[tokio::test]
async fn test_ready_with_key_loaded() -> Result<(), anyhow::Error> {
    let key_server = TestKeyServer::start().await;
    let server = TestExtServer::spawn(&key_server).await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    assert_eq!(response.status(), 200);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    assert!(
        content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json")),
        "Expected application/json content type, got {:?}",
        content_type
    );

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["inter_server_key"], "loaded");

    Ok(())
}

/// Test that /ready returns 503 while no key is cached.
#[tokio::test]
async fn test_ready_without_key_returns_503() -> Result<(), anyhow::Error> {
    let key_server = TestKeyServer::start_failing(500).await;
    let server = TestExtServer::spawn(&key_server).await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    assert_eq!(response.status(), 503);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["inter_server_key"], "missing");

    Ok(())
}

/// Readiness probing never triggers a key fetch.
#[tokio::test]
async fn test_ready_does_not_fetch_key() -> Result<(), anyhow::Error> {
    let key_server = TestKeyServer::start_failing(500).await;
    let server = TestExtServer::spawn(&key_server).await?;
    let fetches_after_startup = key_server.request_count().await;

    for _ in 0..3 {
        let response = reqwest::get(format!("{}/ready", server.url())).await?;
        assert_eq!(response.status(), 503);
    }

    assert_eq!(key_server.request_count().await, fetches_after_startup);

    Ok(())
}

/// Test that /metrics is served without authentication.
#[tokio::test]
async fn test_metrics_endpoint_is_open() -> Result<(), anyhow::Error> {
    let key_server = TestKeyServer::start().await;
    let server = TestExtServer::spawn(&key_server).await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), 200);
    let body = response.text().await?;
    assert!(
        body.contains("ext_key_fetch_total"),
        "Expected key fetch metrics after startup fetch, got:\n{body}"
    );
    assert!(body.contains("ext_key_loaded"));

    Ok(())
}

/// Test that non-existent routes outside the protected prefix return 404.
#[tokio::test]
async fn test_unknown_route_returns_404() -> Result<(), anyhow::Error> {
    let key_server = TestKeyServer::start().await;
    let server = TestExtServer::spawn(&key_server).await?;

    let response = reqwest::get(format!("{}/v1/nonexistent", server.url())).await?;

    assert_eq!(response.status(), 404);

    Ok(())
}
