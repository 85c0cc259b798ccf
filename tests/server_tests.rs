//! End-to-end tests against a real listener.
//!
//! The server is started on an ephemeral loopback port with
//! `into_make_service_with_connect_info`, so requests without
//! `X-Forwarded-For` are authorized by their actual peer address.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::net::TcpListener;

use relayer_guard::{AppState, Config, build_router};

const KEY: &str = "relayer-api-key-0001";

/// Test fixture owning a running server.
struct TestServer {
    base_url: String,
    client: Client,
}

impl TestServer {
    async fn start(allowed_ips: &[&str]) -> Self {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            api_key: KEY.to_string(),
            allowed_ips: allowed_ips.iter().map(|s| (*s).to_string()).collect(),
            audit_auth_attempts: true,
            audit_buffer_size: 256,
            metrics_port: 0,
            ..Config::default()
        };
        config.validate().expect("test config should be valid");

        let app = build_router(AppState::new(config));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to ephemeral port");
        let addr = listener.local_addr().expect("Failed to get local address");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server failed");
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{addr}"),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str, key: Option<&str>, forwarded_for: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(key) = key {
            request = request.header("X-API-Key", key);
        }
        if let Some(ip) = forwarded_for {
            request = request.header("X-Forwarded-For", ip);
        }
        request.send().await.expect("Request failed")
    }
}

#[tokio::test]
async fn test_health_needs_no_key() {
    let server = TestServer::start(&[]).await;

    let response = server.get("/health", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
    assert!(body.get("uptime_secs").is_some());
}

#[tokio::test]
async fn test_missing_key_is_rejected() {
    let server = TestServer::start(&["127.0.0.1"]).await;

    let response = server.get("/whoami", None, None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.text().await.unwrap(), "Unauthorized");
}

#[tokio::test]
async fn test_peer_address_is_used_without_forwarded_header() {
    let server = TestServer::start(&["127.0.0.1"]).await;

    let response = server.get("/whoami", Some(KEY), None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["client_ip"], "127.0.0.1");
    assert_eq!(body["api_key"], "rela...0001");
}

#[tokio::test]
async fn test_loopback_not_allowed_is_forbidden() {
    let server = TestServer::start(&["10.0.0.1"]).await;

    let response = server.get("/whoami", Some(KEY), None).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.text().await.unwrap(), "Forbidden");
}

#[tokio::test]
async fn test_forwarded_header_overrides_peer() {
    let server = TestServer::start(&["127.0.0.1"]).await;

    let response = server
        .get("/whoami", Some(KEY), Some("203.0.113.7, 127.0.0.1"))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_audit_buffer_reflects_traffic() {
    let server = TestServer::start(&["127.0.0.1"]).await;

    server.get("/whoami", Some("not-the-right-key"), None).await;
    let response = server.get("/audit/events", Some(KEY), None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");

    let kinds: Vec<&str> = body["events"]
        .as_array()
        .expect("events array")
        .iter()
        .map(|e| e["event"].as_str().expect("event tag"))
        .collect();

    // The events request itself is audited before its handler reads the buffer.
    assert_eq!(
        kinds,
        vec![
            "auth_attempt",
            "invalid_credential",
            "auth_failure",
            "auth_attempt",
            "request_received",
        ]
    );
    assert_eq!(body["count"], 5);

    let raw = body.to_string();
    assert!(!raw.contains("not-the-right-key"));
    assert!(!raw.contains(KEY));
}
