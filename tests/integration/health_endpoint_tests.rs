use chrono::DateTime;
use serde_json::{json, Value};

use super::test_helpers::{rpc, spawn_server, Behaviour, FakeArcGis};

#[tokio::test]
async fn health_reports_identity_and_session_count() {
    let upstream = FakeArcGis::start(Behaviour::Features(Vec::new())).await;
    let server = spawn_server(&upstream).await;

    let body: Value = server
        .http
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["name"], "lebanon-zoning-lookup");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["activeSessions"], 0);
    assert!(DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());

    let response = server
        .http
        .post(server.url("/mcp"))
        .json(&rpc(1, "initialize", json!({ "protocolVersion": "2025-03-26" })))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let body: Value = server
        .http
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["activeSessions"], 1);
}

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let upstream = FakeArcGis::start(Behaviour::Features(Vec::new())).await;
    let server = spawn_server(&upstream).await;

    let response = server
        .http
        .request(reqwest::Method::OPTIONS, server.url("/mcp"))
        .header("origin", "https://agent.example.test")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type, mcp-session-id")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    let methods = headers["access-control-allow-methods"].to_str().unwrap();
    assert!(methods.contains("DELETE"), "{methods}");
    let allowed = headers["access-control-allow-headers"]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed.contains("mcp-session-id"), "{allowed}");
}

#[tokio::test]
async fn session_header_is_exposed_to_browsers() {
    let upstream = FakeArcGis::start(Behaviour::Features(Vec::new())).await;
    let server = spawn_server(&upstream).await;

    let response = server
        .http
        .post(server.url("/mcp"))
        .header("origin", "https://agent.example.test")
        .json(&rpc(1, "ping", json!({})))
        .send()
        .await
        .unwrap();

    let exposed = response.headers()["access-control-expose-headers"]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(exposed.contains("mcp-session-id"), "{exposed}");
}
