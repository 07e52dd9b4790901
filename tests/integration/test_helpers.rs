use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use zoning_lookup::arcgis::ArcGisClient;
use zoning_lookup::config::GlobalConfig;
use zoning_lookup::mcp::handler::AppState;
use zoning_lookup::mcp::server::serve_listener;

/// How the fake feature service answers.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// 200 with these attribute maps as features.
    Features(Vec<Value>),
    /// Non-success status with a plain body.
    Status(u16, &'static str),
    /// 200 carrying an `error` object.
    EmbeddedError,
    /// Sleep before answering with no features.
    Slow(Duration),
}

/// One recorded upstream request.
#[derive(Debug, Clone)]
pub struct RecordedQuery {
    pub layer: String,
    pub params: HashMap<String, String>,
}

#[derive(Clone)]
struct FakeState {
    behaviour: Arc<Mutex<Behaviour>>,
    queries: Arc<Mutex<Vec<RecordedQuery>>>,
}

/// In-process stand-in for the feature service.
pub struct FakeArcGis {
    pub base_url: String,
    state: FakeState,
    ct: CancellationToken,
}

impl FakeArcGis {
    pub async fn start(behaviour: Behaviour) -> Self {
        let state = FakeState {
            behaviour: Arc::new(Mutex::new(behaviour)),
            queries: Arc::new(Mutex::new(Vec::new())),
        };
        let app = Router::new()
            .route("/FeatureServer/{layer}/query", get(fake_query))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake");
        let addr: SocketAddr = listener.local_addr().expect("fake addr");
        let ct = CancellationToken::new();
        let shutdown = ct.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .expect("fake server");
        });

        Self {
            base_url: format!("http://{addr}/FeatureServer"),
            state,
            ct,
        }
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        *self.state.behaviour.lock().unwrap() = behaviour;
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.state.queries.lock().unwrap().clone()
    }
}

impl Drop for FakeArcGis {
    fn drop(&mut self) {
        self.ct.cancel();
    }
}

async fn fake_query(
    State(state): State<FakeState>,
    Path(layer): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state
        .queries
        .lock()
        .unwrap()
        .push(RecordedQuery { layer, params });
    let behaviour = state.behaviour.lock().unwrap().clone();

    match behaviour {
        Behaviour::Features(attributes) => {
            let features: Vec<Value> = attributes
                .into_iter()
                .map(|attrs| json!({ "attributes": attrs }))
                .collect();
            Json(json!({ "features": features })).into_response()
        }
        Behaviour::Status(code, body) => (
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body,
        )
            .into_response(),
        Behaviour::EmbeddedError => Json(json!({
            "error": { "code": 400, "message": "Invalid or missing input parameters." }
        }))
        .into_response(),
        Behaviour::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Json(json!({ "features": [] })).into_response()
        }
    }
}

pub fn test_config(feature_url: &str) -> GlobalConfig {
    let config = GlobalConfig {
        feature_url: feature_url.to_owned(),
        request_timeout_seconds: 1,
        keep_alive_seconds: 1,
        ..GlobalConfig::default()
    };
    config.validate().expect("valid test config");
    config
}

/// Zoning server bound to an ephemeral port, torn down on drop.
pub struct TestServer {
    pub base_url: String,
    pub state: Arc<AppState>,
    pub http: reqwest::Client,
    ct: CancellationToken,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.ct.cancel();
    }
}

pub async fn spawn_server(upstream: &FakeArcGis) -> TestServer {
    let config = Arc::new(test_config(&upstream.base_url));
    let client = ArcGisClient::from_config(&config).expect("client");
    let state = Arc::new(AppState::new(Arc::clone(&config), Arc::new(client)));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind server");
    let addr = listener.local_addr().expect("server addr");
    let ct = CancellationToken::new();
    tokio::spawn(serve_listener(listener, Arc::clone(&state), ct.clone()));

    TestServer {
        base_url: format!("http://{addr}"),
        state,
        http: reqwest::Client::new(),
        ct,
    }
}

pub fn rpc(id: i64, method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })
}

pub fn tool_call(id: i64, name: &str, arguments: Value) -> Value {
    rpc(id, "tools/call", json!({ "name": name, "arguments": arguments }))
}

/// JSON body carried in a tool result's first text block.
pub fn tool_payload(result: &Value) -> Value {
    let text = result["content"][0]["text"].as_str().expect("text content");
    serde_json::from_str(text).expect("tool text is JSON")
}

/// Incremental reader over a `text/event-stream` response body.
pub struct SseReader {
    response: reqwest::Response,
    buffer: String,
}

impl SseReader {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            buffer: String::new(),
        }
    }

    /// Next named event as `(event, data)`, skipping keep-alive comments.
    /// Returns `None` when the stream ends or stalls for five seconds.
    pub async fn next_event(&mut self) -> Option<(String, String)> {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let block: String = self.buffer.drain(..end + 2).collect();
                let mut event = None;
                let mut data = Vec::new();
                for line in block.lines() {
                    if let Some(value) = line.strip_prefix("event:") {
                        event = Some(value.trim_start().to_owned());
                    } else if let Some(value) = line.strip_prefix("data:") {
                        data.push(value.strip_prefix(' ').unwrap_or(value).to_owned());
                    }
                }
                if let Some(event) = event {
                    return Some((event, data.join("\n")));
                }
                continue;
            }

            let chunk = tokio::time::timeout(Duration::from_secs(5), self.response.chunk())
                .await
                .ok()?
                .ok()??;
            self.buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }

    /// Raw text received so far, including comments.
    pub async fn read_raw_for(&mut self, window: Duration) -> String {
        let deadline = tokio::time::Instant::now() + window;
        while let Ok(Ok(Some(chunk))) =
            tokio::time::timeout_at(deadline, self.response.chunk()).await
        {
            self.buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
        self.buffer.clone()
    }
}
