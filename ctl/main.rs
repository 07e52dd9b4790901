#![forbid(unsafe_code)]

//! `zoning-lookup-probe`: smoke-test client for a running `zoning-lookup`.
//!
//! Drives the `/mcp` request/response surface: initialize, list tools, run
//! the requested lookups, then terminate the session. With `--stateless`
//! the initialize step is skipped and the server must mint a session on the
//! first call.

use clap::Parser;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const SESSION_HEADER: &str = "mcp-session-id";

#[derive(Debug, Parser)]
#[command(
    name = "zoning-lookup-probe",
    about = "Smoke-test client for the zoning-lookup MCP server",
    version,
    long_about = None
)]
struct Cli {
    /// Server base URL.
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    url: String,

    /// Address to look up.
    #[arg(long)]
    address: Option<String>,

    /// Latitude to look up (requires `--lon`).
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude to look up (requires `--lat`).
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Skip `initialize` and rely on server-side auto-initialization.
    #[arg(long)]
    stateless: bool,
}

type ProbeResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

struct Probe {
    http: Client,
    endpoint: String,
    session_id: Option<String>,
    next_id: u64,
}

impl Probe {
    fn new(base: &str) -> Self {
        Self {
            http: Client::new(),
            endpoint: format!("{}/mcp", base.trim_end_matches('/')),
            session_id: None,
            next_id: 1,
        }
    }

    async fn call(&mut self, method: &str, params: Value) -> ProbeResult<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let mut request = self.http.post(&self.endpoint).json(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }));
        if let Some(session) = &self.session_id {
            request = request.header(SESSION_HEADER, session);
        }

        let response = request.send().await?;
        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            if self.session_id.as_deref() != Some(session) {
                println!("session: {session}");
                self.session_id = Some(session.to_owned());
            }
        }

        let status = response.status();
        let body: Value = response.json().await?;
        if !status.is_success() {
            return Err(format!("{method} failed with {status}: {body}").into());
        }
        if let Some(error) = body.get("error") {
            return Err(format!("{method} returned error: {error}").into());
        }
        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn notify(&self, method: &str) -> ProbeResult<()> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "jsonrpc": "2.0", "method": method }));
        if let Some(session) = &self.session_id {
            request = request.header(SESSION_HEADER, session);
        }
        let status = request.send().await?.status();
        if status != StatusCode::ACCEPTED {
            return Err(format!("{method} notification answered {status}").into());
        }
        Ok(())
    }

    async fn terminate(&self) -> ProbeResult<()> {
        let Some(session) = &self.session_id else {
            return Ok(());
        };
        let status = self
            .http
            .delete(&self.endpoint)
            .header(SESSION_HEADER, session)
            .send()
            .await?
            .status();
        println!("terminate: {status}");
        Ok(())
    }
}

fn print_tool_result(label: &str, result: &Value) {
    let is_error = result
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let text = result
        .pointer("/content/0/text")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let marker = if is_error { "tool error" } else { "ok" };
    println!("{label} ({marker}):\n{text}");
}

async fn run(args: Cli) -> ProbeResult<()> {
    let mut probe = Probe::new(&args.url);

    if !args.stateless {
        let init = probe
            .call(
                "initialize",
                json!({
                    "protocolVersion": "2025-03-26",
                    "capabilities": {},
                    "clientInfo": { "name": "zoning-lookup-probe", "version": env!("CARGO_PKG_VERSION") },
                }),
            )
            .await?;
        println!(
            "initialized: {} {}",
            init.pointer("/serverInfo/name").unwrap_or(&Value::Null),
            init.pointer("/protocolVersion").unwrap_or(&Value::Null),
        );
        probe.notify("notifications/initialized").await?;
    }

    let tools = probe.call("tools/list", json!({})).await?;
    let names: Vec<&str> = tools
        .get("tools")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|tool| tool.get("name").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    println!("tools: {}", names.join(", "));

    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        let result = probe
            .call(
                "tools/call",
                json!({ "name": "lookup_zoning_by_coordinates", "arguments": { "lat": lat, "lon": lon } }),
            )
            .await?;
        print_tool_result("coordinates", &result);
    }

    if let Some(address) = &args.address {
        let result = probe
            .call(
                "tools/call",
                json!({ "name": "lookup_zoning_by_address", "arguments": { "address": address } }),
            )
            .await?;
        print_tool_result("address", &result);
    }

    probe.terminate().await
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    let url = args.url.clone();
    if let Err(err) = run(args).await {
        eprintln!("Probe failed: {err}");
        eprintln!("Is zoning-lookup running at {url}?");
        std::process::exit(1);
    }
}
