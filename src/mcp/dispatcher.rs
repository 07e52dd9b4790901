//! Routes decoded JSON-RPC envelopes to the tool registry.
//!
//! The dispatcher is transport-agnostic and holds no session state. Failures
//! of a tool call are folded into an `isError` tool result carrying recovery
//! examples, so the calling agent can correct itself. Only envelope-level
//! problems become JSON-RPC errors.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, info_span, warn, Instrument};

use super::protocol::{error_codes, negotiate_protocol_version, JsonRpcRequest, JsonRpcResponse};
use super::tools::{Arguments, ToolRegistry};
use crate::config::{GlobalConfig, LocationConfig};
use crate::models::lookup::LookupResult;
use crate::AppError;

/// Name and version advertised in `serverInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDetails {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

/// Stateless protocol method router.
pub struct ProtocolDispatcher {
    registry: Arc<ToolRegistry>,
    identity: ServerDetails,
    instructions: String,
}

impl ProtocolDispatcher {
    /// Build a dispatcher over `registry`.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, config: &GlobalConfig) -> Self {
        let location = registry.location();
        let instructions = format!(
            "Zoning district lookups for {}. Use lookup_zoning_by_coordinates when you have \
             latitude/longitude, lookup_zoning_by_address for a street address.",
            location.name
        );
        Self {
            identity: ServerDetails {
                name: config.server.name.clone(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
            },
            registry,
            instructions,
        }
    }

    /// Advertised identity.
    #[must_use]
    pub fn identity(&self) -> &ServerDetails {
        &self.identity
    }

    /// Tool registry backing `tools/list` and `tools/call`.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Handle one envelope. Notifications yield `None`.
    pub async fn dispatch(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            if !request.method.starts_with("notifications/") {
                warn!(method = %request.method, "request without id treated as notification");
            }
            return None;
        }

        let id = request.id;
        let response = match request.method.as_str() {
            "initialize" => {
                JsonRpcResponse::success(id, self.initialize_result(request.params.as_ref()))
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, self.list_tools_result()),
            "tools/call" => self.call_tool(id, request.params).await,
            other => JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        };
        Some(response)
    }

    /// Result body of `initialize`.
    #[must_use]
    pub fn initialize_result(&self, params: Option<&Value>) -> Value {
        let requested = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str);
        json!({
            "protocolVersion": negotiate_protocol_version(requested),
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": self.identity.name,
                "version": self.identity.version,
            },
            "instructions": self.instructions,
        })
    }

    /// Result body of `tools/list`.
    #[must_use]
    pub fn list_tools_result(&self) -> Value {
        let tools: Vec<Value> = self
            .registry
            .descriptors()
            .map(|descriptor| json!(descriptor))
            .collect();
        json!({ "tools": tools })
    }

    async fn call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let (name, arguments) = match tool_call_params(params) {
            Ok(call) => call,
            Err(err) => {
                warn!(%err, "rejected tools/call envelope");
                let message = match err {
                    AppError::Protocol(msg) => format!("Invalid params: {msg}"),
                    other => format!("Invalid params: {other}"),
                };
                return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, message);
            }
        };

        let span = info_span!("call_tool", tool = %name);
        let outcome = self
            .registry
            .call(&name, &arguments)
            .instrument(span.clone())
            .await;

        let result = span.in_scope(|| match outcome {
            Ok(lookup) => {
                info!(found = lookup.is_found(), "tool call completed");
                tool_success(&lookup)
            }
            Err(err) => {
                warn!(%err, recoverable = err.is_tool_recoverable(), "tool call failed");
                self.tool_error(&err)
            }
        });
        JsonRpcResponse::success(id, result)
    }

    /// `isError` tool result carrying the message and recovery examples.
    #[must_use]
    pub fn tool_error(&self, err: &AppError) -> Value {
        tool_result(&error_payload(self.registry.location(), err), true)
    }
}

/// Split `tools/call` params into the tool name and its argument map.
///
/// # Errors
///
/// Returns `AppError::Protocol` if the name is missing or the arguments are
/// not an object.
fn tool_call_params(params: Option<Value>) -> crate::Result<(String, Arguments)> {
    let mut params = params.unwrap_or(Value::Null);
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| AppError::Protocol("tools/call requires a tool name".into()))?;

    let arguments = match params.get_mut("arguments").map(Value::take) {
        None | Some(Value::Null) => Arguments::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(AppError::Protocol("arguments must be an object".into())),
    };
    Ok((name, arguments))
}

/// `{error, examples}` body reported for a failed tool call.
#[must_use]
pub fn error_payload(location: &LocationConfig, err: &AppError) -> Value {
    json!({
        "error": err.to_string(),
        "examples": {
            "coordinates": { "lat": location.example_lat, "lon": location.example_lon },
            "address": location.example_address,
        },
    })
}

/// Pretty-printed JSON placed in a tool result's text content.
#[must_use]
pub fn render_text(body: &Value) -> String {
    serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string())
}

fn tool_success(lookup: &LookupResult) -> Value {
    tool_result(&json!(lookup), false)
}

fn tool_result(body: &Value, is_error: bool) -> Value {
    let text = render_text(body);
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })
}
