//! JSON-RPC 2.0 envelope types for the HTTP transports.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision answered when the client asks for one we do not know.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

/// Protocol revisions echoed back verbatim during `initialize`.
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2024-11-05", "2025-03-26", "2025-06-18"];

/// JSON-RPC request or notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Correlation id; absent on notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a notification for `method`.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id: None,
            method: method.into(),
            params: None,
        }
    }

    /// Attach a correlation id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach parameters.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Notifications carry no id and never receive a response.
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Whether this is an explicit session start.
    #[must_use]
    pub fn is_initialize(&self) -> bool {
        self.method == "initialize"
    }
}

/// JSON-RPC response. `id` is always serialized, as `null` when unknown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Echoed correlation id.
    #[serde(default)]
    pub id: Value,
    /// Success payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful response.
    #[must_use]
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Error response with no `data`.
    #[must_use]
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Error code, if this is an error response.
    #[must_use]
    pub fn error_code(&self) -> Option<i32> {
        self.error.as_ref().map(|err| err.code)
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    /// Numeric error code, see [`error_codes`].
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Standard JSON-RPC error codes plus the server-defined session code.
#[allow(missing_docs)]
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Missing, unknown, or closed session identifier.
    pub const INVALID_SESSION: i32 = -32000;
}

/// Parse one inbound envelope.
///
/// Undecodable JSON is a parse error with a null id. Anything that decodes
/// but is not a single well-formed request is an invalid request, echoing
/// the id when one can be recovered.
///
/// # Errors
///
/// Returns the error response to send back to the caller.
pub fn parse_envelope(body: &[u8]) -> Result<JsonRpcRequest, Box<JsonRpcResponse>> {
    let value: Value = serde_json::from_slice(body).map_err(|err| {
        Box::new(JsonRpcResponse::error(
            None,
            error_codes::PARSE_ERROR,
            format!("Parse error: {err}"),
        ))
    })?;

    let id = value.get("id").cloned().filter(|id| !id.is_null());
    if value.is_array() {
        return Err(Box::new(JsonRpcResponse::error(
            None,
            error_codes::INVALID_REQUEST,
            "Invalid Request: batches are not supported",
        )));
    }

    let request: JsonRpcRequest = serde_json::from_value(value).map_err(|err| {
        Box::new(JsonRpcResponse::error(
            id.clone(),
            error_codes::INVALID_REQUEST,
            format!("Invalid Request: {err}"),
        ))
    })?;

    if request.jsonrpc != "2.0" {
        return Err(Box::new(JsonRpcResponse::error(
            id,
            error_codes::INVALID_REQUEST,
            "Invalid Request: jsonrpc must be \"2.0\"",
        )));
    }

    Ok(request)
}

/// Pick the protocol revision to answer with.
#[must_use]
pub fn negotiate_protocol_version(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|wanted| {
            SUPPORTED_PROTOCOL_VERSIONS
                .iter()
                .copied()
                .find(|known| *known == wanted)
        })
        .unwrap_or(DEFAULT_PROTOCOL_VERSION)
}
