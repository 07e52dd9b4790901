//! Shared application state and the rmcp handler used by the stdio transport.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use serde_json::json;
use tracing::{info, info_span, warn, Instrument};

use super::dispatcher::{error_payload, render_text, ProtocolDispatcher};
use super::tools::{ToolContext, ToolRegistry};
use crate::arcgis::FeatureSource;
use crate::config::GlobalConfig;
use crate::session::SessionManager;

/// State shared by every transport.
pub struct AppState {
    /// Global configuration.
    pub config: Arc<GlobalConfig>,
    /// Session table and request routing.
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    /// Wire the registry, dispatcher, and session manager over `source`.
    #[must_use]
    pub fn new(config: Arc<GlobalConfig>, source: Arc<dyn FeatureSource>) -> Self {
        let registry = Arc::new(ToolRegistry::lookup_tools(ToolContext {
            source,
            location: config.location.clone(),
        }));
        let dispatcher = Arc::new(ProtocolDispatcher::new(registry, &config));
        Self {
            sessions: Arc::new(SessionManager::new(dispatcher)),
            config,
        }
    }

    /// Tool registry behind the dispatcher.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.sessions.dispatcher().registry()
    }
}

/// rmcp server over the lookup tool registry.
pub struct ZoningServer {
    state: Arc<AppState>,
}

impl ZoningServer {
    /// Create a server bound to shared application state.
    #[must_use]
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    fn all_tools(&self) -> Vec<Tool> {
        self.state
            .registry()
            .descriptors()
            .map(|descriptor| {
                let schema = descriptor
                    .input_schema
                    .as_object()
                    .cloned()
                    .unwrap_or_default();
                Tool::new(
                    descriptor.name.clone(),
                    descriptor.description.clone(),
                    Arc::new(schema),
                )
            })
            .collect()
    }
}

impl ServerHandler for ZoningServer {
    fn get_info(&self) -> ServerInfo {
        let details = self.state.sessions.dispatcher().identity();
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: details.name.clone(),
                title: Some(format!("{} Zoning Lookup", self.state.config.location.name)),
                version: details.version.clone(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Zoning district lookups for {}. Call lookup_zoning_by_coordinates with \
                 lat/lon or lookup_zoning_by_address with a street address.",
                self.state.config.location.name
            )),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.all_tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let registry = self.state.registry();
        let arguments = request.arguments.unwrap_or_default();
        let span = info_span!("call_tool", tool = %request.name);

        match registry
            .call(&request.name, &arguments)
            .instrument(span)
            .await
        {
            Ok(lookup) => {
                info!(tool = %request.name, found = lookup.is_found(), "tool call completed");
                Ok(CallToolResult::success(vec![Content::text(render_text(
                    &json!(lookup),
                ))]))
            }
            Err(err) => {
                warn!(tool = %request.name, %err, "tool call failed");
                let body = error_payload(registry.location(), &err);
                Ok(CallToolResult::error(vec![Content::text(render_text(&body))]))
            }
        }
    }
}
