//! Lookup tool registry.
//!
//! The registry is built once at startup and never mutated. Both the HTTP
//! dispatcher and the stdio handler list and invoke tools through it.

pub mod address;
pub mod coordinates;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::arcgis::FeatureSource;
use crate::config::LocationConfig;
use crate::models::lookup::LookupResult;
use crate::{AppError, Result};

/// Tool call arguments as received on the wire.
pub type Arguments = Map<String, Value>;

/// Boxed future returned by every tool handler.
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<LookupResult>> + Send + 'a>>;

/// Tool handler entry point.
pub type ToolHandler = for<'a> fn(&'a ToolContext, &'a Arguments) -> ToolFuture<'a>;

/// Dependencies shared by every tool invocation.
#[derive(Clone)]
pub struct ToolContext {
    /// Upstream feature service.
    pub source: Arc<dyn FeatureSource>,
    /// Location strings for `source` labels.
    pub location: LocationConfig,
}

/// Name, description, and input schema of one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema of the `arguments` object.
    pub input_schema: Value,
}

struct ToolEntry {
    descriptor: ToolDescriptor,
    handler: ToolHandler,
}

/// Immutable name-to-tool table.
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
    index: HashMap<String, usize>,
    context: ToolContext,
}

impl ToolRegistry {
    /// Registry holding the coordinate and address lookups.
    #[must_use]
    pub fn lookup_tools(context: ToolContext) -> Self {
        let location = context.location.clone();
        Self::from_entries(
            context,
            vec![
                (coordinates::descriptor(&location), coordinates::handle as ToolHandler),
                (address::descriptor(&location), address::handle as ToolHandler),
            ],
        )
    }

    fn from_entries(context: ToolContext, tools: Vec<(ToolDescriptor, ToolHandler)>) -> Self {
        let mut entries = Vec::with_capacity(tools.len());
        let mut index = HashMap::with_capacity(tools.len());
        for (descriptor, handler) in tools {
            index.insert(descriptor.name.clone(), entries.len());
            entries.push(ToolEntry {
                descriptor,
                handler,
            });
        }
        Self {
            entries,
            index,
            context,
        }
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.entries.iter().map(|entry| &entry.descriptor)
    }

    /// Descriptor for `name`, if registered.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index
            .get(name)
            .and_then(|idx| self.entries.get(*idx))
            .map(|entry| &entry.descriptor)
    }

    /// Location strings the tools were built with.
    #[must_use]
    pub fn location(&self) -> &LocationConfig {
        &self.context.location
    }

    /// Run the tool called `name`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::UnknownTool` if `name` is not registered, otherwise
    /// whatever the handler returns.
    pub async fn call(&self, name: &str, arguments: &Arguments) -> Result<LookupResult> {
        let entry = self
            .index
            .get(name)
            .and_then(|idx| self.entries.get(*idx))
            .ok_or_else(|| AppError::UnknownTool(name.to_owned()))?;
        (entry.handler)(&self.context, arguments).await
    }
}

/// Numeric argument, or `None` when absent or not a JSON number.
///
/// Literals outside the `f64` range still decode as numbers but have no
/// finite value; they come back as infinity so range validation rejects them.
fn number_arg(arguments: &Arguments, key: &str) -> Option<f64> {
    match arguments.get(key)? {
        Value::Number(number) => Some(number.as_f64().unwrap_or(f64::INFINITY)),
        _ => None,
    }
}
