use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use zoning_lookup::arcgis::{AddressQuery, Coordinates, FeatureSource, RawFeature};
use zoning_lookup::config::{GlobalConfig, LocationConfig};
use zoning_lookup::mcp::dispatcher::ProtocolDispatcher;
use zoning_lookup::mcp::tools::{Arguments, ToolContext, ToolRegistry};
use zoning_lookup::{AppError, Result};

/// In-process feature source recording every upstream call.
#[derive(Default)]
pub struct MockSource {
    pub point_features: Vec<Value>,
    pub address_features: Vec<Value>,
    pub fail_with: Option<fn() -> AppError>,
    pub point_calls: AtomicUsize,
    pub address_calls: AtomicUsize,
    pub last_where: Mutex<Option<String>>,
}

impl MockSource {
    pub fn with_point(features: Vec<Value>) -> Self {
        Self {
            point_features: features,
            ..Self::default()
        }
    }

    pub fn with_addresses(features: Vec<Value>) -> Self {
        Self {
            address_features: features,
            ..Self::default()
        }
    }

    pub fn failing(error: fn() -> AppError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.point_calls.load(Ordering::SeqCst) + self.address_calls.load(Ordering::SeqCst)
    }

    fn answer(&self, features: &[Value]) -> Result<Vec<RawFeature>> {
        if let Some(error) = self.fail_with {
            return Err(error());
        }
        Ok(features.iter().map(to_feature).collect())
    }
}

fn to_feature(value: &Value) -> RawFeature {
    RawFeature::with_attributes(value.as_object().cloned().unwrap_or_default())
}

impl FeatureSource for MockSource {
    fn query_by_point(
        &self,
        _point: Coordinates,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawFeature>>> + Send + '_>> {
        self.point_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { self.answer(&self.point_features) })
    }

    fn query_by_address_text<'a>(
        &'a self,
        query: &'a AddressQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawFeature>>> + Send + 'a>> {
        self.address_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_where.lock().unwrap() = Some(query.where_clause());
        Box::pin(async move { self.answer(&self.address_features) })
    }
}

pub fn config() -> GlobalConfig {
    GlobalConfig::from_toml_str(
        "feature_url = \"https://services.example.test/arcgis/rest/services/Lebanon/FeatureServer\"\n",
    )
    .expect("valid config")
}

pub fn registry(source: Arc<MockSource>) -> ToolRegistry {
    ToolRegistry::lookup_tools(ToolContext {
        source,
        location: LocationConfig::default(),
    })
}

pub fn dispatcher(source: Arc<MockSource>) -> ProtocolDispatcher {
    ProtocolDispatcher::new(Arc::new(registry(source)), &config())
}

pub fn args(value: Value) -> Arguments {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Parse the JSON body carried in a tool result's first text block.
pub fn tool_payload(result: &Value) -> Value {
    let text = result["content"][0]["text"]
        .as_str()
        .expect("text content");
    serde_json::from_str(text).expect("tool text is JSON")
}
