use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Notify;
use zoning_lookup::arcgis::{AddressQuery, Coordinates, FeatureSource, RawFeature};
use zoning_lookup::config::GlobalConfig;
use zoning_lookup::mcp::handler::AppState;
use zoning_lookup::Result;

/// Source that matches nothing.
pub struct EmptySource;

impl FeatureSource for EmptySource {
    fn query_by_point(
        &self,
        _point: Coordinates,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawFeature>>> + Send + '_>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn query_by_address_text<'a>(
        &'a self,
        _query: &'a AddressQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawFeature>>> + Send + 'a>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

/// Source whose point lookups wait for `release` before matching nothing.
#[derive(Default)]
pub struct GatedSource {
    pub release: Notify,
}

impl FeatureSource for GatedSource {
    fn query_by_point(
        &self,
        _point: Coordinates,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawFeature>>> + Send + '_>> {
        Box::pin(async {
            self.release.notified().await;
            Ok(Vec::new())
        })
    }

    fn query_by_address_text<'a>(
        &'a self,
        _query: &'a AddressQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawFeature>>> + Send + 'a>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

pub fn config() -> GlobalConfig {
    GlobalConfig::from_toml_str(
        "feature_url = \"https://services.example.test/arcgis/rest/services/Lebanon/FeatureServer\"\n",
    )
    .expect("valid config")
}

pub fn state() -> Arc<AppState> {
    state_with(Arc::new(EmptySource))
}

pub fn state_with(source: Arc<dyn FeatureSource>) -> Arc<AppState> {
    Arc::new(AppState::new(Arc::new(config()), source))
}
