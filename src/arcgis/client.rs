//! HTTP client for the upstream feature-query service.
//!
//! Issues exactly one GET per lookup with a fixed timeout. There are no
//! retries: every failure is mapped to a typed [`AppError`] and returned to
//! the caller immediately.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{info, info_span, warn, Instrument};
use url::Url;

use super::filter::{AddressQuery, Coordinates, WGS84_WKID};
use super::models::{FeatureQueryResponse, RawFeature};
use super::FeatureSource;
use crate::config::GlobalConfig;
use crate::{AppError, Result};

/// Client bound to one feature service and its two layers.
#[derive(Debug, Clone)]
pub struct ArcGisClient {
    http: Client,
    base_url: String,
    zoning_layer: String,
    address_layer: String,
    timeout: Duration,
    max_address_results: u32,
}

impl ArcGisClient {
    /// Build a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be constructed.
    pub fn from_config(config: &GlobalConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("zoning-lookup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            base_url: config.feature_url.trim().trim_end_matches('/').to_owned(),
            zoning_layer: config.zoning_layer.clone(),
            address_layer: config.address_layer.clone(),
            timeout: config.request_timeout(),
            max_address_results: config.max_address_results,
        })
    }

    /// URL of the spatial intersection query for `point`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the configured base URL is malformed.
    pub fn point_query_url(&self, point: Coordinates) -> Result<Url> {
        let wkid = WGS84_WKID.to_string();
        let geometry = point.to_geometry_json();
        self.layer_url(
            &self.zoning_layer,
            &[
                ("f", "json"),
                ("geometry", geometry.as_str()),
                ("geometryType", "esriGeometryPoint"),
                ("inSR", wkid.as_str()),
                ("spatialRel", "esriSpatialRelIntersects"),
                ("outFields", "*"),
                ("returnGeometry", "false"),
            ],
        )
    }

    /// URL of the textual address query for `query`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the configured base URL is malformed.
    pub fn address_query_url(&self, query: &AddressQuery) -> Result<Url> {
        let where_clause = query.where_clause();
        let record_count = self.max_address_results.to_string();
        self.layer_url(
            &self.address_layer,
            &[
                ("f", "json"),
                ("where", where_clause.as_str()),
                ("outFields", "*"),
                ("returnGeometry", "false"),
                ("resultRecordCount", record_count.as_str()),
            ],
        )
    }

    fn layer_url(&self, layer: &str, params: &[(&str, &str)]) -> Result<Url> {
        let raw = format!("{}/{layer}/query", self.base_url);
        Url::parse_with_params(&raw, params)
            .map_err(|err| AppError::Config(format!("invalid feature service url {raw}: {err}")))
    }

    /// Issue one GET and decode the feature list.
    async fn fetch(&self, url: Url) -> Result<Vec<RawFeature>> {
        let started = Instant::now();
        let request = async {
            let response = self.http.get(url).send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, AppError>((status, body))
        };

        let (status, body) = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| {
                warn!(timeout_ms = self.timeout.as_millis(), "feature query timed out");
                AppError::Timeout("feature service took too long to respond".into())
            })??;

        let elapsed_ms = started.elapsed().as_millis();
        if !status.is_success() {
            warn!(status = status.as_u16(), elapsed_ms, "feature query failed");
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: FeatureQueryResponse = serde_json::from_str(&body)
            .map_err(|err| AppError::Upstream(format!("undecodable response: {err}")))?;

        if let Some(error) = parsed.error {
            warn!(elapsed_ms, %error, "feature service returned an error payload");
            return Err(AppError::Upstream(error.to_string()));
        }

        info!(
            features = parsed.features.len(),
            elapsed_ms, "feature query completed"
        );
        Ok(parsed.features)
    }
}

impl FeatureSource for ArcGisClient {
    fn query_by_point(
        &self,
        point: Coordinates,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawFeature>>> + Send + '_>> {
        let span = info_span!("query_by_point", lat = point.lat, lon = point.lon);
        Box::pin(
            async move {
                let url = self.point_query_url(point)?;
                self.fetch(url).await
            }
            .instrument(span),
        )
    }

    fn query_by_address_text<'a>(
        &'a self,
        query: &'a AddressQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawFeature>>> + Send + 'a>> {
        let span = info_span!("query_by_address", address = %query.normalized());
        Box::pin(
            async move {
                let url = self.address_query_url(query)?;
                self.fetch(url).await
            }
            .instrument(span),
        )
    }
}
