//! Global configuration parsing, environment overrides, and validation.

use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::{AppError, Result};

/// Location-specific strings surfaced in tool descriptions, results, and
/// error recovery hints.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct LocationConfig {
    /// Human-readable municipality name, e.g. `Lebanon, NH`.
    pub name: String,
    /// Label reported as the `source` of coordinate lookups.
    pub zoning_source: String,
    /// Label reported as the `source` of address lookups.
    pub address_source: String,
    /// Example latitude offered to agents after a failed call.
    pub example_lat: f64,
    /// Example longitude offered to agents after a failed call.
    pub example_lon: f64,
    /// Example address offered to agents after a failed call.
    pub example_address: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: "Lebanon, NH".into(),
            zoning_source: "Lebanon Official Zoning Layer".into(),
            address_source: "Lebanon Master Address Table".into(),
            example_lat: 43.6426,
            example_lon: -72.2515,
            example_address: "123 Main Street".into(),
        }
    }
}

/// Server identity reported during `initialize`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct ServerIdentity {
    /// Name advertised in `serverInfo`.
    pub name: String,
}

impl Default for ServerIdentity {
    fn default() -> Self {
        Self {
            name: "lebanon-zoning-lookup".into(),
        }
    }
}

fn default_zoning_layer() -> String {
    "24".into()
}

fn default_address_layer() -> String {
    "6".into()
}

fn default_http_port() -> u16 {
    5000
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_request_timeout_seconds() -> u64 {
    10
}

fn default_keep_alive_seconds() -> u64 {
    15
}

fn default_session_idle_timeout_seconds() -> u64 {
    1800
}

fn default_max_address_results() -> u32 {
    10
}

/// Global configuration, read once at process start.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Base URL of the upstream feature service (required).
    #[serde(default)]
    pub feature_url: String,
    /// Layer identifier of the zoning polygons.
    #[serde(default = "default_zoning_layer")]
    pub zoning_layer: String,
    /// Layer identifier of the master address table.
    #[serde(default = "default_address_layer")]
    pub address_layer: String,
    /// HTTP listening port.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// HTTP bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    /// Upstream request timeout.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// Interval between keep-alive frames on streaming channels.
    #[serde(default = "default_keep_alive_seconds")]
    pub keep_alive_seconds: u64,
    /// Idle time after which a detached request/response session is reaped.
    #[serde(default = "default_session_idle_timeout_seconds")]
    pub session_idle_timeout_seconds: u64,
    /// `resultRecordCount` sent with address queries.
    #[serde(default = "default_max_address_results")]
    pub max_address_results: u32,
    /// Server identity.
    #[serde(default)]
    pub server: ServerIdentity,
    /// Location-specific strings.
    #[serde(default)]
    pub location: LocationConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            feature_url: String::new(),
            zoning_layer: default_zoning_layer(),
            address_layer: default_address_layer(),
            http_port: default_http_port(),
            bind_address: default_bind_address(),
            request_timeout_seconds: default_request_timeout_seconds(),
            keep_alive_seconds: default_keep_alive_seconds(),
            session_idle_timeout_seconds: default_session_idle_timeout_seconds(),
            max_address_results: default_max_address_results(),
            server: ServerIdentity::default(),
            location: LocationConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load configuration from an optional TOML file, then apply process
    /// environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read, contains invalid
    /// TOML, an environment value cannot be parsed, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
                toml::from_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `FEATURE_URL`, `ZONING_LAYER`, `ADDRESS_LAYER`,
    /// `PORT`, and `BIND_ADDRESS`.
    ///
    /// Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `PORT` or `BIND_ADDRESS` cannot be parsed.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = get("FEATURE_URL") {
            self.feature_url = url;
        }
        if let Some(layer) = get("ZONING_LAYER") {
            self.zoning_layer = layer;
        }
        if let Some(layer) = get("ADDRESS_LAYER") {
            self.address_layer = layer;
        }
        if let Some(port) = get("PORT") {
            self.http_port = port
                .trim()
                .parse()
                .map_err(|err| AppError::Config(format!("PORT is not a valid port: {err}")))?;
        }
        if let Some(addr) = get("BIND_ADDRESS") {
            self.bind_address = addr.trim().parse().map_err(|err| {
                AppError::Config(format!("BIND_ADDRESS is not a valid IP address: {err}"))
            })?;
        }
        debug!(
            zoning_layer = %self.zoning_layer,
            address_layer = %self.address_layer,
            "environment overrides applied"
        );
        Ok(())
    }

    /// Upstream request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Keep-alive interval as a [`Duration`].
    #[must_use]
    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_seconds)
    }

    /// Session idle timeout as a [`Duration`].
    #[must_use]
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_seconds)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let raw = self.feature_url.trim();
        if raw.is_empty() {
            return Err(AppError::Config(
                "FEATURE_URL must be set to the feature service base URL".into(),
            ));
        }

        let parsed = url::Url::parse(raw)
            .map_err(|err| AppError::Config(format!("FEATURE_URL is not a valid URL: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "FEATURE_URL must use http or https, got {}",
                parsed.scheme()
            )));
        }

        for (name, layer) in [
            ("zoning_layer", &self.zoning_layer),
            ("address_layer", &self.address_layer),
        ] {
            if layer.trim().is_empty() || layer.contains('/') {
                return Err(AppError::Config(format!(
                    "{name} must be a non-empty layer identifier"
                )));
            }
        }

        if self.request_timeout_seconds == 0 {
            return Err(AppError::Config(
                "request_timeout_seconds must be greater than zero".into(),
            ));
        }

        if self.keep_alive_seconds == 0 {
            return Err(AppError::Config(
                "keep_alive_seconds must be greater than zero".into(),
            ));
        }

        if self.max_address_results == 0 {
            return Err(AppError::Config(
                "max_address_results must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
