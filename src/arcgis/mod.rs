//! Upstream feature-query service access.
//!
//! The [`FeatureSource`] trait decouples the lookup tools from the HTTP
//! client so that tool handlers and the protocol layer can be exercised
//! against an in-process source.

pub mod client;
pub mod filter;
pub mod models;

use std::future::Future;
use std::pin::Pin;

pub use client::ArcGisClient;
pub use filter::{AddressQuery, AddressTokens, Coordinates};
pub use models::{Attributes, FeatureQueryResponse, RawFeature};

use crate::Result;

/// Read-only access to the zoning and address layers.
pub trait FeatureSource: Send + Sync {
    /// Features of the zoning layer intersecting `point`, in upstream order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Timeout`, `AppError::UpstreamStatus`,
    /// `AppError::Upstream`, or `AppError::Http` on failure.
    fn query_by_point(
        &self,
        point: Coordinates,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawFeature>>> + Send + '_>>;

    /// Address-table records matching `query`, in upstream order.
    ///
    /// # Errors
    ///
    /// Same conditions as [`FeatureSource::query_by_point`].
    fn query_by_address_text<'a>(
        &'a self,
        query: &'a AddressQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawFeature>>> + Send + 'a>>;
}
