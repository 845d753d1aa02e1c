#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Metric store contract and clients for per-unit economic indicators.
//!
//! The catchment engine reads population, income, employment, and output
//! values per boundary unit, year, and scenario through the
//! [`MetricStore`] trait. The store itself is external: this crate ships
//! an in-memory table and an HTTP client for the `RegionIQ` Data API.

pub mod data_api;
pub mod measure;
pub mod memory;

pub use data_api::DataApiMetricStore;
pub use memory::InMemoryMetricStore;

use std::collections::BTreeMap;

use async_trait::async_trait;
use regioniq_geofence_models::{MetricId, Scenario};
use thiserror::Error;

/// Errors that can occur while querying a metric store.
#[derive(Debug, Error)]
pub enum MetricError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The store answered with an error payload.
    #[error("Metric store error {status} ({code}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Machine-readable error code from the store.
        code: String,
        /// Human-readable message from the store.
        message: String,
    },

    /// The client is not configured.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what is missing.
        message: String,
    },
}

/// Trait for time-series metric stores.
///
/// `Ok(None)` means the store has no row for the unit/year/scenario; an
/// `Err` means the store could not be queried at all.
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Returns one metric value for one unit.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError`] if the store cannot be queried.
    async fn get_metric(
        &self,
        unit_code: &str,
        metric: MetricId,
        year: u16,
        scenario: Scenario,
    ) -> Result<Option<f64>, MetricError>;

    /// Returns one metric for many units, keyed by unit code. Units with
    /// no value are absent from the map.
    ///
    /// The default implementation calls [`get_metric`] per unit; stores
    /// with a batch query should override it.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError`] if the store cannot be queried.
    ///
    /// [`get_metric`]: Self::get_metric
    async fn get_metrics(
        &self,
        unit_codes: &[String],
        metric: MetricId,
        year: u16,
        scenario: Scenario,
    ) -> Result<BTreeMap<String, f64>, MetricError> {
        let mut values = BTreeMap::new();
        for code in unit_codes {
            if let Some(value) = self.get_metric(code, metric, year, scenario).await? {
                values.insert(code.clone(), value);
            }
        }
        Ok(values)
    }
}
