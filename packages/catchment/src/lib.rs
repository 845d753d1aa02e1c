#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Catchment calculation: geofence intersection and metric aggregation.
//!
//! [`intersect`] clips a geofence against the boundary units of one level
//! and weights each unit by the share of its area inside the fence.
//! [`aggregate`] resolves the units' metrics and sums them by weight.
//! [`CatchmentEngine`] chains boundary loading, intersection, and
//! aggregation.
//!
//! Apportioning by area assumes each unit's population and economic
//! activity are spread uniformly over its area.

pub mod aggregate;
pub mod engine;
pub mod intersect;

#[cfg(test)]
pub(crate) mod fixtures;

pub use aggregate::aggregate;
pub use engine::CatchmentEngine;
pub use intersect::{MIN_OVERLAP_FRACTION, intersect};

use regioniq_boundaries::BoundaryError;
use regioniq_metrics::MetricError;
use thiserror::Error;

/// Errors that can occur during a catchment calculation.
#[derive(Debug, Error)]
pub enum CatchmentError {
    /// Boundary data for the requested level could not be loaded.
    #[error("Boundary load failed: {0}")]
    Boundary(#[from] BoundaryError),

    /// The metric store could not be queried.
    #[error("Metric lookup failed: {0}")]
    Metric(#[from] MetricError),
}
