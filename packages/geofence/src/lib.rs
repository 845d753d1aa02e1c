#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geofence construction, validation, and geodesic helpers.
//!
//! Builds circle and freehand geofences from user input, validates their
//! rings, and converts between the serde [`PolygonGeometry`] model and
//! `geo` types used by the intersection engine.
//!
//! [`PolygonGeometry`]: regioniq_geofence_models::PolygonGeometry

pub mod builder;
pub mod convert;
pub mod validate;

pub use builder::{CIRCLE_VERTEX_COUNT, MAX_RADIUS_KM, create_circle_polygon, create_geofence};
pub use convert::{from_multi_polygon, geodesic_area_km2, to_multi_polygon};
pub use validate::validate_geofence_polygon;

use regioniq_geofence_models::ValidationError;
use thiserror::Error;

/// Errors that can occur while building a geofence.
#[derive(Debug, Error)]
pub enum GeofenceError {
    /// The input geometry or circle parameters were rejected.
    #[error("Invalid geofence: {0}")]
    Validation(#[from] ValidationError),

    /// A derived quantity could not be computed from a valid geometry.
    #[error("Geometry error: {message}")]
    Geometry {
        /// Description of what went wrong.
        message: String,
    },
}
