#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Administrative boundary loading, R-tree indexing, and per-level caching.
//!
//! Boundary polygons for each [`Level`] are fetched from the `GeoJSON`
//! datasets listed in the embedded level registry, normalized into
//! [`BoundaryUnit`]s, and indexed in an R-tree for bounding-box
//! prefiltering. A [`BoundaryCache`] owns the loaded sets for the process
//! lifetime and guarantees a single in-flight load per level.
//!
//! [`BoundaryUnit`]: regioniq_geofence_models::BoundaryUnit

pub mod cache;
pub mod fetchers;
pub mod index;
pub mod normalize;
pub mod registry;
pub mod source;

pub use cache::BoundaryCache;
pub use index::{BoundaryEntry, BoundarySet};
pub use source::{BoundarySource, RegistrySource, StaticSource};

use regioniq_geofence_models::Level;
use thiserror::Error;

/// Errors that can occur while loading boundary data.
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// Reading a local dataset failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// Two features in one level share a unit code.
    #[error("Duplicate {level} boundary code: {code}")]
    DuplicateCode {
        /// Level being loaded.
        level: Level,
        /// The repeated code.
        code: String,
    },

    /// No source is configured for the level.
    #[error("No boundary source configured for level {level}")]
    UnknownLevel {
        /// The requested level.
        level: Level,
    },

    /// The dataset produced no usable units.
    #[error("Boundary dataset for level {level} contains no usable units")]
    Empty {
        /// The requested level.
        level: Level,
    },
}
