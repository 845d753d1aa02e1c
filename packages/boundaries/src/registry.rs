//! Compile-time registry of boundary datasets, one per level.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Switching a level to a newer boundary vintage means editing its TOML
//! file in `sources/`.

use std::path::PathBuf;

use regioniq_geofence_models::Level;
use serde::{Deserialize, Serialize};

/// Embedded TOML source definitions.
const SOURCE_TOMLS: &[(&str, &str)] = &[
    ("lad", include_str!("../sources/lad.toml")),
    ("msoa", include_str!("../sources/msoa.toml")),
];

/// A boundary dataset for one level, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelSource {
    /// Level the dataset provides.
    pub level: Level,
    /// Human-readable dataset name.
    pub name: String,
    /// Where to fetch the dataset from.
    pub fetcher: FetcherConfig,
    /// Feature property names.
    pub fields: FieldMapping,
}

/// How to fetch a boundary `GeoJSON` `FeatureCollection`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetcherConfig {
    /// A local file. Relative paths resolve against the boundary data
    /// directory.
    GeojsonFile {
        /// File path.
        path: PathBuf,
    },
    /// A URL returning a `FeatureCollection`.
    GeojsonUrl {
        /// Full URL.
        url: String,
    },
}

/// Feature property names for a boundary dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Property holding the unit code.
    pub code: String,
    /// Property holding the unit name.
    pub name: String,
    /// Property holding the precomputed unit area. When absent (or the
    /// value is missing) the area is computed from the geometry.
    pub area: Option<String>,
    /// Unit of the `area` property.
    #[serde(default)]
    pub area_unit: AreaUnit,
}

/// Unit of a precomputed area property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaUnit {
    /// Square kilometres.
    #[default]
    Km2,
    /// Square metres.
    M2,
}

impl AreaUnit {
    /// Converts a value in this unit to km².
    #[must_use]
    pub fn to_km2(self, value: f64) -> f64 {
        match self {
            Self::Km2 => value,
            Self::M2 => value / 1_000_000.0,
        }
    }
}

/// Returns all registered level sources.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests below.
#[must_use]
pub fn all_sources() -> Vec<LevelSource> {
    SOURCE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse boundary source '{name}': {e}"))
        })
        .collect()
}

/// Returns the registered source for `level`, if any.
#[must_use]
pub fn source_for(level: Level) -> Option<LevelSource> {
    all_sources().into_iter().find(|s| s.level == level)
}
