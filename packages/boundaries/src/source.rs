//! Boundary data sources.
//!
//! A [`BoundarySource`] produces the full unit list for a level. The
//! [`BoundaryCache`](crate::BoundaryCache) calls it at most once per level
//! per successful load.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use regioniq_geofence_models::{BoundaryUnit, Level};

use crate::registry::{self, LevelSource};
use crate::{BoundaryError, fetchers, normalize};

/// Default directory for local boundary datasets.
pub const DEFAULT_BOUNDARY_DIR: &str = "data/boundaries";

/// Trait for anything that can supply boundary units for a level.
#[async_trait]
pub trait BoundarySource: Send + Sync {
    /// Fetches and normalizes every unit for `level`.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] if the dataset cannot be loaded.
    async fn fetch(&self, level: Level) -> Result<Vec<BoundaryUnit>, BoundaryError>;
}

/// Loads levels from the embedded dataset registry.
pub struct RegistrySource {
    client: reqwest::Client,
    base_dir: PathBuf,
    sources: BTreeMap<Level, LevelSource>,
}

impl RegistrySource {
    /// Creates a source resolving relative dataset paths against
    /// `base_dir`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_dir: base_dir.into(),
            sources: registry::all_sources()
                .into_iter()
                .map(|s| (s.level, s))
                .collect(),
        }
    }

    /// Creates a source using `REGIONIQ_BOUNDARY_DIR` (default
    /// `data/boundaries`).
    #[must_use]
    pub fn from_env() -> Self {
        let base_dir = std::env::var("REGIONIQ_BOUNDARY_DIR")
            .unwrap_or_else(|_| DEFAULT_BOUNDARY_DIR.to_string());
        Self::new(base_dir)
    }
}

#[async_trait]
impl BoundarySource for RegistrySource {
    async fn fetch(&self, level: Level) -> Result<Vec<BoundaryUnit>, BoundaryError> {
        let source = self
            .sources
            .get(&level)
            .ok_or(BoundaryError::UnknownLevel { level })?;

        log::info!("Loading {level} boundaries: {}", source.name);
        let features = fetchers::fetch_features(&self.client, source, &self.base_dir).await?;
        normalize::normalize_features(level, features, &source.fields)
    }
}

/// Serves fixed, in-memory units. Useful for fixtures and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    levels: BTreeMap<Level, Vec<BoundaryUnit>>,
}

impl StaticSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the units for `level`, replacing any previous set.
    #[must_use]
    pub fn with_level(mut self, level: Level, units: Vec<BoundaryUnit>) -> Self {
        self.levels.insert(level, units);
        self
    }
}

#[async_trait]
impl BoundarySource for StaticSource {
    async fn fetch(&self, level: Level) -> Result<Vec<BoundaryUnit>, BoundaryError> {
        match self.levels.get(&level) {
            Some(units) if units.is_empty() => Err(BoundaryError::Empty { level }),
            Some(units) => Ok(units.clone()),
            None => Err(BoundaryError::UnknownLevel { level }),
        }
    }
}

#[cfg(test)]
mod tests {
    use regioniq_geofence_models::PolygonGeometry;

    use super::*;

    fn unit(code: &str) -> BoundaryUnit {
        BoundaryUnit {
            code: code.to_string(),
            name: code.to_string(),
            geometry: PolygonGeometry::Polygon(vec![vec![
                [0.0, 0.0],
                [1.0, 0.0],
                [1.0, 1.0],
                [0.0, 0.0],
            ]]),
            area_km2: 1.0,
        }
    }

    #[tokio::test]
    async fn static_source_serves_configured_levels() {
        let source = StaticSource::new().with_level(Level::Lad, vec![unit("A"), unit("B")]);
        let units = source.fetch(Level::Lad).await.unwrap();
        assert_eq!(units.len(), 2);
        assert!(matches!(
            source.fetch(Level::Msoa).await,
            Err(BoundaryError::UnknownLevel { level: Level::Msoa })
        ));
    }

    #[tokio::test]
    async fn registry_source_reads_dataset_relative_to_base_dir() {
        let dir = std::env::temp_dir().join(format!("regioniq-boundaries-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let lad = registry::source_for(Level::Lad).unwrap();
        let registry::FetcherConfig::GeojsonFile { path } = &lad.fetcher else {
            panic!("LAD registry entry should be a local file");
        };

        let body = serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "LAD24CD": "E08000035", "LAD24NM": "Leeds" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-1.8, 53.7], [-1.3, 53.7], [-1.3, 53.95], [-1.8, 53.95], [-1.8, 53.7]]]
                }
            }]
        });
        std::fs::write(dir.join(path), body.to_string()).unwrap();

        let units = RegistrySource::new(&dir).fetch(Level::Lad).await.unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "Leeds");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn registry_source_missing_file_is_io_error() {
        let source = RegistrySource::new("/nonexistent/regioniq/boundaries");
        assert!(matches!(
            source.fetch(Level::Msoa).await,
            Err(BoundaryError::Io(_))
        ));
    }
}
