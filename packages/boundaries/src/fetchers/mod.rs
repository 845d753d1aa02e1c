//! Fetcher dispatch for boundary datasets.
//!
//! Each fetcher returns the features of a `GeoJSON` `FeatureCollection`.

pub mod geojson_file;
pub mod geojson_url;

use std::path::Path;

use geojson::{Feature, GeoJson};

use crate::BoundaryError;
use crate::registry::{FetcherConfig, LevelSource};

/// Fetches raw `GeoJSON` features for a level source.
///
/// # Errors
///
/// Returns [`BoundaryError`] if reading, downloading, or parsing fails.
pub async fn fetch_features(
    client: &reqwest::Client,
    source: &LevelSource,
    base_dir: &Path,
) -> Result<Vec<Feature>, BoundaryError> {
    match &source.fetcher {
        FetcherConfig::GeojsonFile { path } => {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                base_dir.join(path)
            };
            geojson_file::fetch(&path).await
        }
        FetcherConfig::GeojsonUrl { url } => geojson_url::fetch(client, url).await,
    }
}

/// Parses a `GeoJSON` document and returns its features.
///
/// # Errors
///
/// Returns [`BoundaryError`] if the text is not `GeoJSON` or is not a
/// `FeatureCollection`.
pub fn parse_feature_collection(text: &str) -> Result<Vec<Feature>, BoundaryError> {
    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Feature(_) | GeoJson::Geometry(_) => Err(BoundaryError::Conversion {
            message: "Expected a GeoJSON FeatureCollection".to_string(),
        }),
    }
}
