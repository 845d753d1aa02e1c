//! Local `GeoJSON` file fetcher.

use std::path::Path;

use geojson::Feature;

use crate::BoundaryError;

/// Reads all features from a `GeoJSON` `FeatureCollection` file.
///
/// # Errors
///
/// Returns [`BoundaryError`] if the file cannot be read or parsed.
pub async fn fetch(path: &Path) -> Result<Vec<Feature>, BoundaryError> {
    log::info!("Reading boundaries from {}", path.display());
    let text = tokio::fs::read_to_string(path).await?;
    super::parse_feature_collection(&text)
}
