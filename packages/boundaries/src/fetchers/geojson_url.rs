//! Direct `GeoJSON` URL fetcher.
//!
//! Fetches a standard `GeoJSON` `FeatureCollection` from any URL that
//! returns it directly.

use geojson::Feature;

use crate::BoundaryError;

/// Fetches all features from a direct `GeoJSON` URL.
///
/// # Errors
///
/// Returns [`BoundaryError`] if the request fails or the response
/// cannot be parsed.
pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<Feature>, BoundaryError> {
    log::info!("Downloading boundaries from {url}");
    let resp = client.get(url).send().await?;
    if !resp.status().is_success() {
        return Err(BoundaryError::Conversion {
            message: format!("GeoJSON request failed with status {}", resp.status()),
        });
    }
    let body = resp.text().await?;
    super::parse_feature_collection(&body)
}
