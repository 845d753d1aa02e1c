//! Normalizes raw `GeoJSON` features into [`BoundaryUnit`] values.
//!
//! Uses the level's [`FieldMapping`] to extract the unit code, name, and
//! optional precomputed area from each feature, regardless of the
//! dataset-specific property naming.

use std::collections::BTreeSet;

use geo::MultiPolygon;
use geojson::Feature;
use regioniq_geofence::{from_multi_polygon, geodesic_area_km2};
use regioniq_geofence_models::{BoundaryUnit, Level};

use crate::BoundaryError;
use crate::registry::FieldMapping;

/// Normalizes a list of raw `GeoJSON` features into boundary units.
///
/// Skips features with missing codes, names, or polygonal geometry.
///
/// # Errors
///
/// Returns [`BoundaryError::DuplicateCode`] if two features share a code,
/// or [`BoundaryError::Empty`] if no feature is usable.
pub fn normalize_features(
    level: Level,
    features: Vec<Feature>,
    fields: &FieldMapping,
) -> Result<Vec<BoundaryUnit>, BoundaryError> {
    let total = features.len();
    let mut seen = BTreeSet::new();
    let mut units = Vec::with_capacity(total);

    for feature in features {
        let Some(unit) = normalize_feature(feature, fields) else {
            continue;
        };
        if !seen.insert(unit.code.clone()) {
            return Err(BoundaryError::DuplicateCode {
                level,
                code: unit.code,
            });
        }
        units.push(unit);
    }

    if units.is_empty() {
        return Err(BoundaryError::Empty { level });
    }

    let skipped = total - units.len();
    if skipped > 0 {
        log::warn!("Skipped {skipped} of {total} {level} features without code, name, or polygon");
    }

    Ok(units)
}

/// Normalizes a single `GeoJSON` feature.
fn normalize_feature(feature: Feature, fields: &FieldMapping) -> Option<BoundaryUnit> {
    let code = string_property(&feature, &fields.code)?;
    let name = string_property(&feature, &fields.name)?;

    let precomputed_area = fields
        .area
        .as_ref()
        .and_then(|key| feature.property(key))
        .and_then(serde_json::Value::as_f64)
        .map(|value| fields.area_unit.to_km2(value))
        .filter(|area| area.is_finite() && *area > 0.0);

    let Some(polygon) = feature.geometry.and_then(polygonal_geometry) else {
        log::warn!("Boundary {code} has no polygonal geometry");
        return None;
    };

    let area_km2 = precomputed_area.unwrap_or_else(|| geodesic_area_km2(&polygon));

    Some(BoundaryUnit {
        code,
        name,
        geometry: from_multi_polygon(&polygon),
        area_km2,
    })
}

fn string_property(feature: &Feature, key: &str) -> Option<String> {
    feature
        .property(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn polygonal_geometry(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}
