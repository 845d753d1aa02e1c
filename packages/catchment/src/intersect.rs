//! Geofence × boundary intersection.
//!
//! Candidates come from the level's R-tree bounding-box query. A unit
//! entirely inside the fence gets weight exactly `1.0` without clipping;
//! every other candidate is clipped with `geo`'s boolean operations, which
//! handle non-convex rings, holes, and multi-part shapes.

use geo::{BooleanOps, BoundingRect, Contains, MultiPolygon};
use regioniq_boundaries::{BoundaryEntry, BoundarySet};
use regioniq_geofence::{geodesic_area_km2, to_multi_polygon};
use regioniq_geofence_models::{Contribution, Geofence};

/// Overlaps below this fraction of the unit's area are treated as edge
/// contact and dropped.
pub const MIN_OVERLAP_FRACTION: f64 = 1e-9;

/// Computes each boundary unit's overlap with `geofence`.
///
/// Returns one [`Contribution`] per unit with a non-negligible overlap,
/// sorted by unit code. Only the geometric fields are populated.
#[must_use]
pub fn intersect(geofence: &Geofence, boundaries: &BoundarySet) -> Vec<Contribution> {
    let fence = to_multi_polygon(&geofence.geometry);
    let Some(bbox) = fence.bounding_rect() else {
        return Vec::new();
    };

    let mut contributions: Vec<Contribution> = boundaries
        .candidates(&bbox)
        .filter_map(|entry| overlap(&fence, entry))
        .collect();
    contributions.sort_by(|a, b| a.code.cmp(&b.code));

    log::debug!(
        "Geofence overlaps {} {} units",
        contributions.len(),
        boundaries.level()
    );
    contributions
}

fn overlap(fence: &MultiPolygon<f64>, entry: &BoundaryEntry) -> Option<Contribution> {
    let unit = entry.unit();
    let unit_area = unit.area_km2;
    if !unit_area.is_finite() || unit_area <= 0.0 {
        log::warn!("Skipping boundary {} with unusable area {unit_area}", unit.code);
        return None;
    }

    if fence.contains(entry.polygon()) {
        return Some(Contribution::weighted(
            unit.code.clone(),
            unit.name.clone(),
            1.0,
            unit_area,
            unit_area,
        ));
    }

    let clipped = fence.intersection(entry.polygon());
    if clipped.0.is_empty() {
        return None;
    }

    // Ratio of geodesic areas measured on the same geometry, so a dataset
    // area figure cannot push the weight past 1.
    let polygon_area = entry.polygon_area_km2();
    if polygon_area <= 0.0 {
        return None;
    }
    let weight = (geodesic_area_km2(&clipped) / polygon_area).clamp(0.0, 1.0);
    if weight < MIN_OVERLAP_FRACTION {
        return None;
    }

    Some(Contribution::weighted(
        unit.code.clone(),
        unit.name.clone(),
        weight,
        (weight * unit_area).min(unit_area),
        unit_area,
    ))
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use regioniq_boundaries::BoundarySet;
    use regioniq_geofence::{create_circle_polygon, create_geofence};
    use regioniq_geofence_models::{GeofenceMode, Level, Position};

    use super::*;
    use crate::fixtures::{cell_code, corner, grid, rectangle, unit};

    fn circle(center: Position, radius_km: f64) -> Geofence {
        let geometry = create_circle_polygon(center, radius_km).unwrap();
        create_geofence(geometry, GeofenceMode::Circle).unwrap()
    }

    fn polygon(sw: Position, ne: Position) -> Geofence {
        create_geofence(rectangle(sw, ne), GeofenceMode::Polygon).unwrap()
    }

    fn assert_bounds(contributions: &[Contribution]) {
        for c in contributions {
            assert!(c.weight > 0.0 && c.weight <= 1.0, "{} weight {}", c.code, c.weight);
            assert!(
                c.intersection_area_km2 <= c.unit_area_km2 + 1e-9,
                "{} intersection {} > unit {}",
                c.code,
                c.intersection_area_km2,
                c.unit_area_km2
            );
        }
    }

    #[test]
    fn enclosed_units_have_weight_exactly_one() {
        let set = grid(8);
        // Fence aligned to grid lines around cells (2..5, 2..5).
        let fence = polygon(corner(2, 2), corner(5, 5));
        let contributions = intersect(&fence, &set);

        assert_eq!(contributions.len(), 9);
        assert!(contributions.iter().all(|c| c.weight.to_bits() == 1.0_f64.to_bits()));
        assert!(
            contributions
                .iter()
                .all(|c| c.intersection_area_km2.to_bits() == c.unit_area_km2.to_bits())
        );
    }

    #[test]
    fn fence_matching_a_unit_selects_only_that_unit() {
        let set = grid(4);
        let fence = polygon(corner(1, 1), corner(2, 2));
        let contributions = intersect(&fence, &set);

        assert_eq!(contributions.len(), 1);
        assert_eq!(contributions[0].code, cell_code(1, 1));
        assert_eq!(contributions[0].weight.to_bits(), 1.0_f64.to_bits());
    }

    #[test]
    fn small_circle_inside_large_unit_weighs_by_area_ratio() {
        let big = unit("E06000001", rectangle([-1.9, 53.6], [-1.3, 54.0]));
        let area = big.area_km2;
        let set = BoundarySet::new(Level::Lad, vec![big]);

        let contributions = intersect(&circle([-1.6, 53.8], 1.0), &set);

        assert_eq!(contributions.len(), 1);
        let expected = PI / area;
        let weight = contributions[0].weight;
        assert!(
            ((weight - expected) / expected).abs() < 0.01,
            "weight {weight}, expected {expected}"
        );
    }

    #[test]
    fn circle_on_shared_corner_splits_across_four_units() {
        let set = grid(4);
        let fence = circle(corner(2, 2), 0.5);
        let contributions = intersect(&fence, &set);

        let codes: Vec<&str> = contributions.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(
            codes,
            vec![
                cell_code(1, 1),
                cell_code(2, 1),
                cell_code(1, 2),
                cell_code(2, 2),
            ]
        );
        assert_bounds(&contributions);

        let clipped_total: f64 = contributions.iter().map(|c| c.intersection_area_km2).sum();
        let fence_area = geodesic_area_km2(&to_multi_polygon(&fence.geometry));
        assert!(((clipped_total - fence_area) / fence_area).abs() < 0.01);

        for c in &contributions {
            let share = c.intersection_area_km2 / fence_area;
            assert!((share - 0.25).abs() < 0.02, "{} share {share}", c.code);
        }
    }

    #[test]
    fn weights_stay_within_bounds_for_irregular_fence() {
        let set = grid(6);
        let [x0, y0] = corner(0, 0);
        let fence = Geofence {
            shape: regioniq_geofence_models::GeofenceShape::Polygon,
            geometry: regioniq_geofence_models::PolygonGeometry::Polygon(vec![vec![
                [x0 + 0.013, y0 + 0.007],
                [x0 + 0.094, y0 + 0.021],
                [x0 + 0.051, y0 + 0.048],
                [x0 + 0.088, y0 + 0.103],
                [x0 + 0.009, y0 + 0.071],
                [x0 + 0.013, y0 + 0.007],
            ]]),
        };
        let contributions = intersect(&fence, &set);

        assert!(!contributions.is_empty());
        assert_bounds(&contributions);
        let mut sorted = contributions.clone();
        sorted.sort_by(|a, b| a.code.cmp(&b.code));
        assert_eq!(sorted, contributions);
    }

    #[test]
    fn disjoint_fence_has_no_contributions() {
        let set = grid(3);
        let fence = circle([0.5, 51.5], 2.0);
        assert!(intersect(&fence, &set).is_empty());
    }
}
