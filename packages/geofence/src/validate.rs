//! Ring validation for user-drawn geofences.
//!
//! Checks run per ring in order: position count, coordinate range,
//! closure, distinct vertex count, enclosed area, self-intersection. Once
//! every ring passes, holes must lie inside their exterior without
//! crossing each other and multi-polygon parts must not overlap. The
//! first failure is reported.

use std::collections::BTreeSet;

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Area, Contains, Coord, Line, LineString, Polygon, Relate};
use regioniq_geofence_models::{PolygonGeometry, Position, ValidationError, ValidationOutcome};

use crate::convert::to_multi_polygon;

/// Minimum number of positions in a ring, including the closing position.
const MIN_RING_POSITIONS: usize = 4;

/// Minimum number of distinct vertices in a ring.
const MIN_DISTINCT_VERTICES: usize = 3;

/// Rings whose absolute twice-signed-area (in squared degrees) is at or
/// below this are degenerate. Roughly 1 m² at UK latitudes.
const MIN_TWICE_AREA: f64 = 1e-12;

/// Validates a geofence geometry.
///
/// Failures are returned as data: the outcome carries the first
/// [`ValidationError`] found along with a human-readable reason.
#[must_use]
pub fn validate_geofence_polygon(geometry: &PolygonGeometry) -> ValidationOutcome {
    match check_geometry(geometry) {
        Ok(()) => ValidationOutcome::ok(),
        Err(error) => {
            log::debug!("Rejected geofence geometry: {error}");
            ValidationOutcome::invalid(error)
        }
    }
}

fn check_geometry(geometry: &PolygonGeometry) -> Result<(), ValidationError> {
    let polygons = geometry.polygons();
    if polygons.is_empty() || polygons.iter().any(|rings| rings.is_empty()) {
        return Err(ValidationError::EmptyGeometry);
    }

    for (polygon, rings) in polygons.iter().enumerate() {
        for (ring, positions) in rings.iter().enumerate() {
            check_ring(polygon, ring, positions)?;
        }
    }

    check_ring_layout(geometry)
}

/// Checks how valid rings sit relative to each other.
///
/// Touching at points or along edges is allowed; sharing interior area is
/// not, since the clipped catchment would then drop the shared region.
fn check_ring_layout(geometry: &PolygonGeometry) -> Result<(), ValidationError> {
    let parts = to_multi_polygon(geometry).0;

    for (polygon, part) in parts.iter().enumerate() {
        let exterior = Polygon::new(part.exterior().clone(), vec![]);
        let holes: Vec<Polygon<f64>> = part
            .interiors()
            .iter()
            .map(|ring| Polygon::new(ring.clone(), vec![]))
            .collect();

        for (index, hole) in holes.iter().enumerate() {
            let ring = index + 1;
            if !exterior.contains(hole) {
                return Err(ValidationError::RingsIntersect {
                    polygon,
                    ring,
                    other: 0,
                });
            }
            if let Some(other) = holes
                .iter()
                .enumerate()
                .skip(index + 1)
                .find_map(|(other, next)| share_interior(hole, next).then_some(other + 1))
            {
                return Err(ValidationError::RingsIntersect {
                    polygon,
                    ring,
                    other,
                });
            }
        }
    }

    for (polygon, part) in parts.iter().enumerate() {
        for (other, next) in parts.iter().enumerate().skip(polygon + 1) {
            if share_interior(part, next) {
                return Err(ValidationError::PartsOverlap { polygon, other });
            }
        }
    }

    Ok(())
}

fn share_interior(a: &Polygon<f64>, b: &Polygon<f64>) -> bool {
    let matrix = a.relate(b);
    !(matrix.is_disjoint() || matrix.is_touches())
}

fn check_ring(polygon: usize, ring: usize, positions: &[Position]) -> Result<(), ValidationError> {
    if positions.len() < MIN_RING_POSITIONS {
        return Err(ValidationError::TooFewPositions {
            polygon,
            ring,
            count: positions.len(),
        });
    }

    if let Some(position) = positions.iter().position(|p| !is_valid_position(*p)) {
        return Err(ValidationError::InvalidCoordinate {
            polygon,
            ring,
            position,
        });
    }

    if positions.first() != positions.last() {
        return Err(ValidationError::RingNotClosed { polygon, ring });
    }

    let vertices = &positions[..positions.len() - 1];
    let distinct: BTreeSet<(u64, u64)> = vertices
        .iter()
        .map(|[x, y]| (x.to_bits(), y.to_bits()))
        .collect();
    if distinct.len() < MIN_DISTINCT_VERTICES {
        return Err(ValidationError::TooFewDistinctVertices {
            polygon,
            ring,
            count: distinct.len(),
        });
    }

    let coords: Vec<Coord<f64>> = positions.iter().map(|&[x, y]| Coord { x, y }).collect();
    let twice_area = 2.0 * Polygon::new(LineString::new(coords.clone()), vec![]).signed_area();
    if twice_area.abs() <= MIN_TWICE_AREA {
        return Err(ValidationError::DegenerateArea { polygon, ring });
    }

    if is_self_intersecting(&coords) {
        return Err(ValidationError::SelfIntersection { polygon, ring });
    }

    Ok(())
}

/// Whether `p` is a finite WGS84 longitude/latitude.
#[must_use]
pub fn is_valid_position([lng, lat]: Position) -> bool {
    lng.is_finite()
        && lat.is_finite()
        && (-180.0..=180.0).contains(&lng)
        && (-90.0..=90.0).contains(&lat)
}

/// Tests a closed ring for crossing or overlapping edges.
///
/// Consecutive duplicate vertices are collapsed first so zero-length
/// edges do not register as touches. Adjacent edges always share an
/// endpoint, so they only count when they overlap along a segment.
fn is_self_intersecting(closed: &[Coord<f64>]) -> bool {
    let mut ring: Vec<Coord<f64>> = Vec::with_capacity(closed.len());
    for &coord in closed {
        if ring.last() != Some(&coord) {
            ring.push(coord);
        }
    }

    let edges: Vec<Line<f64>> = ring.windows(2).map(|w| Line::new(w[0], w[1])).collect();
    let count = edges.len();

    for i in 0..count {
        for j in (i + 1)..count {
            let adjacent = j == i + 1 || (i == 0 && j == count - 1);
            match line_intersection(edges[i], edges[j]) {
                None => {}
                Some(LineIntersection::Collinear { .. }) => return true,
                Some(LineIntersection::SinglePoint { .. }) if !adjacent => return true,
                Some(LineIntersection::SinglePoint { .. }) => {}
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polygon(ring: Vec<Position>) -> PolygonGeometry {
        PolygonGeometry::Polygon(vec![ring])
    }

    fn error_of(geometry: &PolygonGeometry) -> ValidationError {
        let outcome = validate_geofence_polygon(geometry);
        assert!(!outcome.valid, "expected {geometry:?} to be rejected");
        outcome.error.unwrap()
    }

    #[test]
    fn accepts_simple_square() {
        let geometry = polygon(vec![
            [-1.0, 53.0],
            [-0.9, 53.0],
            [-0.9, 53.1],
            [-1.0, 53.1],
            [-1.0, 53.0],
        ]);
        let outcome = validate_geofence_polygon(&geometry);
        assert!(outcome.valid, "{:?}", outcome.reason);
    }

    #[test]
    fn accepts_concave_polygon() {
        // A "U" shape: concave but simple.
        let geometry = polygon(vec![
            [0.0, 0.0],
            [3.0, 0.0],
            [3.0, 3.0],
            [2.0, 3.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 3.0],
            [0.0, 3.0],
            [0.0, 0.0],
        ]);
        assert!(validate_geofence_polygon(&geometry).valid);
    }

    #[test]
    fn rejects_empty_geometry() {
        assert_eq!(
            error_of(&PolygonGeometry::MultiPolygon(vec![])),
            ValidationError::EmptyGeometry
        );
        assert_eq!(
            error_of(&PolygonGeometry::Polygon(vec![])),
            ValidationError::EmptyGeometry
        );
    }

    #[test]
    fn rejects_open_ring() {
        let geometry = polygon(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        assert_eq!(
            error_of(&geometry),
            ValidationError::RingNotClosed { polygon: 0, ring: 0 }
        );
    }

    #[test]
    fn rejects_too_few_positions() {
        let geometry = polygon(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]);
        assert_eq!(
            error_of(&geometry),
            ValidationError::TooFewPositions {
                polygon: 0,
                ring: 0,
                count: 3
            }
        );
    }

    #[test]
    fn rejects_fewer_than_three_distinct_vertices() {
        let geometry = polygon(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 0.0], [0.0, 0.0]]);
        assert_eq!(
            error_of(&geometry),
            ValidationError::TooFewDistinctVertices {
                polygon: 0,
                ring: 0,
                count: 2
            }
        );
    }

    #[test]
    fn rejects_collinear_ring() {
        let geometry = polygon(vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [0.0, 0.0]]);
        assert_eq!(
            error_of(&geometry),
            ValidationError::DegenerateArea { polygon: 0, ring: 0 }
        );
    }

    #[test]
    fn rejects_bowtie() {
        let geometry = polygon(vec![[0.0, 0.0], [2.0, 2.0], [2.0, 0.0], [0.0, 1.0], [0.0, 0.0]]);
        assert_eq!(
            error_of(&geometry),
            ValidationError::SelfIntersection { polygon: 0, ring: 0 }
        );
    }

    #[test]
    fn rejects_ring_touching_itself_at_a_vertex() {
        // Figure-eight sharing the vertex (1, 1).
        let geometry = polygon(vec![
            [0.0, 0.0],
            [1.0, 1.0],
            [2.0, 0.0],
            [2.0, 2.0],
            [1.0, 1.0],
            [0.0, 2.0],
            [0.0, 0.0],
        ]);
        assert!(matches!(
            error_of(&geometry),
            ValidationError::SelfIntersection { .. }
        ));
    }

    #[test]
    fn tolerates_repeated_consecutive_vertex() {
        let geometry = polygon(vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
            [0.0, 0.0],
        ]);
        assert!(validate_geofence_polygon(&geometry).valid);
    }

    #[test]
    fn rejects_out_of_range_coordinate() {
        let geometry = polygon(vec![[0.0, 0.0], [181.0, 0.0], [1.0, 1.0], [0.0, 0.0]]);
        assert_eq!(
            error_of(&geometry),
            ValidationError::InvalidCoordinate {
                polygon: 0,
                ring: 0,
                position: 1
            }
        );

        let geometry = polygon(vec![[0.0, 0.0], [f64::NAN, 0.0], [1.0, 1.0], [0.0, 0.0]]);
        assert!(matches!(
            error_of(&geometry),
            ValidationError::InvalidCoordinate { position: 1, .. }
        ));
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Position> {
        vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]
    }

    #[test]
    fn accepts_hole_inside_exterior() {
        let geometry = PolygonGeometry::Polygon(vec![
            square(0.0, 0.0, 4.0, 4.0),
            square(1.0, 1.0, 2.0, 2.0),
            square(2.5, 2.5, 3.0, 3.0),
        ]);
        assert!(validate_geofence_polygon(&geometry).valid);
    }

    #[test]
    fn rejects_hole_crossing_exterior() {
        let geometry =
            PolygonGeometry::Polygon(vec![square(0.0, 0.0, 4.0, 4.0), square(3.0, 1.0, 5.0, 3.0)]);
        assert_eq!(
            error_of(&geometry),
            ValidationError::RingsIntersect {
                polygon: 0,
                ring: 1,
                other: 0
            }
        );

        let outside =
            PolygonGeometry::Polygon(vec![square(0.0, 0.0, 4.0, 4.0), square(6.0, 6.0, 7.0, 7.0)]);
        assert!(matches!(
            error_of(&outside),
            ValidationError::RingsIntersect { other: 0, .. }
        ));
    }

    #[test]
    fn rejects_overlapping_holes() {
        let geometry = PolygonGeometry::Polygon(vec![
            square(0.0, 0.0, 4.0, 4.0),
            square(1.0, 1.0, 2.5, 2.5),
            square(2.0, 2.0, 3.0, 3.0),
        ]);
        assert_eq!(
            error_of(&geometry),
            ValidationError::RingsIntersect {
                polygon: 0,
                ring: 1,
                other: 2
            }
        );
    }

    #[test]
    fn rejects_overlapping_parts() {
        let geometry = PolygonGeometry::MultiPolygon(vec![
            vec![square(0.0, 0.0, 2.0, 2.0)],
            vec![square(5.0, 5.0, 6.0, 6.0)],
            vec![square(1.0, 1.0, 3.0, 3.0)],
        ]);
        assert_eq!(
            error_of(&geometry),
            ValidationError::PartsOverlap {
                polygon: 0,
                other: 2
            }
        );
    }

    #[test]
    fn accepts_parts_sharing_an_edge() {
        let geometry = PolygonGeometry::MultiPolygon(vec![
            vec![square(0.0, 0.0, 1.0, 1.0)],
            vec![square(1.0, 0.0, 2.0, 1.0)],
            vec![square(2.0, 1.0, 3.0, 2.0)],
        ]);
        let outcome = validate_geofence_polygon(&geometry);
        assert!(outcome.valid, "{:?}", outcome.reason);
    }

    #[test]
    fn reports_failing_ring_of_multi_polygon() {
        let geometry = PolygonGeometry::MultiPolygon(vec![
            vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
            vec![vec![[5.0, 5.0], [6.0, 5.0], [6.0, 6.0]]],
        ]);
        assert_eq!(
            error_of(&geometry),
            ValidationError::TooFewPositions {
                polygon: 1,
                ring: 0,
                count: 3
            }
        );
    }
}
