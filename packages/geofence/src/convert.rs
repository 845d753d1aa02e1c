//! Conversions between [`PolygonGeometry`] and `geo` types.

use geo::{Coord, GeodesicArea, LineString, MultiPolygon, Polygon};
use regioniq_geofence_models::{PolygonGeometry, Position, Ring};

/// Converts a serde geometry into a [`MultiPolygon`].
///
/// The first ring of each polygon becomes its exterior and the rest its
/// interiors. Polygons without rings are skipped.
#[must_use]
pub fn to_multi_polygon(geometry: &PolygonGeometry) -> MultiPolygon<f64> {
    MultiPolygon(
        geometry
            .polygons()
            .into_iter()
            .filter_map(polygon_from_rings)
            .collect(),
    )
}

fn polygon_from_rings(rings: &[Ring]) -> Option<Polygon<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    Some(Polygon::new(
        line_string(exterior),
        interiors.iter().map(|ring| line_string(ring)).collect(),
    ))
}

fn line_string(ring: &[Position]) -> LineString<f64> {
    LineString::new(ring.iter().map(|&[x, y]| Coord { x, y }).collect())
}

/// Converts a [`MultiPolygon`] back into the serde geometry model.
///
/// A single polygon is emitted as `Polygon`, anything else as
/// `MultiPolygon`.
#[must_use]
pub fn from_multi_polygon(mp: &MultiPolygon<f64>) -> PolygonGeometry {
    let mut polygons: Vec<Vec<Ring>> = mp.0.iter().map(polygon_rings).collect();
    if polygons.len() == 1 {
        PolygonGeometry::Polygon(polygons.remove(0))
    } else {
        PolygonGeometry::MultiPolygon(polygons)
    }
}

fn polygon_rings(polygon: &Polygon<f64>) -> Vec<Ring> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ls| ls.coords().map(|c| [c.x, c.y]).collect())
        .collect()
}

/// Area of a lon/lat [`MultiPolygon`] on the WGS84 ellipsoid, in km².
#[must_use]
pub fn geodesic_area_km2(mp: &MultiPolygon<f64>) -> f64 {
    mp.geodesic_area_unsigned() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> PolygonGeometry {
        PolygonGeometry::Polygon(vec![vec![
            [-1.0, 53.0],
            [-0.9, 53.0],
            [-0.9, 53.1],
            [-1.0, 53.1],
            [-1.0, 53.0],
        ]])
    }

    #[test]
    fn converts_polygon_with_hole() {
        let geometry = PolygonGeometry::Polygon(vec![
            vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]],
            vec![[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 1.0]],
        ]);
        let mp = to_multi_polygon(&geometry);
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert_eq!(from_multi_polygon(&mp), geometry);
    }

    #[test]
    fn multi_polygon_stays_multi() {
        let geometry = PolygonGeometry::MultiPolygon(vec![
            vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
            vec![vec![[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]]],
        ]);
        let mp = to_multi_polygon(&geometry);
        assert_eq!(mp.0.len(), 2);
        assert_eq!(from_multi_polygon(&mp), geometry);
    }

    #[test]
    fn geodesic_area_of_tenth_degree_square() {
        // 0.1° x 0.1° at 53°N is roughly 11.1 km x 6.7 km.
        let area = geodesic_area_km2(&to_multi_polygon(&square()));
        assert!(area > 70.0 && area < 77.0, "unexpected area {area}");
    }
}
