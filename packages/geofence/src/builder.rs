//! Circle and freehand geofence construction.

use geo::{Centroid, Destination, Distance, Haversine, Point};
use regioniq_geofence_models::{
    Geofence, GeofenceMode, GeofenceShape, PolygonGeometry, Position, Ring, ValidationError,
};

use crate::GeofenceError;
use crate::convert::to_multi_polygon;
use crate::validate::{is_valid_position, validate_geofence_polygon};

/// Number of distinct vertices on a generated circle ring. Keeps the area
/// of the inscribed polygon within 0.2% of the true circle.
pub const CIRCLE_VERTEX_COUNT: usize = 64;

/// Largest accepted circle radius, in km.
pub const MAX_RADIUS_KM: f64 = 200.0;

/// Builds a closed ring approximating the geodesic circle of `radius_km`
/// around `center`.
///
/// Vertices are placed with the great-circle destination formula at evenly
/// spaced bearings, walking anticlockwise from due north, so the ring is a
/// valid `GeoJSON` exterior.
///
/// # Errors
///
/// Returns [`GeofenceError::Validation`] if the radius is not in
/// `(0, 200]` km or the center is not a valid longitude/latitude.
pub fn create_circle_polygon(
    center: Position,
    radius_km: f64,
) -> Result<PolygonGeometry, GeofenceError> {
    if !radius_km.is_finite() || radius_km <= 0.0 || radius_km > MAX_RADIUS_KM {
        return Err(ValidationError::RadiusOutOfRange { radius_km }.into());
    }
    if !is_valid_position(center) {
        return Err(ValidationError::InvalidCenter.into());
    }

    let origin = Point::new(center[0], center[1]);
    let meters = radius_km * 1000.0;
    #[allow(clippy::cast_precision_loss)]
    let step = 360.0 / CIRCLE_VERTEX_COUNT as f64;

    let mut ring: Ring = (0..CIRCLE_VERTEX_COUNT)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let bearing = (360.0 - step * i as f64).rem_euclid(360.0);
            let vertex = Haversine.destination(origin, bearing, meters);
            [vertex.x(), vertex.y()]
        })
        .collect();
    ring.push(ring[0]);

    Ok(PolygonGeometry::Polygon(vec![ring]))
}

/// Wraps a geometry as a [`Geofence`] after validating it.
///
/// For [`GeofenceMode::Circle`] the center is derived from the geometry's
/// area-weighted planar centroid and the radius from the great-circle
/// distance between that centroid and the first ring vertex.
///
/// # Errors
///
/// Returns [`GeofenceError::Validation`] if the geometry fails
/// [`validate_geofence_polygon`], or [`GeofenceError::Geometry`] if a
/// circle centroid cannot be computed.
pub fn create_geofence(
    geometry: PolygonGeometry,
    mode: GeofenceMode,
) -> Result<Geofence, GeofenceError> {
    validate_geofence_polygon(&geometry).into_result()?;

    let shape = match mode {
        GeofenceMode::Polygon => GeofenceShape::Polygon,
        GeofenceMode::Circle => {
            let (center, radius_km) = derive_circle(&geometry)?;
            GeofenceShape::Circle { center, radius_km }
        }
    };

    Ok(Geofence { shape, geometry })
}

fn derive_circle(geometry: &PolygonGeometry) -> Result<(Position, f64), GeofenceError> {
    let centroid = to_multi_polygon(geometry)
        .centroid()
        .ok_or_else(|| GeofenceError::Geometry {
            message: "circle geometry has no centroid".to_string(),
        })?;
    let first = geometry
        .first_position()
        .ok_or(ValidationError::EmptyGeometry)?;

    let radius_km = Haversine.distance(centroid, Point::new(first[0], first[1])) / 1000.0;

    Ok(([centroid.x(), centroid.y()], radius_km))
}
