//! Synthetic boundary grids near Leeds.

use regioniq_boundaries::BoundarySet;
use regioniq_geofence::{geodesic_area_km2, to_multi_polygon};
use regioniq_geofence_models::{BoundaryUnit, Level, PolygonGeometry, Position};

/// South-west corner of the grid.
pub const ORIGIN: Position = [-1.70, 53.70];

/// Cell edge length in degrees (about 1.3 km east-west, 2.2 km north-south).
pub const CELL_DEG: f64 = 0.02;

/// Corner of grid cell (`col`, `row`).
pub fn corner(col: u32, row: u32) -> Position {
    [
        f64::from(col).mul_add(CELL_DEG, ORIGIN[0]),
        f64::from(row).mul_add(CELL_DEG, ORIGIN[1]),
    ]
}

pub fn rectangle(sw: Position, ne: Position) -> PolygonGeometry {
    PolygonGeometry::Polygon(vec![vec![
        sw,
        [ne[0], sw[1]],
        ne,
        [sw[0], ne[1]],
        sw,
    ]])
}

pub fn unit(code: &str, geometry: PolygonGeometry) -> BoundaryUnit {
    let area_km2 = geodesic_area_km2(&to_multi_polygon(&geometry));
    BoundaryUnit {
        code: code.to_string(),
        name: format!("Unit {code}"),
        geometry,
        area_km2,
    }
}

pub fn cell_code(col: u32, row: u32) -> String {
    format!("E02{row:03}{col:03}")
}

/// An `n` x `n` grid of cells starting at [`ORIGIN`].
pub fn grid_units(n: u32) -> Vec<BoundaryUnit> {
    (0..n)
        .flat_map(|row| (0..n).map(move |col| (col, row)))
        .map(|(col, row)| {
            unit(
                &cell_code(col, row),
                rectangle(corner(col, row), corner(col + 1, row + 1)),
            )
        })
        .collect()
}

pub fn grid(n: u32) -> BoundarySet {
    BoundarySet::new(Level::Msoa, grid_units(n))
}
