//! In-memory R-tree of boundary polygons for one level.

use geo::{BoundingRect, MultiPolygon, Rect};
use regioniq_geofence::{geodesic_area_km2, to_multi_polygon};
use regioniq_geofence_models::{BoundaryUnit, Level};
use rstar::{AABB, RTree, RTreeObject};

/// A boundary unit stored in the R-tree with its parsed polygon.
pub struct BoundaryEntry {
    unit: BoundaryUnit,
    polygon: MultiPolygon<f64>,
    polygon_area_km2: f64,
    envelope: AABB<[f64; 2]>,
}

impl BoundaryEntry {
    fn new(unit: BoundaryUnit) -> Self {
        let polygon = to_multi_polygon(&unit.geometry);
        let envelope = compute_envelope(&polygon);
        let polygon_area_km2 = geodesic_area_km2(&polygon);
        Self {
            unit,
            polygon,
            polygon_area_km2,
            envelope,
        }
    }

    /// The unit's metadata and serde geometry.
    #[must_use]
    pub const fn unit(&self) -> &BoundaryUnit {
        &self.unit
    }

    /// The unit's boundary as a `geo` polygon.
    #[must_use]
    pub const fn polygon(&self) -> &MultiPolygon<f64> {
        &self.polygon
    }

    /// Geodesic area of [`polygon`](Self::polygon) in km².
    ///
    /// May differ slightly from [`BoundaryUnit::area_km2`] when the dataset
    /// supplies its own area figure.
    #[must_use]
    pub const fn polygon_area_km2(&self) -> f64 {
        self.polygon_area_km2
    }
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Immutable, spatially indexed boundary units for one [`Level`].
///
/// Built once per level and shared via `Arc` for the process lifetime.
pub struct BoundarySet {
    level: Level,
    tree: RTree<BoundaryEntry>,
}

impl BoundarySet {
    /// Indexes `units` for `level`.
    #[must_use]
    pub fn new(level: Level, units: Vec<BoundaryUnit>) -> Self {
        let entries: Vec<BoundaryEntry> = units.into_iter().map(BoundaryEntry::new).collect();
        Self {
            level,
            tree: RTree::bulk_load(entries),
        }
    }

    /// Level these units belong to.
    #[must_use]
    pub const fn level(&self) -> Level {
        self.level
    }

    /// Number of indexed units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the set has no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Units whose bounding box intersects `rect`.
    pub fn candidates(&self, rect: &Rect<f64>) -> impl Iterator<Item = &BoundaryEntry> {
        let query = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        self.tree.locate_in_envelope_intersecting(&query)
    }

    /// All units, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &BoundaryEntry> {
        self.tree.iter()
    }

    /// Looks up a unit by code.
    #[must_use]
    pub fn find(&self, code: &str) -> Option<&BoundaryEntry> {
        self.tree.iter().find(|entry| entry.unit.code == code)
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
