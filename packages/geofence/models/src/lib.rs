#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geofence, boundary unit, and catchment result types.
//!
//! These types describe a user-drawn catchment area, the administrative
//! boundary units it is intersected against, and the area-weighted
//! economic aggregates produced for it. They are plain serde types shared
//! by the engine crates and the HTTP API.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A `[longitude, latitude]` pair in WGS84 degrees.
pub type Position = [f64; 2];

/// A linear ring of positions. Closed rings repeat the first position last.
pub type Ring = Vec<Position>;

/// Polygonal geometry in `GeoJSON` coordinate layout.
///
/// Serializes as `{"type": "Polygon", "coordinates": [...]}` so it can be
/// exchanged with map drawing tools unchanged. Within each polygon the
/// outer ring comes first and any further rings are holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum PolygonGeometry {
    /// A single polygon: outer ring followed by holes.
    Polygon(Vec<Ring>),
    /// Several polygons, e.g. a catchment split by a coastline.
    MultiPolygon(Vec<Vec<Ring>>),
}

impl PolygonGeometry {
    /// Returns every polygon as a slice of rings, regardless of variant.
    #[must_use]
    pub fn polygons(&self) -> Vec<&[Ring]> {
        match self {
            Self::Polygon(rings) => vec![rings.as_slice()],
            Self::MultiPolygon(polygons) => polygons.iter().map(Vec::as_slice).collect(),
        }
    }

    /// Returns the first position of the first outer ring, if any.
    #[must_use]
    pub fn first_position(&self) -> Option<Position> {
        self.polygons()
            .first()
            .and_then(|rings| rings.first())
            .and_then(|ring| ring.first())
            .copied()
    }
}

/// Administrative geography level that boundary units are drawn from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Level {
    /// Local Authority Districts (coarse, ~360 units).
    Lad,
    /// Middle layer Super Output Areas (fine, ~7,000 units).
    Msoa,
}

impl Level {
    /// All supported levels, coarsest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Lad, Self::Msoa]
    }

    /// Whether this is the finer neighbourhood level, which additionally
    /// reports GVA and a population-weighted average income.
    #[must_use]
    pub const fn is_fine(self) -> bool {
        matches!(self, Self::Msoa)
    }
}

/// A named forecast variant selecting which metric values to use for
/// future years.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Scenario {
    /// Central forecast.
    #[default]
    Baseline,
    /// Optimistic variant (upper confidence bound).
    Upside,
    /// Pessimistic variant (lower confidence bound).
    Downside,
}

/// Identifiers of the metrics the catchment engine reads from the metric
/// store.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum MetricId {
    /// Total resident population (people).
    #[serde(rename = "population_total")]
    #[strum(serialize = "population_total")]
    Population,
    /// Total gross disposable household income (£m).
    #[serde(rename = "gdhi_total_mn_gbp")]
    #[strum(serialize = "gdhi_total_mn_gbp")]
    GdhiTotal,
    /// Gross disposable household income per head (£).
    #[serde(rename = "gdhi_per_head_gbp")]
    #[strum(serialize = "gdhi_per_head_gbp")]
    GdhiPerHead,
    /// Total employment (jobs).
    #[serde(rename = "emp_total_jobs")]
    #[strum(serialize = "emp_total_jobs")]
    Employment,
    /// Nominal gross value added (£m).
    #[serde(rename = "nominal_gva_mn_gbp")]
    #[strum(serialize = "nominal_gva_mn_gbp")]
    Gva,
}

impl MetricId {
    /// Unit label reported alongside values of this metric.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Population => "people",
            Self::GdhiTotal | Self::Gva => "£m",
            Self::GdhiPerHead => "£",
            Self::Employment => "jobs",
        }
    }
}

/// How a geofence was drawn.
///
/// Circle parameters are derived from the geometry, never the other way
/// round, so [`Geofence::geometry`] stays the single source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GeofenceShape {
    /// A geodesic circle approximated by a polygon.
    #[serde(rename_all = "camelCase")]
    Circle {
        /// Centroid of the circle polygon.
        center: Position,
        /// Distance from the centroid to the first ring vertex, in km.
        radius_km: f64,
    },
    /// A free-form polygon.
    Polygon,
}

/// A validated user-drawn catchment area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geofence {
    /// Drawing mode and any mode-specific parameters.
    #[serde(flatten)]
    pub shape: GeofenceShape,
    /// The catchment geometry.
    pub geometry: PolygonGeometry,
}

/// Drawing mode discriminator used when constructing a [`Geofence`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GeofenceMode {
    /// Circle drawn from a center and radius.
    Circle,
    /// Freehand polygon.
    Polygon,
}

impl Geofence {
    /// Returns the drawing mode of this geofence.
    #[must_use]
    pub const fn mode(&self) -> GeofenceMode {
        match self.shape {
            GeofenceShape::Circle { .. } => GeofenceMode::Circle,
            GeofenceShape::Polygon => GeofenceMode::Polygon,
        }
    }
}

/// Reason a geofence geometry was rejected.
///
/// `polygon` and `ring` index into [`PolygonGeometry::polygons`] and the
/// rings of that polygon respectively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// The geometry has no polygons or no rings.
    EmptyGeometry,
    /// A ring has fewer than four positions (three vertices plus closure).
    TooFewPositions {
        /// Polygon index.
        polygon: usize,
        /// Ring index within the polygon.
        ring: usize,
        /// Number of positions found.
        count: usize,
    },
    /// A ring's first and last positions differ.
    RingNotClosed {
        /// Polygon index.
        polygon: usize,
        /// Ring index within the polygon.
        ring: usize,
    },
    /// A ring has fewer than three distinct vertices.
    TooFewDistinctVertices {
        /// Polygon index.
        polygon: usize,
        /// Ring index within the polygon.
        ring: usize,
        /// Number of distinct vertices found.
        count: usize,
    },
    /// A coordinate is non-finite or outside WGS84 bounds.
    InvalidCoordinate {
        /// Polygon index.
        polygon: usize,
        /// Ring index within the polygon.
        ring: usize,
        /// Position index within the ring.
        position: usize,
    },
    /// A ring encloses (almost) no area.
    DegenerateArea {
        /// Polygon index.
        polygon: usize,
        /// Ring index within the polygon.
        ring: usize,
    },
    /// Two edges of a ring cross or overlap.
    SelfIntersection {
        /// Polygon index.
        polygon: usize,
        /// Ring index within the polygon.
        ring: usize,
    },
    /// A hole is not enclosed by the exterior ring, or crosses it or
    /// another hole of the same polygon.
    ///
    /// `other` is the index of the second ring; `0` is the exterior.
    RingsIntersect {
        /// Polygon index.
        polygon: usize,
        /// Index of the offending hole.
        ring: usize,
        /// Index of the ring it conflicts with.
        other: usize,
    },
    /// Two polygons of a multi-polygon share interior area.
    PartsOverlap {
        /// Index of the first polygon.
        polygon: usize,
        /// Index of the overlapping polygon.
        other: usize,
    },
    /// A circle radius outside `(0, 200]` km.
    RadiusOutOfRange {
        /// The rejected radius.
        radius_km: f64,
    },
    /// A circle center that is not a valid WGS84 position.
    InvalidCenter,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyGeometry => write!(f, "geometry contains no rings"),
            Self::TooFewPositions {
                polygon,
                ring,
                count,
            } => write!(
                f,
                "ring {ring} of polygon {polygon} has {count} positions; at least 4 are required"
            ),
            Self::RingNotClosed { polygon, ring } => write!(
                f,
                "ring {ring} of polygon {polygon} is not closed (first and last positions differ)"
            ),
            Self::TooFewDistinctVertices {
                polygon,
                ring,
                count,
            } => write!(
                f,
                "ring {ring} of polygon {polygon} has {count} distinct vertices; at least 3 are required"
            ),
            Self::InvalidCoordinate {
                polygon,
                ring,
                position,
            } => write!(
                f,
                "position {position} of ring {ring} in polygon {polygon} is not a valid longitude/latitude"
            ),
            Self::DegenerateArea { polygon, ring } => {
                write!(f, "ring {ring} of polygon {polygon} encloses no area")
            }
            Self::SelfIntersection { polygon, ring } => {
                write!(f, "ring {ring} of polygon {polygon} intersects itself")
            }
            Self::RingsIntersect {
                polygon,
                ring,
                other,
            } => write!(
                f,
                "ring {ring} of polygon {polygon} intersects ring {other}"
            ),
            Self::PartsOverlap { polygon, other } => {
                write!(f, "polygons {polygon} and {other} overlap")
            }
            Self::RadiusOutOfRange { radius_km } => write!(
                f,
                "radius {radius_km} km is out of range; expected greater than 0 and at most 200"
            ),
            Self::InvalidCenter => write!(f, "circle center is not a valid longitude/latitude"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Structured outcome of geofence validation.
///
/// Validation reports failures as data rather than as an `Err` so callers
/// can surface the reason without error-based control flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    /// Whether the geometry is acceptable as a geofence.
    pub valid: bool,
    /// The first problem found, if any.
    pub error: Option<ValidationError>,
    /// Human-readable description of `error`.
    pub reason: Option<String>,
}

impl ValidationOutcome {
    /// A passing outcome.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            valid: true,
            error: None,
            reason: None,
        }
    }

    /// A failing outcome for `error`.
    #[must_use]
    pub fn invalid(error: ValidationError) -> Self {
        Self {
            valid: false,
            reason: Some(error.to_string()),
            error: Some(error),
        }
    }

    /// Converts the outcome into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the contained [`ValidationError`] if the outcome is invalid.
    pub fn into_result(self) -> Result<(), ValidationError> {
        self.error.map_or(Ok(()), Err)
    }
}

/// An administrative boundary polygon with a stable code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryUnit {
    /// Unit code, unique within its level (e.g. `"E06000001"`).
    pub code: String,
    /// Human-readable unit name.
    pub name: String,
    /// Unit boundary.
    pub geometry: PolygonGeometry,
    /// Unit area in square kilometres.
    pub area_km2: f64,
}

/// Year, scenario, and level a catchment calculation is run for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationParams {
    /// Forecast or historical year.
    pub year: u16,
    /// Forecast scenario.
    pub scenario: Scenario,
    /// Boundary level to intersect against.
    pub level: Level,
}

/// One boundary unit's share of a catchment.
///
/// After intersection only the geometric fields are populated. After
/// aggregation the metric fields hold the unit's weighted contribution to
/// the totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    /// Unit code.
    pub code: String,
    /// Unit name.
    pub name: String,
    /// Fraction of the unit's area inside the geofence, in `(0, 1]`.
    pub weight: f64,
    /// Area of the unit inside the geofence, in km².
    pub intersection_area_km2: f64,
    /// Total unit area, in km².
    pub unit_area_km2: f64,
    /// Weighted population.
    pub population: f64,
    /// Weighted total GDHI (£m).
    pub gdhi: f64,
    /// Weighted employment (jobs).
    pub employment: f64,
    /// Weighted GVA (£m), finer level only.
    pub gva: Option<f64>,
    /// Unweighted GDHI per head (£), finer level only.
    pub income_per_head: Option<f64>,
    /// Whether every requested metric had a value in the store.
    pub has_data: bool,
}

impl Contribution {
    /// A contribution carrying only geometric overlap.
    #[must_use]
    pub const fn weighted(
        code: String,
        name: String,
        weight: f64,
        intersection_area_km2: f64,
        unit_area_km2: f64,
    ) -> Self {
        Self {
            code,
            name,
            weight,
            intersection_area_km2,
            unit_area_km2,
            population: 0.0,
            gdhi: 0.0,
            employment: 0.0,
            gva: None,
            income_per_head: None,
            has_data: false,
        }
    }
}

/// A metric the store had no value for, for one contributing unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingMetric {
    /// Unit code.
    pub code: String,
    /// Metric that was missing.
    pub metric: MetricId,
}

/// Area-weighted economic aggregates for one geofence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceResult {
    /// Boundary level used.
    pub level: Level,
    /// Weighted population.
    pub population: f64,
    /// Weighted total GDHI (£m).
    pub gdhi_total: f64,
    /// Weighted employment (jobs).
    pub employment: f64,
    /// Weighted GVA (£m), finer level only.
    pub gva: Option<f64>,
    /// Population-weighted GDHI per head (£), finer level only.
    pub average_income: Option<f64>,
    /// Number of contributing units; always `breakdown.len()`.
    pub regions_used: usize,
    /// Year the metrics were resolved for.
    pub year: u16,
    /// Scenario the metrics were resolved for.
    pub scenario: Scenario,
    /// Per-unit contributions, ordered by unit code.
    pub breakdown: Vec<Contribution>,
    /// Metrics the store could not supply. Non-empty means the totals are
    /// computed from partial data.
    pub missing_data: Vec<MissingMetric>,
}

impl GeofenceResult {
    /// A result with no contributing units and zero totals.
    #[must_use]
    pub fn empty(params: CalculationParams) -> Self {
        let fine = params.level.is_fine();
        Self {
            level: params.level,
            population: 0.0,
            gdhi_total: 0.0,
            employment: 0.0,
            gva: fine.then_some(0.0),
            average_income: fine.then_some(0.0),
            regions_used: 0,
            year: params.year,
            scenario: params.scenario,
            breakdown: Vec::new(),
            missing_data: Vec::new(),
        }
    }

    /// Whether any contributing unit lacked data for the requested
    /// year/scenario.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.missing_data.is_empty()
    }

    /// Codes of the units that lacked at least one metric, deduplicated.
    #[must_use]
    pub fn units_missing_data(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.missing_data.iter().map(|m| m.code.as_str()).collect();
        codes.sort_unstable();
        codes.dedup();
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_geofence_serializes_with_mode_tag() {
        let geofence = Geofence {
            shape: GeofenceShape::Circle {
                center: [-1.5, 53.8],
                radius_km: 5.0,
            },
            geometry: PolygonGeometry::Polygon(vec![vec![
                [0.0, 0.0],
                [1.0, 0.0],
                [1.0, 1.0],
                [0.0, 0.0],
            ]]),
        };

        let json = serde_json::to_value(&geofence).unwrap();
        assert_eq!(json["mode"], "circle");
        assert_eq!(json["radiusKm"], 5.0);
        assert_eq!(json["geometry"]["type"], "Polygon");

        let back: Geofence = serde_json::from_value(json).unwrap();
        assert_eq!(back, geofence);
    }

    #[test]
    fn polygon_geofence_has_no_circle_fields() {
        let json = serde_json::json!({
            "mode": "polygon",
            "geometry": {
                "type": "MultiPolygon",
                "coordinates": [[[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]]
            }
        });
        let geofence: Geofence = serde_json::from_value(json).unwrap();
        assert_eq!(geofence.mode(), GeofenceMode::Polygon);
        assert_eq!(geofence.geometry.polygons().len(), 1);
    }

    #[test]
    fn level_and_scenario_parse_case_insensitively() {
        assert_eq!("lad".parse::<Level>().unwrap(), Level::Lad);
        assert_eq!("MSOA".parse::<Level>().unwrap(), Level::Msoa);
        assert_eq!("Upside".parse::<Scenario>().unwrap(), Scenario::Upside);
        assert_eq!(Level::Msoa.to_string(), "MSOA");
        assert_eq!(Scenario::Downside.to_string(), "downside");
    }

    #[test]
    fn metric_ids_use_catalogue_names() {
        assert_eq!(MetricId::Population.as_ref(), "population_total");
        assert_eq!(MetricId::Gva.as_ref(), "nominal_gva_mn_gbp");
        assert_eq!(
            "emp_total_jobs".parse::<MetricId>().unwrap(),
            MetricId::Employment
        );
        assert_eq!(
            serde_json::to_value(MetricId::GdhiPerHead).unwrap(),
            "gdhi_per_head_gbp"
        );
    }

    #[test]
    fn empty_result_has_fine_level_fields_only_for_msoa() {
        let lad = GeofenceResult::empty(CalculationParams {
            year: 2030,
            scenario: Scenario::Baseline,
            level: Level::Lad,
        });
        assert_eq!(lad.regions_used, 0);
        assert!(lad.gva.is_none());
        assert!(lad.average_income.is_none());

        let msoa = GeofenceResult::empty(CalculationParams {
            year: 2030,
            scenario: Scenario::Baseline,
            level: Level::Msoa,
        });
        assert_eq!(msoa.gva, Some(0.0));
        assert!(!msoa.is_partial());
    }

    #[test]
    fn validation_outcome_carries_reason() {
        let outcome = ValidationOutcome::invalid(ValidationError::RingNotClosed {
            polygon: 0,
            ring: 0,
        });
        assert!(!outcome.valid);
        assert!(outcome.reason.as_deref().unwrap().contains("not closed"));
        assert!(outcome.into_result().is_err());
        assert!(ValidationOutcome::ok().into_result().is_ok());
    }
}
