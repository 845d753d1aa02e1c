#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the `RegionIQ` catchment server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the core result types so presentation concerns (currency scaling,
//! the partial-data flag) stay out of the calculation crates.

use regioniq_geofence_models::{
    CalculationParams, Contribution, Geofence, GeofenceResult, Level, MissingMetric,
    PolygonGeometry, Position, Scenario,
};
use serde::{Deserialize, Serialize};

/// £ per £m; GVA is stored in millions and presented in pounds.
pub const GBP_PER_MILLION: f64 = 1e6;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version string.
    pub version: String,
}

/// Body of `POST /api/geofence/circle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleRequest {
    /// `[longitude, latitude]`.
    pub center: Position,
    pub radius_km: f64,
}

/// Body of `POST /api/geofence/validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub geometry: PolygonGeometry,
}

/// Body of `POST /api/geofence/calculate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    pub geofence: Geofence,
    pub year: u16,
    #[serde(default)]
    pub scenario: Scenario,
    pub level: Level,
}

impl CalculateRequest {
    /// The calculation parameters carried by this request.
    #[must_use]
    pub const fn params(&self) -> CalculationParams {
        CalculationParams {
            year: self.year,
            scenario: self.scenario,
            level: self.level,
        }
    }
}

/// One unit's contribution as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiContribution {
    pub code: String,
    pub name: String,
    pub weight: f64,
    pub intersection_area_km2: f64,
    pub unit_area_km2: f64,
    pub population: f64,
    /// Weighted total GDHI (£m).
    pub gdhi: f64,
    pub employment: f64,
    /// Weighted GVA in pounds.
    pub gva: Option<f64>,
    pub income_per_head: Option<f64>,
    pub has_data: bool,
}

impl From<Contribution> for ApiContribution {
    fn from(c: Contribution) -> Self {
        Self {
            code: c.code,
            name: c.name,
            weight: c.weight,
            intersection_area_km2: c.intersection_area_km2,
            unit_area_km2: c.unit_area_km2,
            population: c.population,
            gdhi: c.gdhi,
            employment: c.employment,
            gva: c.gva.map(|v| v * GBP_PER_MILLION),
            income_per_head: c.income_per_head,
            has_data: c.has_data,
        }
    }
}

/// Catchment aggregates as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGeofenceResult {
    pub level: Level,
    pub population: f64,
    /// Weighted total GDHI (£m).
    pub gdhi_total: f64,
    pub employment: f64,
    /// Weighted GVA in pounds (MSOA only).
    pub gva: Option<f64>,
    /// Population-weighted GDHI per head in pounds (MSOA only).
    pub average_income: Option<f64>,
    pub regions_used: usize,
    pub year: u16,
    pub scenario: Scenario,
    pub breakdown: Vec<ApiContribution>,
    pub missing_data: Vec<MissingMetric>,
    /// Whether any unit lacked data, so totals understate the catchment.
    pub partial_data: bool,
}

impl From<GeofenceResult> for ApiGeofenceResult {
    fn from(result: GeofenceResult) -> Self {
        let partial_data = result.is_partial();
        Self {
            level: result.level,
            population: result.population,
            gdhi_total: result.gdhi_total,
            employment: result.employment,
            gva: result.gva.map(|v| v * GBP_PER_MILLION),
            average_income: result.average_income,
            regions_used: result.regions_used,
            year: result.year,
            scenario: result.scenario,
            breakdown: result.breakdown.into_iter().map(Into::into).collect(),
            missing_data: result.missing_data,
            partial_data,
        }
    }
}

/// Response of `POST /api/boundaries/{level}/preload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPreload {
    pub level: Level,
    /// Whether the level was already in memory when the request arrived.
    pub already_loaded: bool,
}

/// Error envelope: `{"error": {"code", "message", "details"}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Machine-readable code, e.g. `INVALID_GEOFENCE`.
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    #[must_use]
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorBody {
                code: code.to_string(),
                message: message.into(),
                details: None,
            },
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use regioniq_geofence_models::MetricId;

    use super::*;

    fn result() -> GeofenceResult {
        let params = CalculationParams {
            year: 2030,
            scenario: Scenario::Upside,
            level: Level::Msoa,
        };
        let mut contribution =
            Contribution::weighted("E02000001".to_string(), "City".to_string(), 0.5, 1.0, 2.0);
        contribution.gva = Some(12.5);
        GeofenceResult {
            population: 4_000.0,
            gva: Some(12.5),
            regions_used: 1,
            breakdown: vec![contribution],
            missing_data: vec![MissingMetric {
                code: "E02000001".to_string(),
                metric: MetricId::Employment,
            }],
            ..GeofenceResult::empty(params)
        }
    }

    #[test]
    fn gva_is_presented_in_pounds() {
        let api = ApiGeofenceResult::from(result());
        assert_eq!(api.gva, Some(12_500_000.0));
        assert_eq!(api.breakdown[0].gva, Some(12_500_000.0));
        assert!((api.population - 4_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_flag_tracks_missing_data() {
        let api = ApiGeofenceResult::from(result());
        assert!(api.partial_data);

        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["partialData"], true);
        assert_eq!(json["regionsUsed"], 1);
        assert_eq!(json["level"], "MSOA");
        assert_eq!(json["missingData"][0]["metric"], "emp_total_jobs");

        let complete = GeofenceResult {
            missing_data: Vec::new(),
            ..result()
        };
        assert!(!ApiGeofenceResult::from(complete).partial_data);
    }

    #[test]
    fn calculate_request_defaults_scenario() {
        let json = serde_json::json!({
            "geofence": {
                "mode": "polygon",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                }
            },
            "year": 2030,
            "level": "LAD"
        });
        let request: CalculateRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.params().scenario, Scenario::Baseline);
        assert_eq!(request.params().level, Level::Lad);
    }

    #[test]
    fn error_envelope_omits_empty_details() {
        let json = serde_json::to_value(ApiError::new("INVALID_GEOFENCE", "bad ring")).unwrap();
        assert_eq!(json["error"]["code"], "INVALID_GEOFENCE");
        assert!(json["error"].get("details").is_none());
    }
}
