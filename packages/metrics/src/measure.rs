//! Scenario to measure policy.
//!
//! Forecast rows carry a central value plus a confidence interval. The
//! upside scenario reads the upper bound and the downside scenario the
//! lower bound; historical rows only ever have a central value.

use regioniq_geofence_models::Scenario;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Which column of an observation row holds the value for a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Measure {
    /// Central estimate.
    Value,
    /// Lower confidence bound.
    CiLower,
    /// Upper confidence bound.
    CiUpper,
}

/// Returns the measure read for `scenario`.
#[must_use]
pub const fn measure_for_scenario(scenario: Scenario) -> Measure {
    match scenario {
        Scenario::Baseline => Measure::Value,
        Scenario::Upside => Measure::CiUpper,
        Scenario::Downside => Measure::CiLower,
    }
}

/// The columns of one observation row relevant to value selection.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObservationValues {
    /// Central value.
    pub value: Option<f64>,
    /// Lower confidence bound.
    pub ci_lower: Option<f64>,
    /// Upper confidence bound.
    pub ci_upper: Option<f64>,
    /// Whether the row is an observed (historical) value.
    pub historical: bool,
}

/// Picks the value of `measure` from a row.
///
/// Historical rows always use the central value, and a missing bound
/// falls back to the central value.
#[must_use]
pub fn pick_value(row: ObservationValues, measure: Measure) -> Option<f64> {
    if row.historical {
        return row.value;
    }
    let chosen = match measure {
        Measure::Value => row.value,
        Measure::CiLower => row.ci_lower,
        Measure::CiUpper => row.ci_upper,
    };
    chosen.or(row.value)
}
