//! In-memory metric table.

use std::collections::BTreeMap;

use async_trait::async_trait;
use regioniq_geofence_models::{MetricId, Scenario};

use crate::{MetricError, MetricStore};

type Key = (String, MetricId, u16, Scenario);

/// A [`MetricStore`] backed by a `BTreeMap`.
///
/// Values inserted for [`Scenario::Baseline`] also answer the other
/// scenarios unless a scenario-specific value is present, mirroring how
/// historical years carry a single value for every scenario.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetricStore {
    values: BTreeMap<Key, f64>,
}

impl InMemoryMetricStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous one.
    pub fn insert(
        &mut self,
        unit_code: impl Into<String>,
        metric: MetricId,
        year: u16,
        scenario: Scenario,
        value: f64,
    ) {
        self.values
            .insert((unit_code.into(), metric, year, scenario), value);
    }

    /// Builder form of [`insert`](Self::insert) for baseline values.
    #[must_use]
    pub fn with(mut self, unit_code: &str, metric: MetricId, year: u16, value: f64) -> Self {
        self.insert(unit_code, metric, year, Scenario::Baseline, value);
        self
    }

    /// Builder form of [`insert`](Self::insert) for a specific scenario.
    #[must_use]
    pub fn with_scenario(
        mut self,
        unit_code: &str,
        metric: MetricId,
        year: u16,
        scenario: Scenario,
        value: f64,
    ) -> Self {
        self.insert(unit_code, metric, year, scenario, value);
        self
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the store holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn lookup(&self, unit_code: &str, metric: MetricId, year: u16, scenario: Scenario) -> Option<f64> {
        let key = |scenario| (unit_code.to_string(), metric, year, scenario);
        self.values
            .get(&key(scenario))
            .or_else(|| self.values.get(&key(Scenario::Baseline)))
            .copied()
            .filter(|v| v.is_finite())
    }
}

#[async_trait]
impl MetricStore for InMemoryMetricStore {
    async fn get_metric(
        &self,
        unit_code: &str,
        metric: MetricId,
        year: u16,
        scenario: Scenario,
    ) -> Result<Option<f64>, MetricError> {
        Ok(self.lookup(unit_code, metric, year, scenario))
    }
}
