//! Area-weighted aggregation of per-unit metrics.

use std::collections::BTreeMap;

use futures::future::try_join_all;
use regioniq_geofence_models::{
    CalculationParams, Contribution, GeofenceResult, MetricId, MissingMetric,
};
use regioniq_metrics::{MetricError, MetricStore};

/// Metrics read for every level. Per-head GDHI backs the total when the
/// store has no total.
const COARSE_METRICS: [MetricId; 4] = [
    MetricId::Population,
    MetricId::GdhiTotal,
    MetricId::GdhiPerHead,
    MetricId::Employment,
];

/// Metrics read for the fine level.
const FINE_METRICS: [MetricId; 5] = [
    MetricId::Population,
    MetricId::GdhiTotal,
    MetricId::GdhiPerHead,
    MetricId::Employment,
    MetricId::Gva,
];

type MetricTable = BTreeMap<MetricId, BTreeMap<String, f64>>;

/// A unit's resolved metric values.
#[derive(Debug, Clone, Copy, Default)]
struct UnitValues {
    population: Option<f64>,
    gdhi: Option<f64>,
    employment: Option<f64>,
    gva: Option<f64>,
    income: Option<f64>,
}

impl UnitValues {
    fn resolve(table: &MetricTable, code: &str) -> Self {
        let get = |metric| table.get(&metric).and_then(|values| values.get(code)).copied();
        let population = get(MetricId::Population);
        let income = get(MetricId::GdhiPerHead);
        let gdhi = get(MetricId::GdhiTotal).or_else(|| {
            income
                .zip(population)
                .map(|(per_head, people)| per_head * people / 1e6)
        });
        Self {
            population,
            gdhi,
            employment: get(MetricId::Employment),
            gva: get(MetricId::Gva),
            income,
        }
    }

    fn missing(&self, fine: bool) -> Vec<MetricId> {
        let mut checks = vec![
            (MetricId::Population, self.population),
            (MetricId::GdhiTotal, self.gdhi),
            (MetricId::Employment, self.employment),
        ];
        if fine {
            checks.push((MetricId::Gva, self.gva));
            checks.push((MetricId::GdhiPerHead, self.income));
        }
        checks
            .into_iter()
            .filter_map(|(metric, value)| value.is_none().then_some(metric))
            .collect()
    }
}

/// Resolves metrics for `contributions` and sums them by weight.
///
/// A metric the store has no value for contributes 0; the unit still
/// counts towards `regions_used` and the gap is listed in
/// [`GeofenceResult::missing_data`]. Sums run in unit-code order so equal
/// inputs give bit-identical totals.
///
/// # Errors
///
/// Returns [`MetricError`] if the store cannot be queried.
pub async fn aggregate(
    mut contributions: Vec<Contribution>,
    params: &CalculationParams,
    store: &dyn MetricStore,
) -> Result<GeofenceResult, MetricError> {
    if contributions.is_empty() {
        return Ok(GeofenceResult::empty(*params));
    }
    contributions.sort_by(|a, b| a.code.cmp(&b.code));

    let fine = params.level.is_fine();
    let metrics: &[MetricId] = if fine { &FINE_METRICS } else { &COARSE_METRICS };
    let codes: Vec<String> = contributions.iter().map(|c| c.code.clone()).collect();

    let fetched = try_join_all(
        metrics
            .iter()
            .map(|&metric| store.get_metrics(&codes, metric, params.year, params.scenario)),
    )
    .await?;
    let table: MetricTable = metrics.iter().copied().zip(fetched).collect();

    let mut population = 0.0;
    let mut gdhi_total = 0.0;
    let mut employment = 0.0;
    let mut gva = 0.0;
    let mut income_weighted = 0.0;
    let mut income_population = 0.0;
    let mut missing_data = Vec::new();

    for contribution in &mut contributions {
        let values = UnitValues::resolve(&table, &contribution.code);
        let missing = values.missing(fine);
        let w = contribution.weight;

        contribution.population = w * values.population.unwrap_or(0.0);
        contribution.gdhi = w * values.gdhi.unwrap_or(0.0);
        contribution.employment = w * values.employment.unwrap_or(0.0);
        contribution.gva = fine.then(|| w * values.gva.unwrap_or(0.0));
        contribution.income_per_head = if fine { values.income } else { None };
        contribution.has_data = missing.is_empty();

        population += contribution.population;
        gdhi_total += contribution.gdhi;
        employment += contribution.employment;
        gva += contribution.gva.unwrap_or(0.0);
        if let Some(income) = contribution.income_per_head {
            income_weighted += contribution.population * income;
            income_population += contribution.population;
        }

        missing_data.extend(missing.into_iter().map(|metric| MissingMetric {
            code: contribution.code.clone(),
            metric,
        }));
    }

    let average_income = fine.then(|| {
        if income_population > 0.0 {
            income_weighted / income_population
        } else {
            0.0
        }
    });

    let result = GeofenceResult {
        level: params.level,
        population,
        gdhi_total,
        employment,
        gva: fine.then_some(gva),
        average_income,
        regions_used: contributions.len(),
        year: params.year,
        scenario: params.scenario,
        breakdown: contributions,
        missing_data,
    };

    if result.is_partial() {
        log::warn!(
            "{} of {} {} units lack data for {} ({}); totals are partial",
            result.units_missing_data().len(),
            result.regions_used,
            params.level,
            params.year,
            params.scenario
        );
    }

    Ok(result)
}
