//! Catchment engine: boundary load, intersection, aggregation.

use std::sync::Arc;
use std::time::Instant;

use regioniq_boundaries::BoundaryCache;
use regioniq_geofence_models::{CalculationParams, Geofence, GeofenceResult};
use regioniq_metrics::MetricStore;

use crate::{CatchmentError, aggregate, intersect};

/// Runs catchment calculations against shared boundary and metric
/// sources. Cheap to clone.
#[derive(Clone)]
pub struct CatchmentEngine {
    boundaries: Arc<BoundaryCache>,
    metrics: Arc<dyn MetricStore>,
}

impl CatchmentEngine {
    #[must_use]
    pub fn new(boundaries: Arc<BoundaryCache>, metrics: Arc<dyn MetricStore>) -> Self {
        Self {
            boundaries,
            metrics,
        }
    }

    /// The boundary cache used by this engine.
    #[must_use]
    pub const fn boundaries(&self) -> &Arc<BoundaryCache> {
        &self.boundaries
    }

    /// Computes the area-weighted aggregates of `geofence` at
    /// `params.level` for `params.year` and `params.scenario`.
    ///
    /// A geofence that overlaps no unit yields
    /// [`GeofenceResult::empty`].
    ///
    /// # Errors
    ///
    /// Returns [`CatchmentError::Boundary`] if the level's boundaries cannot
    /// be loaded, or [`CatchmentError::Metric`] if the metric store fails.
    pub async fn calculate(
        &self,
        geofence: &Geofence,
        params: &CalculationParams,
    ) -> Result<GeofenceResult, CatchmentError> {
        let start = Instant::now();
        let boundaries = self.boundaries.load(params.level).await?;
        let loaded = start.elapsed();

        let contributions = intersect(geofence, &boundaries);
        let intersected = start.elapsed();

        let result = aggregate(contributions, params, self.metrics.as_ref()).await?;

        log::debug!(
            "Calculated {} catchment over {} {} units (load {loaded:?}, intersect {:?}, aggregate {:?})",
            geofence.mode(),
            result.regions_used,
            params.level,
            intersected - loaded,
            start.elapsed() - intersected
        );
        Ok(result)
    }
}
