//! Process-scoped, per-level boundary cache with single-flight loading.
//!
//! The cache is an explicit dependency: construct one at startup, share it
//! via `Arc`, and drop it at shutdown. Each level gets its own
//! [`OnceCell`], so concurrent callers for a level await the same load
//! instead of fetching the dataset twice. A failed load leaves the cell
//! empty and the next caller retries.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use regioniq_geofence_models::Level;
use tokio::sync::{Mutex, OnceCell};

use crate::{BoundaryError, BoundarySet, BoundarySource};

type LevelCell = Arc<OnceCell<Arc<BoundarySet>>>;

/// Cache of loaded [`BoundarySet`]s keyed by level.
pub struct BoundaryCache {
    source: Arc<dyn BoundarySource>,
    cells: Mutex<BTreeMap<Level, LevelCell>>,
}

impl BoundaryCache {
    /// Creates an empty cache backed by `source`.
    #[must_use]
    pub fn new(source: Arc<dyn BoundarySource>) -> Self {
        Self {
            source,
            cells: Mutex::new(BTreeMap::new()),
        }
    }

    async fn cell(&self, level: Level) -> LevelCell {
        let mut cells = self.cells.lock().await;
        Arc::clone(cells.entry(level).or_default())
    }

    /// Returns the boundary set for `level`, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] if the source fails to load the level.
    pub async fn load(&self, level: Level) -> Result<Arc<BoundarySet>, BoundaryError> {
        let cell = self.cell(level).await;
        let set = cell
            .get_or_try_init(|| async {
                let start = Instant::now();
                let units = self.source.fetch(level).await?;
                let set = BoundarySet::new(level, units);
                log::info!(
                    "Loaded {} {level} boundaries into spatial index in {:?}",
                    set.len(),
                    start.elapsed()
                );
                Ok::<_, BoundaryError>(Arc::new(set))
            })
            .await?;
        Ok(Arc::clone(set))
    }

    /// Warms the cache for `level` in the background.
    ///
    /// Failures are logged and otherwise ignored; a later [`load`] will
    /// retry.
    ///
    /// [`load`]: Self::load
    pub fn preload(self: &Arc<Self>, level: Level) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = cache.load(level).await {
                log::warn!("Failed to preload {level} boundaries: {e}");
            }
        })
    }

    /// Whether `level` has been loaded successfully.
    pub async fn is_loaded(&self, level: Level) -> bool {
        self.cells
            .lock()
            .await
            .get(&level)
            .is_some_and(|cell| cell.initialized())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use regioniq_geofence_models::{BoundaryUnit, PolygonGeometry};

    use super::*;

    fn unit(code: &str) -> BoundaryUnit {
        BoundaryUnit {
            code: code.to_string(),
            name: code.to_string(),
            geometry: PolygonGeometry::Polygon(vec![vec![
                [0.0, 0.0],
                [1.0, 0.0],
                [1.0, 1.0],
                [0.0, 0.0],
            ]]),
            area_km2: 1.0,
        }
    }

    /// Counts fetches, sleeps to widen the race window, and optionally
    /// fails the first `fail_first` calls.
    struct CountingSource {
        calls: AtomicUsize,
        fail_first: usize,
    }

    impl CountingSource {
        fn new(fail_first: usize) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_first,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BoundarySource for CountingSource {
        async fn fetch(&self, level: Level) -> Result<Vec<BoundaryUnit>, BoundaryError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if call < self.fail_first {
                return Err(BoundaryError::Conversion {
                    message: "simulated outage".to_string(),
                });
            }
            Ok(vec![unit(&format!("{level}-1")), unit(&format!("{level}-2"))])
        }
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_fetch() {
        let source = CountingSource::new(0);
        let cache = Arc::new(BoundaryCache::new(source.clone()));

        let loads = (0..8).map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.load(Level::Msoa).await })
        });
        let sets: Vec<Arc<BoundarySet>> = futures::future::join_all(loads)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        assert_eq!(source.calls(), 1);
        assert!(sets.iter().all(|s| Arc::ptr_eq(s, &sets[0])));
        assert_eq!(sets[0].len(), 2);
    }

    #[tokio::test]
    async fn levels_are_cached_independently() {
        let source = CountingSource::new(0);
        let cache = BoundaryCache::new(source.clone());

        cache.load(Level::Lad).await.unwrap();
        cache.load(Level::Lad).await.unwrap();
        cache.load(Level::Msoa).await.unwrap();

        assert_eq!(source.calls(), 2);
        assert!(cache.is_loaded(Level::Lad).await);
        assert!(cache.is_loaded(Level::Msoa).await);
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let source = CountingSource::new(1);
        let cache = BoundaryCache::new(source.clone());

        assert!(cache.load(Level::Lad).await.is_err());
        assert!(!cache.is_loaded(Level::Lad).await);

        let set = cache.load(Level::Lad).await.unwrap();
        assert_eq!(set.level(), Level::Lad);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn preload_warms_cache_and_swallows_errors() {
        let ok = Arc::new(BoundaryCache::new(CountingSource::new(0)));
        ok.preload(Level::Lad).await.unwrap();
        assert!(ok.is_loaded(Level::Lad).await);

        let failing = Arc::new(BoundaryCache::new(CountingSource::new(usize::MAX)));
        failing.preload(Level::Lad).await.unwrap();
        assert!(!failing.is_loaded(Level::Lad).await);
    }
}
