//! Lock-guarded store handle for concurrent callers
//!
//! A pass mutates every tier of a store, so ingestion and processing on the
//! same container must not interleave. [`SharedTimeseries`] holds one mutex
//! per container; clones share it.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::Record;

use super::orchestrator::{RollupOrchestrator, RollupReport};
use super::store::{TimeseriesContainer, TimeseriesStore};

/// Cloneable handle to a container behind a single mutation lock
#[derive(Debug, Clone, Default)]
pub struct SharedTimeseries {
    inner: Arc<Mutex<TimeseriesContainer>>,
}

impl SharedTimeseries {
    /// Wrap an existing container
    pub fn new(container: TimeseriesContainer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(container)),
        }
    }

    /// Append one raw record
    pub fn ingest(&self, record: Record) {
        self.inner.lock().store_mut().ingest(record);
    }

    /// Append many raw records under one lock acquisition
    pub fn ingest_batch(&self, records: impl IntoIterator<Item = Record>) {
        self.inner.lock().store_mut().ingest_batch(records);
    }

    /// Run one rollup pass while holding the lock
    pub fn process(&self, orchestrator: &RollupOrchestrator) -> RollupReport {
        let mut container = self.inner.lock();
        orchestrator.run_pass(&mut container)
    }

    /// Run one rollup pass at an explicit time
    pub fn process_at(&self, orchestrator: &RollupOrchestrator, now_ms: i64) -> RollupReport {
        let mut container = self.inner.lock();
        orchestrator.run_pass_at(&mut container, now_ms)
    }

    /// Clone of the current container
    pub fn snapshot(&self) -> TimeseriesContainer {
        self.inner.lock().clone()
    }

    /// Read the store under the lock, creating it if missing
    pub fn with_store<R>(&self, f: impl FnOnce(&TimeseriesStore) -> R) -> R {
        let mut container = self.inner.lock();
        f(container.store_mut())
    }
}

impl From<TimeseriesContainer> for SharedTimeseries {
    fn from(container: TimeseriesContainer) -> Self {
        Self::new(container)
    }
}
