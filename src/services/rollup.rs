//! Rollup Service
//!
//! Runs a rollup pass over a shared container at a fixed interval until
//! shutdown. A pass holds the container lock for its whole duration and is
//! never interrupted; shutdown is observed between passes.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::rollup::{RollupOrchestrator, RollupReport, SharedTimeseries};

use super::framework::{Service, ServiceError, ServiceStatus};

// ============================================================================
// Statistics
// ============================================================================

/// Statistics collected by the rollup service
#[derive(Debug, Default, Clone)]
pub struct RollupServiceStats {
    /// Passes completed
    pub passes: u64,

    /// Buckets written across all passes
    pub buckets_written: u64,

    /// Entries evicted across all passes
    pub entries_evicted: u64,

    /// Total time spent in passes (microseconds)
    pub total_pass_time_us: u64,

    /// Report of the most recent pass
    pub last_report: Option<RollupReport>,
}

// ============================================================================
// Rollup Service
// ============================================================================

/// Background service driving periodic rollup passes
pub struct RollupService {
    /// Container the passes run over
    timeseries: SharedTimeseries,

    /// Pass logic and configuration
    orchestrator: Arc<RollupOrchestrator>,

    /// Delay between passes
    period: Duration,

    /// Current service status
    status: RwLock<ServiceStatus>,

    /// Collected statistics
    stats: RwLock<RollupServiceStats>,
}

impl RollupService {
    /// Create a service using the orchestrator's configured interval
    pub fn new(timeseries: SharedTimeseries, orchestrator: Arc<RollupOrchestrator>) -> Self {
        let period = orchestrator.config().process_interval();
        Self {
            timeseries,
            orchestrator,
            period,
            status: RwLock::new(ServiceStatus::Stopped),
            stats: RwLock::new(RollupServiceStats::default()),
        }
    }

    /// Override the delay between passes
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Handle to the container this service processes
    pub fn timeseries(&self) -> &SharedTimeseries {
        &self.timeseries
    }

    /// Get current statistics
    pub fn stats(&self) -> RollupServiceStats {
        self.stats.read().clone()
    }

    /// Run a single pass immediately
    pub fn run_once(&self) -> RollupReport {
        let start = Instant::now();
        let report = self.timeseries.process(&self.orchestrator);
        let elapsed_us = start.elapsed().as_micros() as u64;

        {
            let mut stats = self.stats.write();
            stats.passes += 1;
            stats.buckets_written += report.buckets_written() as u64;
            stats.entries_evicted += report.evicted() as u64;
            stats.total_pass_time_us += elapsed_us;
            stats.last_report = Some(report);
        }

        if start.elapsed() > self.period {
            tracing::warn!(
                duration_us = elapsed_us,
                period_ms = self.period.as_millis() as u64,
                "Rollup pass took longer than the service period"
            );
        }

        tracing::debug!(
            now_ms = report.now_ms,
            buckets = report.buckets_written(),
            evicted = report.evicted(),
            duration_us = elapsed_us,
            "Rollup pass executed"
        );

        report
    }
}

#[async_trait::async_trait]
impl Service for RollupService {
    async fn start(&self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServiceError> {
        {
            let mut status = self.status.write();
            if status.is_active() {
                return Err(ServiceError::AlreadyRunning);
            }
            *status = ServiceStatus::Starting;
        }

        if let Err(e) = self.orchestrator.config().validate() {
            let message = e.to_string();
            *self.status.write() = ServiceStatus::Failed(message.clone());
            tracing::error!(error = %message, "Rollup service refused to start");
            return Err(ServiceError::InitializationFailed(message));
        }
        if self.period.is_zero() {
            let message = "rollup period must be > 0".to_string();
            *self.status.write() = ServiceStatus::Failed(message.clone());
            return Err(ServiceError::InitializationFailed(message));
        }

        *self.status.write() = ServiceStatus::Running;
        tracing::info!(period_ms = self.period.as_millis() as u64, "Rollup service started");

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Shutdown signal received
                result = shutdown.recv() => {
                    match result {
                        Ok(()) | Err(broadcast::error::RecvError::Closed) => {
                            tracing::debug!("Rollup service received shutdown signal");
                            break;
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::debug!(missed = n, "Rollup service broadcast receiver lagged");
                        }
                    }
                }

                // Periodic pass
                _ = ticker.tick() => {
                    self.run_once();
                }
            }
        }

        *self.status.write() = ServiceStatus::Stopped;
        tracing::info!(passes = self.stats.read().passes, "Rollup service stopped");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "rollup"
    }

    fn status(&self) -> ServiceStatus {
        self.status.read().clone()
    }
}

// ============================================================================
// Tests
// ============================================================================
