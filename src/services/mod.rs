//! Background Services Module
//!
//! Drives rollup passes on a schedule so callers only need to ingest.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  ingest   ┌──────────────────┐  tick   ┌────────────────┐
//! │     Callers     │──────────▶│ SharedTimeseries │◀────────│ RollupService  │
//! └─────────────────┘           └──────────────────┘         └────────────────┘
//!                                                                    ▲
//!                                                       broadcast shutdown
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kuba_rollup::rollup::{RollupOrchestrator, SharedTimeseries};
//! use kuba_rollup::services::{RollupService, Service};
//!
//! # async fn run() {
//! let timeseries = SharedTimeseries::default();
//! let service = Arc::new(RollupService::new(
//!     timeseries.clone(),
//!     Arc::new(RollupOrchestrator::default()),
//! ));
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
//! let task = tokio::spawn({
//!     let service = service.clone();
//!     async move { service.start(shutdown_rx).await }
//! });
//!
//! // ... ingest records through `timeseries` ...
//!
//! let _ = shutdown_tx.send(());
//! let _ = task.await;
//! # }
//! ```

pub mod framework;
pub mod rollup;

pub use framework::{Service, ServiceError, ServiceStatus};
pub use rollup::{RollupService, RollupServiceStats};
