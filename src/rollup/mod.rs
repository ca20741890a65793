//! Hierarchical rollups with retention
//!
//! Maintains hourly, daily and monthly aggregate tiers inside a
//! caller-owned container and evicts expired entries from the lower tiers.
//!
//! - [`store`]: the container shape and its JSON form
//! - [`orchestrator`]: the cascading pass and its clock
//! - [`shared`]: a mutex-guarded handle for concurrent use

pub mod orchestrator;
pub mod shared;
pub mod store;

pub use orchestrator::{
    process, Clock, ManualClock, RollupOrchestrator, RollupReport, RollupStats,
    RollupStatsSnapshot, SystemClock,
};
pub use shared::SharedTimeseries;
pub use store::{initialize_store, Aggregates, Tier, TimeseriesContainer, TimeseriesStore};
