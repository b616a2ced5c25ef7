//! gridwatch-collector: the collection engine.
//!
//! On every scrape the [`Exporter`] checks leadership, snapshots the node
//! inventory, and runs the enabled aggregators in a fixed order. Each
//! aggregator resets the accumulators it owns before refilling them, so
//! entities that disappeared between scrapes leave no stale series.
//!
//! # Architecture
//!
//! ```text
//! Exporter::collect
//!   ├── gate::check_leader        → leader, up
//!   ├── inventory::fetch_nodes    → Arc<Inventory>
//!   └── aggregators (fail-fast, each timed)
//!         ├── nodes        → FanOut(concurrency)
//!         ├── allocations  → FanOut(allocation_concurrency)
//!         ├── peers, self, jobs
//!         ├── evaluations
//!         └── deployments
//!   → MetricSink → Vec<MetricFamily>
//! ```

pub mod allocations;
pub mod cluster;
pub mod config;
pub mod deployments;
pub mod error;
pub mod evaluations;
pub mod exporter;
pub mod gate;
pub mod inventory;
pub mod metrics;
pub mod nodes;
pub mod pool;
pub mod scrape;
pub mod version;

pub use config::CollectorConfig;
pub use error::{CollectError, CollectResult, ConfigError};
pub use exporter::{Aggregator, Exporter};
pub use inventory::Inventory;
pub use metrics::{ExporterMetrics, NAMESPACE};
