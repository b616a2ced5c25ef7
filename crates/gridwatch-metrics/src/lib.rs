//! gridwatch-metrics: metric primitives and Prometheus exposition.
//!
//! Accumulators live for the lifetime of the exporter and are written to
//! concurrently by fetchers during a scrape. Each scrape gathers its
//! output into a [`MetricSink`], which is rendered as text.
//!
//! # Architecture
//!
//! ```text
//! Desc (name, help, kind, labels)
//!   ├── Gauge / GaugeVec / CounterVec → atomics in RwLock<HashMap>
//!   └── SummaryVec → count, sum, bounded window → quantiles
//!         │
//!         ▼ collect
//! MetricSink → Vec<MetricFamily> → render_prometheus → text/plain
//! ```

pub mod desc;
pub mod prometheus;
pub mod sink;
pub mod summary;
pub mod vec;

pub use desc::{Desc, MetricKind};
pub use prometheus::{CONTENT_TYPE, render_prometheus};
pub use sink::{MetricFamily, MetricSink, Sample};
pub use summary::SummaryVec;
pub use vec::{CounterVec, Gauge, GaugeVec};
