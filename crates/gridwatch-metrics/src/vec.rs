//! Label-keyed accumulators.
//!
//! Uses atomics per series behind an async `RwLock`ed map, so concurrent
//! fetchers can increment existing series under a shared read lock and
//! only take the write lock to register a new label set.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use crate::desc::Desc;
use crate::sink::{MetricSink, Sample};

type Series = HashMap<Vec<String>, Arc<AtomicU64>>;

/// Shared map from label values to an atomic cell.
struct LabeledCells {
    desc: Desc,
    series: RwLock<Series>,
}

impl LabeledCells {
    fn new(desc: Desc) -> Self {
        Self {
            desc,
            series: RwLock::new(HashMap::new()),
        }
    }

    /// Cell for a label set, registering it on first use. `None` if the
    /// label count does not match the descriptor.
    async fn cell(&self, labels: &[&str]) -> Option<Arc<AtomicU64>> {
        if labels.len() != self.desc.labels.len() {
            warn!(
                metric = %self.desc.name,
                expected = self.desc.labels.len(),
                got = labels.len(),
                "ignoring update with wrong label count"
            );
            return None;
        }
        let key: Vec<String> = labels.iter().map(|l| l.to_string()).collect();

        {
            let series = self.series.read().await;
            if let Some(cell) = series.get(&key) {
                return Some(Arc::clone(cell));
            }
        }

        let mut series = self.series.write().await;
        Some(Arc::clone(
            series
                .entry(key)
                .or_insert_with(|| Arc::new(AtomicU64::new(0))),
        ))
    }

    async fn get(&self, labels: &[&str]) -> Option<u64> {
        let key: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        let series = self.series.read().await;
        series.get(&key).map(|c| c.load(Ordering::Relaxed))
    }

    async fn reset(&self) {
        self.series.write().await.clear();
    }

    async fn len(&self) -> usize {
        self.series.read().await.len()
    }

    /// Sorted (labels, raw value) pairs.
    async fn entries(&self) -> Vec<(Vec<String>, u64)> {
        let series = self.series.read().await;
        let mut entries: Vec<_> = series
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    async fn collect(&self, sink: &MetricSink, to_value: fn(u64) -> f64) {
        let samples = self
            .entries()
            .await
            .into_iter()
            .map(|(values, raw)| Sample {
                suffix: "",
                labels: self
                    .desc
                    .labels
                    .iter()
                    .zip(values)
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
                value: to_value(raw),
            })
            .collect();
        sink.push(&self.desc, samples);
    }
}

/// Monotonic counter per label set. Reset by the owner at the start of a
/// scrape when it represents a point-in-time tally.
pub struct CounterVec {
    cells: LabeledCells,
}

impl CounterVec {
    pub fn new(desc: Desc) -> Self {
        Self {
            cells: LabeledCells::new(desc),
        }
    }

    pub fn desc(&self) -> &Desc {
        &self.cells.desc
    }

    pub async fn inc(&self, labels: &[&str]) {
        self.add(labels, 1).await;
    }

    pub async fn add(&self, labels: &[&str], n: u64) {
        if let Some(cell) = self.cells.cell(labels).await {
            cell.fetch_add(n, Ordering::Relaxed);
        }
    }

    /// Current count for a label set, `None` if never incremented.
    pub async fn get(&self, labels: &[&str]) -> Option<u64> {
        self.cells.get(labels).await
    }

    /// Drop every series.
    pub async fn reset(&self) {
        self.cells.reset().await;
    }

    /// Number of registered label sets.
    pub async fn len(&self) -> usize {
        self.cells.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Every series as (label values, count), sorted by labels.
    pub async fn snapshot(&self) -> Vec<(Vec<String>, u64)> {
        self.cells.entries().await
    }

    /// Emit every series into the sink.
    pub async fn collect(&self, sink: &MetricSink) {
        self.cells.collect(sink, |raw| raw as f64).await;
    }
}

/// Last-write-wins gauge per label set.
pub struct GaugeVec {
    cells: LabeledCells,
}

impl GaugeVec {
    pub fn new(desc: Desc) -> Self {
        Self {
            cells: LabeledCells::new(desc),
        }
    }

    pub fn desc(&self) -> &Desc {
        &self.cells.desc
    }

    pub async fn set(&self, labels: &[&str], value: f64) {
        if let Some(cell) = self.cells.cell(labels).await {
            cell.store(value.to_bits(), Ordering::Relaxed);
        }
    }

    pub async fn get(&self, labels: &[&str]) -> Option<f64> {
        self.cells.get(labels).await.map(f64::from_bits)
    }

    pub async fn reset(&self) {
        self.cells.reset().await;
    }

    pub async fn len(&self) -> usize {
        self.cells.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn collect(&self, sink: &MetricSink) {
        self.cells.collect(sink, f64::from_bits).await;
    }
}

/// Unlabeled gauge supporting concurrent adds.
pub struct Gauge {
    desc: Desc,
    bits: AtomicU64,
}

impl Gauge {
    pub fn new(desc: Desc) -> Self {
        Self {
            desc,
            bits: AtomicU64::new(0f64.to_bits()),
        }
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn add(&self, delta: f64) {
        // fetch_update only fails when the closure returns None.
        let _ = self
            .bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + delta).to_bits())
            });
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn collect(&self, sink: &MetricSink) {
        sink.emit(&self.desc, self.get(), &[]);
    }
}
