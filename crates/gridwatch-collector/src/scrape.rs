//! State shared by the aggregators of one scrape.

use std::sync::Arc;

use gridwatch_client::{ControlPlane, ReadOptions};
use gridwatch_metrics::MetricSink;

use crate::config::CollectorConfig;
use crate::inventory::Inventory;
use crate::metrics::ExporterMetrics;

/// Everything a fetcher needs, cheap to clone into spawned tasks.
pub struct Scrape<C: ?Sized> {
    pub client: Arc<C>,
    pub metrics: Arc<ExporterMetrics>,
    pub config: Arc<CollectorConfig>,
    pub sink: Arc<MetricSink>,
    pub inventory: Arc<Inventory>,
    pub opts: ReadOptions,
    pub should_read: bool,
}

impl<C: ?Sized> Clone for Scrape<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            metrics: Arc::clone(&self.metrics),
            config: Arc::clone(&self.config),
            sink: Arc::clone(&self.sink),
            inventory: Arc::clone(&self.inventory),
            opts: self.opts,
            should_read: self.should_read,
        }
    }
}

impl<C: ControlPlane + ?Sized> Scrape<C> {
    /// Emit one sample into this scrape's output.
    pub fn emit(&self, desc: &gridwatch_metrics::Desc, value: f64, labels: &[&str]) {
        self.sink.emit(desc, value, labels);
    }
}
