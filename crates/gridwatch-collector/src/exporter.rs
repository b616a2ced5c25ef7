//! Scrape orchestration.

use std::sync::Arc;

use gridwatch_client::{ClientResult, ControlPlane, ReadOptions};
use gridwatch_metrics::{MetricFamily, MetricSink};
use tracing::{debug, info};

use crate::allocations::collect_allocations;
use crate::cluster::{collect_jobs, collect_peers, collect_self};
use crate::config::CollectorConfig;
use crate::deployments::collect_deployments;
use crate::error::{ConfigError, CollectResult};
use crate::evaluations::collect_evaluations;
use crate::gate::check_leader;
use crate::inventory::fetch_nodes;
use crate::metrics::ExporterMetrics;
use crate::nodes::collect_nodes;
use crate::scrape::Scrape;

/// Aggregators in the order a scrape runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregator {
    Nodes,
    Allocations,
    Peers,
    SelfStats,
    Jobs,
    Evaluations,
    Deployments,
}

impl Aggregator {
    pub const ALL: [Aggregator; 7] = [
        Self::Nodes,
        Self::Allocations,
        Self::Peers,
        Self::SelfStats,
        Self::Jobs,
        Self::Evaluations,
        Self::Deployments,
    ];

    /// Operation name its duration is recorded under.
    pub fn method(self) -> &'static str {
        match self {
            Self::Nodes => "nodes",
            Self::Allocations => "allocations",
            Self::Peers => "peers",
            Self::SelfStats => "self",
            Self::Jobs => "jobs",
            Self::Evaluations => "eval",
            Self::Deployments => "deployment",
        }
    }

    pub fn enabled(self, config: &CollectorConfig) -> bool {
        match self {
            Self::Nodes => config.node_metrics,
            Self::Allocations => config.allocation_metrics,
            Self::Peers => config.peer_metrics,
            Self::SelfStats => config.serf_metrics,
            Self::Jobs => config.job_metrics,
            Self::Evaluations => config.eval_metrics,
            Self::Deployments => config.deployment_metrics,
        }
    }

    async fn run<C>(self, scrape: &Scrape<C>) -> CollectResult<()>
    where
        C: ControlPlane + ?Sized + 'static,
    {
        match self {
            Self::Nodes => collect_nodes(scrape).await,
            Self::Allocations => collect_allocations(scrape).await,
            Self::Peers => collect_peers(scrape).await,
            Self::SelfStats => collect_self(scrape).await,
            Self::Jobs => collect_jobs(scrape).await,
            Self::Evaluations => collect_evaluations(scrape).await,
            Self::Deployments => collect_deployments(scrape).await,
        }
    }
}

/// Polls the control plane and turns cluster state into metric families.
///
/// Accumulators and latency summaries live as long as the exporter;
/// everything else is rebuilt on each [`Exporter::collect`]. Concurrent
/// calls to `collect` are not serialized here.
pub struct Exporter<C: ?Sized> {
    client: Arc<C>,
    config: Arc<CollectorConfig>,
    metrics: Arc<ExporterMetrics>,
    opts: ReadOptions,
}

impl<C> Exporter<C>
where
    C: ControlPlane + ?Sized + 'static,
{
    pub fn new(client: Arc<C>, config: CollectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            client,
            config: Arc::new(config),
            metrics: Arc::new(ExporterMetrics::new()),
            opts: ReadOptions::stale(),
        })
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn metrics(&self) -> &ExporterMetrics {
        &self.metrics
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run one scrape.
    pub async fn collect(&self) -> Vec<MetricFamily> {
        let sink = Arc::new(MetricSink::new());
        self.collect_into(&sink).await;
        sink.finish()
    }

    async fn collect_into(&self, sink: &Arc<MetricSink>) {
        let m = &self.metrics;

        let gate = match m
            .timed(
                "leader",
                check_leader(&*self.client, m, sink, self.config.allow_stale_reads),
            )
            .await
        {
            Ok(gate) => gate,
            Err(err) => {
                sink.emit(&m.up, 0.0, &[]);
                m.report(&err).await;
                m.flush_latency(sink).await;
                return;
            }
        };
        sink.emit(&m.up, 1.0, &[]);
        m.client_errors.collect(sink).await;

        let inventory = match fetch_nodes(&*self.client, m, self.opts).await {
            Ok(inventory) => inventory,
            Err(err) => {
                m.report(&err).await;
                return;
            }
        };

        let scrape = Scrape {
            client: Arc::clone(&self.client),
            metrics: Arc::clone(&self.metrics),
            config: Arc::clone(&self.config),
            sink: Arc::clone(sink),
            inventory: Arc::new(inventory),
            opts: self.opts,
            should_read: gate.should_read_metrics(),
        };
        debug!(
            leader = gate.is_leader,
            should_read = scrape.should_read,
            nodes = scrape.inventory.len(),
            "starting scrape"
        );

        for aggregator in Aggregator::ALL {
            if !aggregator.enabled(&self.config) {
                continue;
            }
            if let Err(err) = m.timed(aggregator.method(), aggregator.run(&scrape)).await {
                m.report(&err).await;
                info!(aggregator = aggregator.method(), "stopping scrape after aggregator failure");
                return;
            }
        }

        m.flush_latency(sink).await;
    }

    /// Health check: succeeds iff the leader can be queried.
    pub async fn probe(&self) -> ClientResult<()> {
        self.client.leader().await.map(|_| ())
    }
}
