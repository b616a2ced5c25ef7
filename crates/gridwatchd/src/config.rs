//! Daemon configuration: TOML file, then command-line and environment
//! overrides.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use gridwatch_collector::CollectorConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:4646";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Address the HTTP server binds to.
    pub listen: SocketAddr,
    /// Control-plane endpoint URL.
    pub address: String,
    /// ACL token sent with every request.
    pub token: Option<String>,
    pub collector: CollectorConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 9172)),
            address: DEFAULT_ADDRESS.to_string(),
            token: None,
            collector: CollectorConfig::default(),
        }
    }
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: DaemonConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load the optional file, then apply command-line overrides.
    pub fn load(args: &CollectorArgs) -> anyhow::Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        args.apply(&mut config);
        config.collector.validate()?;
        Ok(config)
    }
}

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct CollectorArgs {
    /// TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Control-plane address.
    #[arg(long, env = "NOMAD_ADDR")]
    pub address: Option<String>,

    /// ACL token.
    #[arg(long, env = "NOMAD_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Read cluster state even when the agent is not the leader.
    #[arg(long)]
    pub allow_stale_reads: bool,

    /// Concurrent per-node detail fetches.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Concurrent per-allocation fetches (0 = unbounded).
    #[arg(long)]
    pub allocation_concurrency: Option<usize>,

    #[arg(long)]
    pub no_peer_metrics: bool,
    #[arg(long)]
    pub no_serf_metrics: bool,
    #[arg(long)]
    pub no_node_metrics: bool,
    #[arg(long)]
    pub no_job_metrics: bool,
    #[arg(long)]
    pub no_allocation_metrics: bool,
    #[arg(long)]
    pub no_eval_metrics: bool,
    #[arg(long)]
    pub no_deployment_metrics: bool,
    #[arg(long)]
    pub no_allocation_stats_metrics: bool,
}

impl CollectorArgs {
    /// Flags win over the file. Boolean flags can only switch things off
    /// (or stale reads on).
    pub fn apply(&self, config: &mut DaemonConfig) {
        if let Some(address) = &self.address {
            config.address = address.clone();
        }
        if let Some(token) = &self.token {
            config.token = Some(token.clone());
        }

        let c = &mut config.collector;
        c.allow_stale_reads |= self.allow_stale_reads;
        if let Some(n) = self.concurrency {
            c.concurrency = n;
        }
        if let Some(n) = self.allocation_concurrency {
            c.allocation_concurrency = n;
        }
        c.peer_metrics &= !self.no_peer_metrics;
        c.serf_metrics &= !self.no_serf_metrics;
        c.node_metrics &= !self.no_node_metrics;
        c.job_metrics &= !self.no_job_metrics;
        c.allocation_metrics &= !self.no_allocation_metrics;
        c.eval_metrics &= !self.no_eval_metrics;
        c.deployment_metrics &= !self.no_deployment_metrics;
        c.allocation_stats_metrics &= !self.no_allocation_stats_metrics;
    }
}
