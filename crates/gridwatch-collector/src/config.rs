//! Collector configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of concurrent per-node detail fetches.
pub const DEFAULT_CONCURRENCY: usize = 20;

/// What the engine collects and how hard it may hit the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Read cluster state even when the configured endpoint is not the
    /// raft leader.
    pub allow_stale_reads: bool,
    pub peer_metrics: bool,
    pub serf_metrics: bool,
    pub node_metrics: bool,
    pub job_metrics: bool,
    pub allocation_metrics: bool,
    pub eval_metrics: bool,
    pub deployment_metrics: bool,
    /// Per-node capacity/usage detail.
    pub allocation_stats_metrics: bool,
    /// Bound on concurrent per-node detail fetches.
    pub concurrency: usize,
    /// Bound on concurrent per-allocation fetches. 0 means unbounded.
    pub allocation_concurrency: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            allow_stale_reads: false,
            peer_metrics: true,
            serf_metrics: true,
            node_metrics: true,
            job_metrics: true,
            allocation_metrics: true,
            eval_metrics: true,
            deployment_metrics: true,
            allocation_stats_metrics: true,
            concurrency: DEFAULT_CONCURRENCY,
            allocation_concurrency: 0,
        }
    }
}

impl CollectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Concurrency(self.concurrency));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_everything() {
        let config = CollectorConfig::default();
        assert!(!config.allow_stale_reads);
        assert!(config.node_metrics && config.deployment_metrics);
        assert_eq!(config.concurrency, 20);
        assert_eq!(config.allocation_concurrency, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: CollectorConfig = toml::from_str(
            r#"
allow_stale_reads = true
job_metrics = false
concurrency = 4
"#,
        )
        .unwrap();
        assert!(config.allow_stale_reads);
        assert!(!config.job_metrics);
        assert!(config.eval_metrics);
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = CollectorConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Concurrency(0)));
    }
}
