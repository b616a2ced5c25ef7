//! Cluster-wide gauges: raft peers, the agent's own raft state, and jobs.

use gridwatch_client::ControlPlane;
use tracing::debug;

use crate::error::{CollectError, CollectResult};
use crate::scrape::Scrape;

/// Number of raft peers. Gated.
pub async fn collect_peers<C: ControlPlane + ?Sized>(scrape: &Scrape<C>) -> CollectResult<()> {
    if !scrape.should_read {
        return Ok(());
    }
    let peers = scrape
        .client
        .peers()
        .await
        .map_err(|e| CollectError::client("failed to get peer metrics", e))?;
    scrape.emit(&scrape.metrics.raft_peers, peers.len() as f64, &[]);
    Ok(())
}

/// Raft indexes reported by the agent itself. Not gated: every server
/// knows its own raft state.
pub async fn collect_self<C: ControlPlane + ?Sized>(scrape: &Scrape<C>) -> CollectResult<()> {
    let client = &scrape.client;
    let agent = client
        .agent_self()
        .await
        .map_err(|e| CollectError::client("failed to get self metrics", e))?;

    if agent.stat("nomad", "server").and_then(parse_bool) == Some(false) {
        return Err(CollectError::NotAServer);
    }

    let datacenter = client
        .datacenter()
        .await
        .map_err(|e| CollectError::client("unable to fetch the datacenter", e))?;
    let node = client
        .node_name()
        .await
        .map_err(|e| CollectError::client("unable to fetch the node name", e))?;

    let raft = &scrape.metrics.raft;
    let fields = [
        ("applied_index", &raft.applied_index),
        ("commit_index", &raft.commit_index),
        ("last_log_index", &raft.last_log_index),
        ("fsm_pending", &raft.fsm_pending),
        ("last_snapshot_index", &raft.last_snapshot_index),
        ("num_peers", &raft.num_peers),
    ];
    for (field, desc) in fields {
        let raw = agent.stat("raft", field).unwrap_or_default();
        match raw.trim().parse::<f64>() {
            Ok(value) => scrape.emit(desc, value, &[&datacenter, &node]),
            Err(_) => debug!(field, value = raw, "skipping unparsable raft stat"),
        }
    }
    Ok(())
}

/// Total number of jobs. Gated.
pub async fn collect_jobs<C: ControlPlane + ?Sized>(scrape: &Scrape<C>) -> CollectResult<()> {
    if !scrape.should_read {
        return Ok(());
    }
    let jobs = scrape
        .client
        .list_jobs(scrape.opts)
        .await
        .map_err(|e| CollectError::client("could not get jobs", e))?;
    debug!(count = jobs.len(), "collected job metrics");
    scrape.emit(&scrape.metrics.jobs, jobs.len() as f64, &[]);
    Ok(())
}

/// Boolean spellings accepted for agent stats.
fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_bool;

    #[test]
    fn bool_spellings() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("F"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool(""), None);
    }
}
