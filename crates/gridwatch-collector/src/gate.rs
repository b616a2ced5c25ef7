//! Leadership check deciding whether cluster state may be read.

use gridwatch_client::ControlPlane;
use gridwatch_metrics::MetricSink;
use http::Uri;
use tracing::debug;

use crate::error::{CollectError, CollectResult};
use crate::metrics::ExporterMetrics;

/// Outcome of the per-scrape leadership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub is_leader: bool,
    pub allow_stale_reads: bool,
}

impl Gate {
    pub fn should_read_metrics(&self) -> bool {
        self.is_leader || self.allow_stale_reads
    }
}

/// Ask the control plane for the leader and compare it with the endpoint
/// this client talks to. Emits the `leader` gauge.
pub async fn check_leader<C: ControlPlane + ?Sized>(
    client: &C,
    metrics: &ExporterMetrics,
    sink: &MetricSink,
    allow_stale_reads: bool,
) -> CollectResult<Gate> {
    let leader = client
        .leader()
        .await
        .map_err(|e| CollectError::client("could not collect leader", e))?;
    debug!(leader = %leader, address = client.address(), "resolved raft leader");

    let is_leader = is_leader(&leader, client.address())?;
    sink.emit(&metrics.leader, if is_leader { 1.0 } else { 0.0 }, &[]);

    Ok(Gate {
        is_leader,
        allow_stale_reads,
    })
}

/// Whether the host of `leader` (`host:port`) equals the host of the
/// client endpoint URL `address`.
pub fn is_leader(leader: &str, address: &str) -> CollectResult<bool> {
    let (leader_host, _) =
        split_host_port(leader).map_err(|reason| CollectError::LeaderAddress {
            address: leader.to_string(),
            reason: reason.to_string(),
        })?;
    let client_host = url_hostname(address)?;
    debug!(leader_host, client_host = %client_host, "comparing hostnames");
    Ok(leader_host == client_host)
}

/// Split `host:port`, accepting `[v6]:port`. The host is returned without
/// brackets.
pub fn split_host_port(addr: &str) -> Result<(&str, &str), &'static str> {
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or("missing ']' in address")?;
        let port = tail.strip_prefix(':').ok_or("missing port in address")?;
        if port.contains(['[', ']']) {
            return Err("unexpected bracket in port");
        }
        return Ok((host, port));
    }

    let (host, port) = addr.rsplit_once(':').ok_or("missing port in address")?;
    if host.contains(':') {
        return Err("too many colons in address");
    }
    if host.contains(['[', ']']) {
        return Err("unexpected bracket in address");
    }
    Ok((host, port))
}

/// Hostname of a URL, without port or IPv6 brackets. Empty when the URL
/// has no authority.
fn url_hostname(address: &str) -> CollectResult<String> {
    let uri: Uri = address.parse().map_err(|e: http::uri::InvalidUri| {
        CollectError::ClientAddress {
            address: address.to_string(),
            reason: e.to_string(),
        }
    })?;
    let host = uri.host().unwrap_or_default();
    Ok(host.trim_start_matches('[').trim_end_matches(']').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwatch_client::{MockControlPlane, MockState};

    #[test]
    fn split_host_port_variants() {
        assert_eq!(split_host_port("10.0.0.1:4647"), Ok(("10.0.0.1", "4647")));
        assert_eq!(split_host_port("[::1]:4647"), Ok(("::1", "4647")));
        assert!(split_host_port("10.0.0.1").is_err());
        assert!(split_host_port("::1:4647").is_err());
        assert!(split_host_port("[::1]4647").is_err());
    }

    #[test]
    fn leader_compares_hostnames_only() {
        assert!(is_leader("10.0.0.1:4647", "http://10.0.0.1:4646").unwrap());
        assert!(!is_leader("10.0.0.2:4647", "http://10.0.0.1:4646").unwrap());
        assert!(is_leader("[::1]:4647", "http://[::1]:4646").unwrap());
    }

    #[test]
    fn malformed_addresses_are_errors() {
        assert!(matches!(
            is_leader("nomad-leader", "http://10.0.0.1:4646"),
            Err(CollectError::LeaderAddress { .. })
        ));
        assert!(matches!(
            is_leader("10.0.0.1:4647", "http://bad host:4646"),
            Err(CollectError::ClientAddress { .. })
        ));
    }

    #[test]
    fn stale_reads_open_the_gate() {
        let follower = Gate {
            is_leader: false,
            allow_stale_reads: false,
        };
        assert!(!follower.should_read_metrics());
        assert!(Gate {
            allow_stale_reads: true,
            ..follower
        }
        .should_read_metrics());
    }

    #[tokio::test]
    async fn check_leader_emits_gauge() {
        let client = MockControlPlane::new(
            "http://10.0.0.1:4646",
            MockState {
                leader: Some("10.0.0.1:4647".to_string()),
                ..Default::default()
            },
        );
        let metrics = ExporterMetrics::new();
        let sink = MetricSink::new();

        let gate = check_leader(&client, &metrics, &sink, false).await.unwrap();
        assert!(gate.is_leader);
        let families = sink.finish();
        assert_eq!(families[0].name, "nomad_leader");
        assert_eq!(families[0].samples[0].value, 1.0);
    }

    #[tokio::test]
    async fn check_leader_fails_without_leader() {
        let client = MockControlPlane::new("http://10.0.0.1:4646", MockState::default());
        let metrics = ExporterMetrics::new();
        let sink = MetricSink::new();

        let err = check_leader(&client, &metrics, &sink, true).await.unwrap_err();
        assert!(err.client_error().is_some());
        assert!(sink.finish().is_empty());
    }
}
