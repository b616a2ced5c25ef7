//! Per-scrape snapshot of the cluster's nodes.

use std::collections::HashMap;

use gridwatch_client::{ControlPlane, NodeListStub, ReadOptions};
use tracing::debug;

use crate::error::{CollectError, CollectResult};
use crate::metrics::ExporterMetrics;

/// Node list fetched once per scrape, read-only for the rest of it.
///
/// Holds one stub per node ID. When the list repeats an ID, the last stub
/// wins and keeps the position of the first.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    nodes: Vec<NodeListStub>,
    by_id: HashMap<String, usize>,
}

impl Inventory {
    pub fn new(stubs: Vec<NodeListStub>) -> Self {
        let mut nodes: Vec<NodeListStub> = Vec::with_capacity(stubs.len());
        let mut by_id = HashMap::with_capacity(stubs.len());
        for stub in stubs {
            match by_id.get(&stub.id).copied() {
                Some(i) => nodes[i] = stub,
                None => {
                    by_id.insert(stub.id.clone(), nodes.len());
                    nodes.push(stub);
                }
            }
        }
        Self { nodes, by_id }
    }

    pub fn get(&self, node_id: &str) -> Option<&NodeListStub> {
        self.by_id.get(node_id).map(|&i| &self.nodes[i])
    }

    /// Whether a node is known and ready. Unknown nodes are not ready.
    pub fn is_ready(&self, node_id: &str) -> bool {
        self.get(node_id).is_some_and(NodeListStub::is_ready)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeListStub> {
        self.nodes.iter()
    }
}

/// List every node. Failure aborts the scrape.
pub async fn fetch_nodes<C: ControlPlane + ?Sized>(
    client: &C,
    metrics: &ExporterMetrics,
    opts: ReadOptions,
) -> CollectResult<Inventory> {
    let nodes = metrics
        .timed("fetch_nodes", client.list_nodes(opts))
        .await
        .map_err(|e| CollectError::client("failed to get nodes list", e))?;
    debug!(count = nodes.len(), "fetched node list");
    Ok(Inventory::new(nodes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwatch_client::mock::node_stub;
    use gridwatch_client::{MockControlPlane, MockState, NODE_STATUS_READY};

    #[test]
    fn readiness_lookup() {
        let inventory = Inventory::new(vec![
            node_stub("n1", "client-1", "dc1", NODE_STATUS_READY),
            node_stub("n2", "client-2", "dc1", "down"),
        ]);
        assert_eq!(inventory.len(), 2);
        assert!(inventory.is_ready("n1"));
        assert!(!inventory.is_ready("n2"));
        assert!(!inventory.is_ready("n404"));
        assert_eq!(inventory.get("n2").map(|n| n.name.as_str()), Some("client-2"));
    }

    #[test]
    fn repeated_id_keeps_last_stub() {
        let inventory = Inventory::new(vec![
            node_stub("n1", "client-1", "dc1", "down"),
            node_stub("n2", "client-2", "dc1", NODE_STATUS_READY),
            node_stub("n1", "client-1b", "dc1", NODE_STATUS_READY),
        ]);
        assert_eq!(inventory.len(), 2);
        assert_eq!(inventory.iter().count(), 2);
        let names: Vec<&str> = inventory.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["client-1b", "client-2"]);
        assert!(inventory.is_ready("n1"));
    }

    #[tokio::test]
    async fn fetch_records_latency_and_propagates_failure() {
        let client = MockControlPlane::new(
            "http://127.0.0.1:4646",
            MockState {
                nodes: vec![node_stub("n1", "client-1", "dc1", NODE_STATUS_READY)],
                ..Default::default()
            },
        );
        let metrics = ExporterMetrics::new();

        let inventory = fetch_nodes(&client, &metrics, ReadOptions::stale()).await.unwrap();
        assert!(inventory.is_ready("n1"));
        assert_eq!(metrics.api_latency.count(&["fetch_nodes"]).await, 1);

        client.update(|s| {
            s.failures.insert("list_nodes".to_string());
        });
        assert!(fetch_nodes(&client, &metrics, ReadOptions::stale()).await.is_err());
    }
}
