//! In-memory control plane for tests. Built with the `mock` feature.
//!
//! Serves a mutable [`MockState`] through the [`ControlPlane`] trait. Calls
//! can be made to fail by operation (`"list_nodes"`) or by operation and
//! entity (`"node_info:n1"`), can be slowed down with a fixed latency, and
//! are counted so tests can assert which requests were (not) issued.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use crate::client::{ClientFuture, ControlPlane};
use crate::error::{ClientError, ClientResult};
use crate::options::ReadOptions;
use crate::types::*;

/// Data served by [`MockControlPlane`].
#[derive(Debug, Clone, Default)]
pub struct MockState {
    /// Leader address; `None` makes the leader query fail.
    pub leader: Option<String>,
    pub peers: Vec<String>,
    pub nodes: Vec<NodeListStub>,
    pub node_details: HashMap<NodeId, Node>,
    pub node_allocations: HashMap<NodeId, Vec<Allocation>>,
    pub node_stats: HashMap<NodeId, HostStats>,
    pub allocations: Vec<AllocationListStub>,
    pub allocation_details: HashMap<AllocationId, Allocation>,
    pub allocation_stats: HashMap<AllocationId, AllocResourceUsage>,
    pub jobs: Vec<JobListStub>,
    pub evaluations: Vec<Evaluation>,
    pub deployments: Vec<Deployment>,
    pub agent: AgentSelf,
    /// Operations (or `operation:entity` keys) that return HTTP 500.
    pub failures: HashSet<String>,
    /// Delay applied to every call.
    pub latency: Duration,
}

/// [`ControlPlane`] backed by a [`MockState`].
#[derive(Debug)]
pub struct MockControlPlane {
    address: String,
    state: RwLock<MockState>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Decrements the in-flight counter when a call finishes.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockControlPlane {
    /// Create a mock answering for `address` with the given state.
    pub fn new(address: &str, state: MockState) -> Self {
        Self {
            address: address.to_string(),
            state: RwLock::new(state),
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Mutate the served state between scrapes.
    pub fn update(&self, f: impl FnOnce(&mut MockState)) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        f(&mut state);
    }

    /// Number of calls made for an operation (`"node_info"`) or for one
    /// entity (`"node_info:n1"`).
    pub fn calls(&self, key: &str) -> usize {
        let calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        calls.get(key).copied().unwrap_or(0)
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Forget recorded call counts and the in-flight high-water mark.
    pub fn reset_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.max_in_flight.store(0, Ordering::SeqCst);
    }

    fn record(&self, op: &str, entity: Option<&str>) {
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        *calls.entry(op.to_string()).or_insert(0) += 1;
        if let Some(entity) = entity {
            *calls.entry(format!("{op}:{entity}")).or_insert(0) += 1;
        }
    }

    /// Resolve a call against the current state, then serve it after the
    /// configured latency.
    fn respond<T, F>(&self, op: &'static str, entity: Option<&str>, lookup: F) -> ClientFuture<'_, T>
    where
        T: Send + 'static,
        F: FnOnce(&MockState) -> Option<T>,
    {
        self.record(op, entity);
        let path = match entity {
            Some(entity) => format!("mock://{op}/{entity}"),
            None => format!("mock://{op}"),
        };

        let (result, latency) = {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            let failing = state.failures.contains(op)
                || entity.is_some_and(|e| state.failures.contains(&format!("{op}:{e}")));
            let result: ClientResult<T> = if failing {
                Err(ClientError::Status {
                    path,
                    status: 500,
                    body: "injected failure".to_string(),
                })
            } else {
                lookup(&state).ok_or(ClientError::Status {
                    path,
                    status: 404,
                    body: "not found".to_string(),
                })
            };
            (result, state.latency)
        };

        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let _guard = InFlight(&self.in_flight);
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            result
        })
    }
}

impl ControlPlane for MockControlPlane {
    fn address(&self) -> &str {
        &self.address
    }

    fn leader(&self) -> ClientFuture<'_, String> {
        self.respond("leader", None, |s| s.leader.clone())
    }

    fn peers(&self) -> ClientFuture<'_, Vec<String>> {
        self.respond("peers", None, |s| Some(s.peers.clone()))
    }

    fn list_nodes(&self, _opts: ReadOptions) -> ClientFuture<'_, Vec<NodeListStub>> {
        self.respond("list_nodes", None, |s| Some(s.nodes.clone()))
    }

    fn node_info<'a>(&'a self, node_id: &'a str, _opts: ReadOptions) -> ClientFuture<'a, Node> {
        self.respond("node_info", Some(node_id), |s| {
            s.node_details.get(node_id).cloned()
        })
    }

    fn node_allocations<'a>(
        &'a self,
        node_id: &'a str,
        _opts: ReadOptions,
    ) -> ClientFuture<'a, Vec<Allocation>> {
        self.respond("node_allocations", Some(node_id), |s| {
            Some(s.node_allocations.get(node_id).cloned().unwrap_or_default())
        })
    }

    fn node_stats<'a>(
        &'a self,
        node_id: &'a str,
        _opts: ReadOptions,
    ) -> ClientFuture<'a, HostStats> {
        self.respond("node_stats", Some(node_id), |s| s.node_stats.get(node_id).cloned())
    }

    fn list_allocations(&self, _opts: ReadOptions) -> ClientFuture<'_, Vec<AllocationListStub>> {
        self.respond("list_allocations", None, |s| Some(s.allocations.clone()))
    }

    fn allocation_info<'a>(
        &'a self,
        alloc_id: &'a str,
        _opts: ReadOptions,
    ) -> ClientFuture<'a, Allocation> {
        self.respond("allocation_info", Some(alloc_id), |s| {
            s.allocation_details.get(alloc_id).cloned()
        })
    }

    fn allocation_stats<'a>(
        &'a self,
        alloc: &'a Allocation,
        _opts: ReadOptions,
    ) -> ClientFuture<'a, AllocResourceUsage> {
        self.respond("allocation_stats", Some(&alloc.id), |s| {
            s.allocation_stats.get(&alloc.id).cloned()
        })
    }

    fn list_jobs(&self, _opts: ReadOptions) -> ClientFuture<'_, Vec<JobListStub>> {
        self.respond("list_jobs", None, |s| Some(s.jobs.clone()))
    }

    fn list_evaluations(&self, _opts: ReadOptions) -> ClientFuture<'_, Vec<Evaluation>> {
        self.respond("list_evaluations", None, |s| Some(s.evaluations.clone()))
    }

    fn list_deployments(&self, _opts: ReadOptions) -> ClientFuture<'_, Vec<Deployment>> {
        self.respond("list_deployments", None, |s| Some(s.deployments.clone()))
    }

    fn agent_self(&self) -> ClientFuture<'_, AgentSelf> {
        self.respond("agent_self", None, |s| Some(s.agent.clone()))
    }
}

// ── Fixtures ──────────────────────────────────────────────────────

/// A node list entry with the given status, on a supported version.
pub fn node_stub(id: &str, name: &str, datacenter: &str, status: &str) -> NodeListStub {
    NodeListStub {
        id: id.to_string(),
        name: name.to_string(),
        node_class: "general".to_string(),
        datacenter: datacenter.to_string(),
        version: "1.6.1".to_string(),
        status: status.to_string(),
        drain: false,
        scheduling_eligibility: "eligible".to_string(),
    }
}

/// Node detail matching [`node_stub`], with fixed capacity.
pub fn node_detail(stub: &NodeListStub) -> Node {
    Node {
        id: stub.id.clone(),
        name: stub.name.clone(),
        datacenter: stub.datacenter.clone(),
        node_class: stub.node_class.clone(),
        status: stub.status.clone(),
        resources: Resources {
            cpu: 4000,
            memory_mb: 8192,
            disk_mb: 100_000,
            iops: 150,
        },
    }
}

/// An allocation list entry.
pub fn allocation_stub(
    id: &str,
    node_id: &str,
    desired_status: &str,
    client_status: &str,
) -> AllocationListStub {
    AllocationListStub {
        id: id.to_string(),
        name: format!("web.frontend[{id}]"),
        node_id: node_id.to_string(),
        job_id: "web".to_string(),
        job_version: 1,
        task_group: "frontend".to_string(),
        desired_status: desired_status.to_string(),
        client_status: client_status.to_string(),
    }
}

/// Allocation detail for a stub: a `service` job with one `nginx` task.
pub fn allocation_detail(stub: &AllocationListStub) -> Allocation {
    let mut task_states = HashMap::new();
    task_states.insert(
        "nginx".to_string(),
        TaskState {
            state: stub.client_status.clone(),
            failed: false,
            restarts: 0,
        },
    );
    Allocation {
        id: stub.id.clone(),
        name: stub.name.clone(),
        node_id: stub.node_id.clone(),
        job_id: stub.job_id.clone(),
        job: Job {
            id: stub.job_id.clone(),
            name: stub.job_id.clone(),
            job_type: "service".to_string(),
            version: stub.job_version,
            region: "global".to_string(),
        },
        task_group: stub.task_group.clone(),
        resources: Resources {
            cpu: 500,
            memory_mb: 256,
            disk_mb: 0,
            iops: 0,
        },
        desired_status: stub.desired_status.clone(),
        client_status: stub.client_status.clone(),
        task_states,
    }
}

/// Resource usage for an allocation with one `nginx` task.
pub fn allocation_usage(cpu_percent: f64, rss: u64) -> AllocResourceUsage {
    let usage = ResourceUsage {
        memory_stats: MemoryStats {
            rss,
            cache: 0,
            swap: 0,
        },
        cpu_stats: CpuStats {
            system_mode: 1.0,
            user_mode: 2.0,
            total_ticks: 120.0,
            throttled_periods: 0,
            throttled_time: 0,
            percent: cpu_percent,
        },
    };
    let mut tasks = HashMap::new();
    tasks.insert(
        "nginx".to_string(),
        TaskResourceUsage {
            resource_usage: usage.clone(),
        },
    );
    AllocResourceUsage {
        resource_usage: usage,
        tasks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> MockState {
        let n1 = node_stub("n1", "client-1", "dc1", NODE_STATUS_READY);
        let mut state = MockState {
            leader: Some("127.0.0.1:4647".to_string()),
            ..Default::default()
        };
        state.node_details.insert("n1".to_string(), node_detail(&n1));
        state.nodes.push(n1);
        state
    }

    #[tokio::test]
    async fn serves_state_and_counts_calls() {
        let mock = MockControlPlane::new("http://127.0.0.1:4646", state());

        assert_eq!(mock.leader().await.unwrap(), "127.0.0.1:4647");
        let nodes = mock.list_nodes(ReadOptions::stale()).await.unwrap();
        assert_eq!(nodes.len(), 1);
        let node = mock.node_info("n1", ReadOptions::stale()).await.unwrap();
        assert_eq!(node.resources.memory_mb, 8192);

        assert_eq!(mock.calls("list_nodes"), 1);
        assert_eq!(mock.calls("node_info"), 1);
        assert_eq!(mock.calls("node_info:n1"), 1);
        assert_eq!(mock.calls("node_stats"), 0);
    }

    #[tokio::test]
    async fn missing_entity_is_not_found() {
        let mock = MockControlPlane::new("http://127.0.0.1:4646", state());
        let err = mock.node_info("n2", ReadOptions::stale()).await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn injected_failures_by_operation_and_entity() {
        let mock = MockControlPlane::new("http://127.0.0.1:4646", state());
        mock.update(|s| {
            s.failures.insert("node_info:n1".to_string());
            s.failures.insert("list_jobs".to_string());
        });

        assert!(mock.node_info("n1", ReadOptions::stale()).await.is_err());
        assert!(mock.list_jobs(ReadOptions::stale()).await.is_err());
        assert!(mock.list_nodes(ReadOptions::stale()).await.is_ok());
    }

    #[tokio::test]
    async fn missing_leader_fails() {
        let mock = MockControlPlane::new("http://127.0.0.1:4646", MockState::default());
        assert!(mock.leader().await.is_err());
    }

    #[tokio::test]
    async fn node_name_prefers_member_name() {
        let mock = MockControlPlane::new("http://127.0.0.1:4646", state());
        mock.update(|s| {
            s.agent.config.datacenter = "dc1".to_string();
            s.agent.config.node_name = "config-name".to_string();
        });
        assert_eq!(mock.node_name().await.unwrap(), "config-name");
        assert_eq!(mock.datacenter().await.unwrap(), "dc1");

        mock.update(|s| s.agent.member.name = "server-1.global".to_string());
        assert_eq!(mock.node_name().await.unwrap(), "server-1.global");
    }
}
