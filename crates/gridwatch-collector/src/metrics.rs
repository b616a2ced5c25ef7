//! The exporter's metric catalog.
//!
//! [`ExporterMetrics`] is built once at startup and shared by every scrape.
//! Descriptors for per-scrape values sit next to the accumulators that are
//! reset and refilled on each scrape, and the latency summaries that keep
//! growing for the lifetime of the process.

use std::future::Future;
use std::time::Instant;

use gridwatch_client::ClientError;
use gridwatch_metrics::{CounterVec, Desc, Gauge, GaugeVec, MetricSink, SummaryVec};
use tracing::warn;

use crate::error::CollectError;

/// Prefix of every exposed metric name.
pub const NAMESPACE: &str = "nomad";

const NODE_LABELS: &[&str] = &["node", "datacenter"];

const ALLOCATION_LABELS: &[&str] = &[
    "job",
    "job_version",
    "task_group",
    "alloc_id",
    "region",
    "datacenter",
    "node",
];

const TASK_LABELS: &[&str] = &[
    "job",
    "job_version",
    "task_group",
    "alloc_id",
    "region",
    "datacenter",
    "node",
    "task",
];

const RAFT_LABELS: &[&str] = &["datacenter", "node"];

const DEPLOYMENT_TASK_GROUP_LABELS: &[&str] = &[
    "status",
    "job_id",
    "job_version",
    "task_group",
    "promoted",
    "auto_revert",
];

/// Capacity, allocation and usage gauges of a client node.
pub struct NodeGauges {
    pub resource_memory: Desc,
    pub allocated_memory: Desc,
    pub used_memory: Desc,
    pub resource_cpu: Desc,
    pub allocated_cpu: Desc,
    pub used_cpu: Desc,
    pub resource_iops: Desc,
    pub resource_disk: Desc,
}

/// Resource usage gauges of a running allocation and its tasks.
pub struct AllocationGauges {
    pub cpu_percent: Desc,
    pub cpu_throttled: Desc,
    pub memory_rss: Desc,
    pub cpu_ticks: Desc,
    pub cpu_user_mode: Desc,
    pub cpu_system_mode: Desc,
    pub memory_required: Desc,
    pub cpu_required: Desc,
    pub task_cpu_percent: Desc,
    pub task_cpu_total_ticks: Desc,
    pub task_memory_rss: Desc,
}

/// Raft state reported by the agent's self endpoint.
pub struct RaftGauges {
    pub applied_index: Desc,
    pub commit_index: Desc,
    pub last_log_index: Desc,
    pub fsm_pending: Desc,
    pub last_snapshot_index: Desc,
    pub num_peers: Desc,
}

/// Per task group deployment gauges, reset every scrape.
pub struct DeploymentGauges {
    pub desired_canaries: GaugeVec,
    pub desired_total: GaugeVec,
    pub placed_allocs: GaugeVec,
    pub healthy_allocs: GaugeVec,
    pub unhealthy_allocs: GaugeVec,
}

impl DeploymentGauges {
    pub fn all(&self) -> [&GaugeVec; 5] {
        [
            &self.desired_canaries,
            &self.desired_total,
            &self.placed_allocs,
            &self.healthy_allocs,
            &self.unhealthy_allocs,
        ]
    }
}

/// Every metric the exporter can expose.
pub struct ExporterMetrics {
    pub up: Desc,
    pub leader: Desc,
    pub client_errors: CounterVec,
    pub api_latency: SummaryVec,
    pub api_node_latency: SummaryVec,

    pub serf_lan_members: Desc,
    pub node_info: Desc,
    pub serf_lan_member_status: Desc,
    pub node: NodeGauges,

    pub allocations: CounterVec,
    pub allocation_zombies: Gauge,
    pub tasks: CounterVec,
    pub allocation: AllocationGauges,

    pub raft_peers: Desc,
    pub raft: RaftGauges,
    pub jobs: Desc,
    pub evals: CounterVec,
    pub deployments: CounterVec,
    pub deployment_task_groups: DeploymentGauges,
}

impl Default for ExporterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ExporterMetrics {
    pub fn new() -> Self {
        let ns = NAMESPACE;
        let node = |name, help| Desc::labeled_gauge(ns, name, help, NODE_LABELS);
        let alloc = |name, help| Desc::labeled_gauge(ns, name, help, ALLOCATION_LABELS);
        let task = |name, help| Desc::labeled_gauge(ns, name, help, TASK_LABELS);
        let raft = |name, help| Desc::labeled_gauge(ns, name, help, RAFT_LABELS);
        let tg = |name, help| {
            GaugeVec::new(Desc::labeled_gauge(
                ns,
                name,
                help,
                DEPLOYMENT_TASK_GROUP_LABELS,
            ))
        };

        Self {
            up: Desc::gauge(ns, "up", "Was the last query of the control plane successful."),
            leader: Desc::gauge(ns, "leader", "Is the queried agent the raft leader."),
            client_errors: CounterVec::new(Desc::counter(
                ns,
                "client_errors_total",
                "Number of errors returned by the control-plane client.",
                &["type"],
            )),
            api_latency: SummaryVec::new(Desc::summary(
                ns,
                "api_latency_seconds",
                "Latency of control-plane calls and collection steps.",
                &["method"],
            )),
            api_node_latency: SummaryVec::new(Desc::summary(
                ns,
                "api_node_latency_seconds",
                "Latency of control-plane calls scoped to a node.",
                &["method", "node"],
            )),

            serf_lan_members: Desc::gauge(ns, "serf_lan_members", "How many members are in the cluster."),
            node_info: Desc::labeled_gauge(
                ns,
                "node_info",
                "Node information.",
                &[
                    "class",
                    "datacenter",
                    "drain",
                    "node",
                    "id",
                    "scheduling_eligibility",
                    "status",
                    "version",
                ],
            ),
            serf_lan_member_status: Desc::labeled_gauge(
                ns,
                "serf_lan_member_status",
                "Whether a cluster member is ready (1) or not (0).",
                &["class", "datacenter", "node", "id", "drain"],
            ),
            node: NodeGauges {
                resource_memory: node("node_resource_memory_bytes", "Amount of memory the node has in bytes."),
                allocated_memory: node(
                    "node_allocated_memory_bytes",
                    "Amount of memory allocated to running allocations in bytes.",
                ),
                used_memory: node("node_used_memory_bytes", "Amount of memory used on the node in bytes."),
                resource_cpu: node("node_resource_cpu_megahertz", "Amount of CPU the node has in MHz."),
                allocated_cpu: node(
                    "node_allocated_cpu_megahertz",
                    "Amount of CPU allocated to running allocations in MHz.",
                ),
                used_cpu: node("node_used_cpu_megahertz", "Amount of CPU used on the node in MHz."),
                resource_iops: node("node_resource_iops", "Amount of IOPS the node has."),
                resource_disk: node("node_resource_disk_bytes", "Amount of disk the node has in bytes."),
            },

            allocations: CounterVec::new(Desc::counter(
                ns,
                "allocation",
                "Allocations by client status.",
                &["status", "job_type", "job_id", "job_version", "task_group", "node"],
            )),
            allocation_zombies: Gauge::new(Desc::gauge(
                ns,
                "allocation_zombies",
                "Allocations whose node is not in the cluster.",
            )),
            tasks: CounterVec::new(Desc::counter(
                ns,
                "task",
                "Tasks by lifecycle state.",
                &["state", "job_type", "node"],
            )),
            allocation: AllocationGauges {
                cpu_percent: alloc("allocation_cpu_percent", "Allocation CPU usage."),
                cpu_throttled: alloc("allocation_cpu_throttled", "Allocation throttled CPU."),
                memory_rss: alloc("allocation_memory_rss_bytes", "Allocation RSS memory usage in bytes."),
                cpu_ticks: alloc("allocation_cpu_ticks", "Allocation CPU ticks."),
                cpu_user_mode: alloc("allocation_cpu_user_mode", "Allocation CPU user mode."),
                cpu_system_mode: alloc("allocation_cpu_system_mode", "Allocation CPU system mode."),
                memory_required: alloc(
                    "allocation_memory_rss_required_bytes",
                    "Allocation memory required in bytes.",
                ),
                cpu_required: alloc("allocation_cpu_required", "Allocation CPU required in MHz."),
                task_cpu_percent: task("task_cpu_percent", "Task CPU usage percent."),
                task_cpu_total_ticks: task("task_cpu_total_ticks", "Task CPU total ticks."),
                task_memory_rss: task("task_memory_rss_bytes", "Task memory RSS usage in bytes."),
            },

            raft_peers: Desc::gauge(ns, "raft_peers", "How many peers (servers) are in the raft cluster."),
            raft: RaftGauges {
                applied_index: raft("raft_applied_index", "Raft applied index."),
                commit_index: raft("raft_commit_index", "Raft commit index."),
                last_log_index: raft("raft_last_log_index", "Raft last log index."),
                fsm_pending: raft("raft_fsm_pending", "Raft FSM pending."),
                last_snapshot_index: raft("raft_last_snapshot_index", "Raft last snapshot index."),
                num_peers: raft("raft_num_peers", "Raft number of peers."),
            },
            jobs: Desc::gauge(ns, "jobs", "How many jobs there are in the cluster."),
            evals: CounterVec::new(Desc::counter(
                ns,
                "evals",
                "Evaluations by status.",
                &["status"],
            )),
            deployments: CounterVec::new(Desc::counter(
                ns,
                "deployments",
                "Deployments by status.",
                &["status", "job_id", "job_version"],
            )),
            deployment_task_groups: DeploymentGauges {
                desired_canaries: tg(
                    "deployment_task_group_desired_canaries",
                    "Desired canaries of a deployment task group.",
                ),
                desired_total: tg(
                    "deployment_task_group_desired_total",
                    "Desired allocations of a deployment task group.",
                ),
                placed_allocs: tg(
                    "deployment_task_group_placed_allocs",
                    "Placed allocations of a deployment task group.",
                ),
                healthy_allocs: tg(
                    "deployment_task_group_healthy_allocs",
                    "Healthy allocations of a deployment task group.",
                ),
                unhealthy_allocs: tg(
                    "deployment_task_group_unhealthy_allocs",
                    "Unhealthy allocations of a deployment task group.",
                ),
            },
        }
    }

    /// Run `fut`, recording its duration under `method`.
    pub async fn timed<F: Future>(&self, method: &str, fut: F) -> F::Output {
        let start = Instant::now();
        let out = fut.await;
        self.api_latency.observe(&[method], start.elapsed()).await;
        out
    }

    /// Run `fut`, recording its duration under `method` for one node.
    pub async fn timed_node<F: Future>(&self, method: &str, node: &str, fut: F) -> F::Output {
        let start = Instant::now();
        let out = fut.await;
        self.api_node_latency
            .observe(&[method, node], start.elapsed())
            .await;
        out
    }

    /// Log a collection failure, counting it if it came from the client.
    pub async fn report(&self, err: &CollectError) {
        warn!(error = %err, "collection failed");
        if let Some(client) = err.client_error() {
            self.count_client_error(client).await;
        }
    }

    pub async fn count_client_error(&self, err: &ClientError) {
        self.client_errors.inc(&[err.kind()]).await;
    }

    /// Emit both latency summaries.
    pub async fn flush_latency(&self, sink: &MetricSink) {
        self.api_latency.collect(sink).await;
        self.api_node_latency.collect(sink).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn catalog_names_are_namespaced() {
        let m = ExporterMetrics::new();
        assert_eq!(m.up.name, "nomad_up");
        assert_eq!(m.node.resource_disk.name, "nomad_node_resource_disk_bytes");
        assert_eq!(m.allocation.task_memory_rss.labels.len(), 8);
        assert_eq!(
            m.deployment_task_groups.desired_total.desc().name,
            "nomad_deployment_task_group_desired_total"
        );
    }

    #[tokio::test]
    async fn timed_records_latency() {
        let m = ExporterMetrics::new();
        let out = m
            .timed("leader", async {
                tokio::time::sleep(Duration::from_millis(1)).await;
                7
            })
            .await;
        assert_eq!(out, 7);
        assert_eq!(m.api_latency.count(&["leader"]).await, 1);

        m.timed_node("get_stats", "client-1", async {}).await;
        assert_eq!(m.api_node_latency.count(&["get_stats", "client-1"]).await, 1);
    }

    #[tokio::test]
    async fn report_counts_client_errors_only() {
        let m = ExporterMetrics::new();
        m.report(&CollectError::client(
            "failed to get nodes list",
            ClientError::Transport {
                path: "/v1/nodes".to_string(),
                reason: "connection refused".to_string(),
            },
        ))
        .await;
        m.report(&CollectError::NotAServer).await;

        assert_eq!(m.client_errors.get(&["transport"]).await, Some(1));
        assert_eq!(m.client_errors.len().await, 1);
    }
}
