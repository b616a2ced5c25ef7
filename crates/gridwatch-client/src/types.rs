//! Domain types returned by the control-plane API.
//!
//! Field names follow the control plane's JSON (PascalCase, with `ID`
//! style acronyms). Every struct defaults missing fields so older agents
//! that omit newer attributes still decode.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Unique identifier for a client node.
pub type NodeId = String;

/// Unique identifier for an allocation.
pub type AllocationId = String;

/// Status string the control plane reports for schedulable nodes.
pub const NODE_STATUS_READY: &str = "ready";

/// Desired status of allocations the scheduler wants running.
pub const ALLOC_DESIRED_RUN: &str = "run";

/// Client status of allocations whose tasks are running.
pub const ALLOC_CLIENT_RUNNING: &str = "running";

/// Decode `null` as the type's default; the control plane sends `null`
/// for empty maps and absent nested objects.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Nodes ─────────────────────────────────────────────────────────

/// Summary entry from the node list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NodeListStub {
    #[serde(rename = "ID")]
    pub id: NodeId,
    pub name: String,
    pub node_class: String,
    pub datacenter: String,
    pub version: String,
    pub status: String,
    pub drain: bool,
    pub scheduling_eligibility: String,
}

impl NodeListStub {
    /// Whether the node reports the ready status.
    pub fn is_ready(&self) -> bool {
        self.status == NODE_STATUS_READY
    }
}

/// Full node record from the node info endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Node {
    #[serde(rename = "ID")]
    pub id: NodeId,
    pub name: String,
    pub datacenter: String,
    pub node_class: String,
    pub status: String,
    #[serde(deserialize_with = "nullable")]
    pub resources: Resources,
}

/// Resource capacity of a node or resource request of an allocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    /// CPU in MHz.
    #[serde(rename = "CPU")]
    pub cpu: u64,
    #[serde(rename = "MemoryMB")]
    pub memory_mb: u64,
    #[serde(rename = "DiskMB")]
    pub disk_mb: u64,
    #[serde(rename = "IOPS")]
    pub iops: u64,
}

/// Host-level resource usage reported by a client node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HostStats {
    pub memory: HostMemoryStats,
    #[serde(rename = "CPUTicksConsumed")]
    pub cpu_ticks_consumed: f64,
}

/// Host memory usage in bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HostMemoryStats {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub free: u64,
}

// ── Allocations ───────────────────────────────────────────────────

/// Summary entry from the allocation list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AllocationListStub {
    #[serde(rename = "ID")]
    pub id: AllocationId,
    pub name: String,
    #[serde(rename = "NodeID")]
    pub node_id: NodeId,
    #[serde(rename = "JobID")]
    pub job_id: String,
    pub job_version: u64,
    pub task_group: String,
    pub desired_status: String,
    pub client_status: String,
}

/// Full allocation record from the allocation info endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Allocation {
    #[serde(rename = "ID")]
    pub id: AllocationId,
    pub name: String,
    #[serde(rename = "NodeID")]
    pub node_id: NodeId,
    #[serde(rename = "JobID")]
    pub job_id: String,
    #[serde(deserialize_with = "nullable")]
    pub job: Job,
    pub task_group: String,
    #[serde(deserialize_with = "nullable")]
    pub resources: Resources,
    pub desired_status: String,
    pub client_status: String,
    #[serde(deserialize_with = "nullable")]
    pub task_states: HashMap<String, TaskState>,
}

/// Job attributes embedded in an allocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Job {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    #[serde(rename = "Type")]
    pub job_type: String,
    pub version: u64,
    pub region: String,
}

/// Lifecycle state of one task inside an allocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TaskState {
    pub state: String,
    pub failed: bool,
    pub restarts: u64,
}

/// Resource usage of an allocation and each of its tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AllocResourceUsage {
    pub resource_usage: ResourceUsage,
    #[serde(deserialize_with = "nullable")]
    pub tasks: HashMap<String, TaskResourceUsage>,
}

/// Resource usage of a single task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TaskResourceUsage {
    pub resource_usage: ResourceUsage,
}

/// Memory and CPU usage sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ResourceUsage {
    pub memory_stats: MemoryStats,
    pub cpu_stats: CpuStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MemoryStats {
    #[serde(rename = "RSS")]
    pub rss: u64,
    pub cache: u64,
    pub swap: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CpuStats {
    pub system_mode: f64,
    pub user_mode: f64,
    pub total_ticks: f64,
    pub throttled_periods: u64,
    pub throttled_time: u64,
    pub percent: f64,
}

// ── Jobs, evaluations, deployments ────────────────────────────────

/// Summary entry from the job list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JobListStub {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    #[serde(rename = "Type")]
    pub job_type: String,
    pub status: String,
}

/// Scheduler evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Evaluation {
    #[serde(rename = "ID")]
    pub id: String,
    pub status: String,
    #[serde(rename = "JobID")]
    pub job_id: String,
}

/// Rolling deployment of a job version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Deployment {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "JobID")]
    pub job_id: String,
    pub job_version: u64,
    pub status: String,
    /// Task group name → rollout progress.
    #[serde(deserialize_with = "nullable")]
    pub task_groups: HashMap<String, DeploymentState>,
}

/// Rollout progress of one task group within a deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeploymentState {
    pub promoted: bool,
    pub auto_revert: bool,
    pub desired_canaries: u64,
    pub desired_total: u64,
    pub placed_allocs: u64,
    pub healthy_allocs: u64,
    pub unhealthy_allocs: u64,
}

// ── Agent ─────────────────────────────────────────────────────────

/// Response of the agent self endpoint. Top-level keys are lowercase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", default)]
pub struct AgentSelf {
    pub config: AgentConfig,
    pub member: AgentMember,
    /// Subsystem name → stat name → value, all as strings.
    #[serde(deserialize_with = "nullable")]
    pub stats: HashMap<String, HashMap<String, String>>,
}

impl AgentSelf {
    /// Look up a single stat, e.g. `("raft", "commit_index")`.
    pub fn stat(&self, section: &str, key: &str) -> Option<&str> {
        self.stats
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AgentConfig {
    pub datacenter: String,
    pub node_name: String,
    pub region: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AgentMember {
    pub name: String,
    pub addr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_node_stub() {
        let json = r#"{
            "ID": "f7476465-4d6e-c0de-26d0-e383c49be941",
            "Name": "client-1",
            "NodeClass": "",
            "Datacenter": "dc1",
            "Version": "1.6.1",
            "Status": "ready",
            "Drain": false,
            "SchedulingEligibility": "eligible",
            "CreateIndex": 6
        }"#;
        let stub: NodeListStub = serde_json::from_str(json).unwrap();
        assert_eq!(stub.name, "client-1");
        assert_eq!(stub.datacenter, "dc1");
        assert!(stub.is_ready());
        assert!(!stub.drain);
    }

    #[test]
    fn decode_allocation_with_job_and_tasks() {
        let json = r#"{
            "ID": "a1",
            "NodeID": "n1",
            "JobID": "web",
            "TaskGroup": "frontend",
            "DesiredStatus": "run",
            "ClientStatus": "running",
            "Resources": {"CPU": 500, "MemoryMB": 256},
            "Job": {"ID": "web", "Name": "web", "Type": "service", "Version": 3, "Region": "global"},
            "TaskStates": {"nginx": {"State": "running", "Failed": false, "Restarts": 1}}
        }"#;
        let alloc: Allocation = serde_json::from_str(json).unwrap();
        assert_eq!(alloc.job.job_type, "service");
        assert_eq!(alloc.job.version, 3);
        assert_eq!(alloc.resources.memory_mb, 256);
        assert_eq!(alloc.task_states["nginx"].state, "running");
    }

    #[test]
    fn decode_pending_allocation_with_nulls() {
        let json = r#"{"ID": "a2", "NodeID": "n1", "TaskStates": null, "Job": null}"#;
        let alloc: Allocation = serde_json::from_str(json).unwrap();
        assert!(alloc.task_states.is_empty());
        assert_eq!(alloc.job, Job::default());
    }

    #[test]
    fn decode_allocation_stats() {
        let json = r#"{
            "ResourceUsage": {
                "MemoryStats": {"RSS": 1048576},
                "CpuStats": {"Percent": 12.5, "TotalTicks": 300.0, "ThrottledTime": 7}
            },
            "Tasks": {
                "nginx": {"ResourceUsage": {"MemoryStats": {"RSS": 4096}, "CpuStats": {"Percent": 1.5}}}
            }
        }"#;
        let usage: AllocResourceUsage = serde_json::from_str(json).unwrap();
        assert_eq!(usage.resource_usage.memory_stats.rss, 1_048_576);
        assert_eq!(usage.resource_usage.cpu_stats.throttled_time, 7);
        assert_eq!(usage.tasks["nginx"].resource_usage.cpu_stats.percent, 1.5);
    }

    #[test]
    fn decode_deployment_task_groups() {
        let json = r#"{
            "ID": "d1",
            "JobID": "web",
            "JobVersion": 4,
            "Status": "running",
            "TaskGroups": {
                "frontend": {"DesiredTotal": 3, "HealthyAllocs": 2, "AutoRevert": true}
            }
        }"#;
        let dep: Deployment = serde_json::from_str(json).unwrap();
        let tg = &dep.task_groups["frontend"];
        assert_eq!(tg.desired_total, 3);
        assert_eq!(tg.healthy_allocs, 2);
        assert!(tg.auto_revert);
        assert!(!tg.promoted);
    }

    #[test]
    fn agent_stat_lookup() {
        let json = r#"{
            "config": {"Datacenter": "dc1"},
            "member": {"Name": "server-1.global"},
            "stats": {"nomad": {"server": "true"}, "raft": {"commit_index": "42"}}
        }"#;
        let agent: AgentSelf = serde_json::from_str(json).unwrap();
        assert_eq!(agent.stat("raft", "commit_index"), Some("42"));
        assert_eq!(agent.stat("raft", "missing"), None);
        assert_eq!(agent.stat("serf", "members"), None);
    }
}
