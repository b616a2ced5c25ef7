//! The control-plane boundary consumed by the collector.

use std::future::Future;
use std::pin::Pin;

use crate::error::ClientResult;
use crate::options::ReadOptions;
use crate::types::*;

/// Boxed future returned by every control-plane call.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = ClientResult<T>> + Send + 'a>>;

/// Read-only view of the orchestration control plane.
///
/// Methods return boxed `Send` futures so the trait stays object-safe and
/// calls can run inside spawned tasks. Implemented over HTTP by
/// [`crate::HttpControlPlane`] and in memory by `MockControlPlane` (`mock` feature).
pub trait ControlPlane: Send + Sync {
    /// The endpoint this client was configured with (a URL).
    fn address(&self) -> &str;

    /// Address (`host:port`) of the current raft leader.
    fn leader(&self) -> ClientFuture<'_, String>;

    /// Addresses of the raft peers.
    fn peers(&self) -> ClientFuture<'_, Vec<String>>;

    fn list_nodes(&self, opts: ReadOptions) -> ClientFuture<'_, Vec<NodeListStub>>;

    fn node_info<'a>(&'a self, node_id: &'a str, opts: ReadOptions) -> ClientFuture<'a, Node>;

    /// Every allocation placed on a node, regardless of status.
    fn node_allocations<'a>(
        &'a self,
        node_id: &'a str,
        opts: ReadOptions,
    ) -> ClientFuture<'a, Vec<Allocation>>;

    fn node_stats<'a>(&'a self, node_id: &'a str, opts: ReadOptions)
        -> ClientFuture<'a, HostStats>;

    fn list_allocations(&self, opts: ReadOptions) -> ClientFuture<'_, Vec<AllocationListStub>>;

    fn allocation_info<'a>(
        &'a self,
        alloc_id: &'a str,
        opts: ReadOptions,
    ) -> ClientFuture<'a, Allocation>;

    fn allocation_stats<'a>(
        &'a self,
        alloc: &'a Allocation,
        opts: ReadOptions,
    ) -> ClientFuture<'a, AllocResourceUsage>;

    fn list_jobs(&self, opts: ReadOptions) -> ClientFuture<'_, Vec<JobListStub>>;

    fn list_evaluations(&self, opts: ReadOptions) -> ClientFuture<'_, Vec<Evaluation>>;

    fn list_deployments(&self, opts: ReadOptions) -> ClientFuture<'_, Vec<Deployment>>;

    /// Configuration, membership and stats of the agent behind `address()`.
    fn agent_self(&self) -> ClientFuture<'_, AgentSelf>;

    /// Datacenter of the agent behind `address()`.
    fn datacenter(&self) -> ClientFuture<'_, String> {
        Box::pin(async move { Ok(self.agent_self().await?.config.datacenter) })
    }

    /// Node name of the agent behind `address()`.
    fn node_name(&self) -> ClientFuture<'_, String> {
        Box::pin(async move {
            let agent = self.agent_self().await?;
            if agent.member.name.is_empty() {
                Ok(agent.config.node_name)
            } else {
                Ok(agent.member.name)
            }
        })
    }
}
