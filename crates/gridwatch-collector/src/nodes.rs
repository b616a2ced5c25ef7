//! Node presence, readiness and per-node capacity/usage.

use gridwatch_client::{ALLOC_CLIENT_RUNNING, Allocation, ControlPlane, Node, NodeListStub};
use tracing::debug;

use crate::error::{CollectError, CollectResult};
use crate::pool::FanOut;
use crate::scrape::Scrape;
use crate::version;

const MIB: f64 = 1024.0 * 1024.0;

/// Emit presence and readiness for every node, and capacity/usage for the
/// nodes whose detail may be read. Per-node failures are logged and only
/// skip that node's remaining gauges.
pub async fn collect_nodes<C>(scrape: &Scrape<C>) -> CollectResult<()>
where
    C: ControlPlane + ?Sized + 'static,
{
    let metrics = &scrape.metrics;
    scrape.emit(&metrics.serf_lan_members, scrape.inventory.len() as f64, &[]);
    debug!(nodes = scrape.inventory.len(), "collecting node metrics");

    let mut pool = FanOut::new(scrape.config.concurrency);
    for node in scrape.inventory.iter() {
        let scrape = scrape.clone();
        let node = node.clone();
        pool.spawn(move |bound| async move {
            emit_baseline(&scrape, &node);
            if !wants_detail(&scrape, &node) {
                return;
            }
            let _permit = bound.acquire().await;
            collect_node_detail(&scrape, &node).await;
        });
    }
    pool.join().await?;

    debug!("done waiting for node metrics");
    Ok(())
}

fn emit_baseline<C: ControlPlane + ?Sized>(scrape: &Scrape<C>, node: &NodeListStub) {
    let m = &scrape.metrics;
    let drain = node.drain.to_string();
    scrape.emit(
        &m.node_info,
        1.0,
        &[
            &node.node_class,
            &node.datacenter,
            &drain,
            &node.name,
            &node.id,
            &node.scheduling_eligibility,
            &node.status,
            &node.version,
        ],
    );

    let ready = scrape.inventory.is_ready(&node.id);
    scrape.emit(
        &m.serf_lan_member_status,
        if ready { 1.0 } else { 0.0 },
        &[&node.node_class, &node.datacenter, &node.name, &node.id, &drain],
    );
}

fn wants_detail<C: ControlPlane + ?Sized>(scrape: &Scrape<C>, node: &NodeListStub) -> bool {
    if !scrape.should_read {
        return false;
    }
    if !scrape.inventory.is_ready(&node.id) {
        debug!(node = %node.name, status = %node.status, "skipping detail of node that is not ready");
        return false;
    }
    if !version::supported(&node.name, &node.version) {
        return false;
    }
    scrape.config.allocation_stats_metrics
}

async fn collect_node_detail<C: ControlPlane + ?Sized>(scrape: &Scrape<C>, stub: &NodeListStub) {
    let m = &scrape.metrics;
    let client = &scrape.client;

    let node = match m
        .timed_node("fetch_node", &stub.name, client.node_info(&stub.id, scrape.opts))
        .await
    {
        Ok(node) => node,
        Err(e) => {
            let err = CollectError::client(format!("failed to get node {} info", stub.name), e);
            m.report(&err).await;
            return;
        }
    };
    debug!(node = %node.name, "node fetched");

    let running = match m
        .timed_node("get_running_allocs", &node.name, running_allocations(scrape, &node))
        .await
    {
        Ok(allocs) => allocs,
        Err(err) => {
            m.report(&err).await;
            return;
        }
    };

    let (allocated_cpu, allocated_memory_mb) = running.iter().fold((0u64, 0u64), |(cpu, mem), a| {
        (cpu + a.resources.cpu, mem + a.resources.memory_mb)
    });

    let labels: &[&str] = &[&node.name, &node.datacenter];
    let res = &node.resources;
    scrape.emit(&m.node.resource_memory, res.memory_mb as f64 * MIB, labels);
    scrape.emit(&m.node.allocated_memory, allocated_memory_mb as f64 * MIB, labels);
    scrape.emit(&m.node.allocated_cpu, allocated_cpu as f64, labels);
    scrape.emit(&m.node.resource_cpu, res.cpu as f64, labels);
    scrape.emit(&m.node.resource_iops, res.iops as f64, labels);
    scrape.emit(&m.node.resource_disk, res.disk_mb as f64 * MIB, labels);

    let stats = match m
        .timed_node("get_stats", &node.name, client.node_stats(&node.id, scrape.opts))
        .await
    {
        Ok(stats) => stats,
        Err(e) => {
            let err = CollectError::client(format!("failed to get node {} stats", node.name), e);
            m.report(&err).await;
            return;
        }
    };
    debug!(node = %node.name, "fetched node stats");

    scrape.emit(&m.node.used_memory, stats.memory.used as f64, labels);
    scrape.emit(&m.node.used_cpu, stats.cpu_ticks_consumed.floor(), labels);
}

/// Allocations on a node whose client status is running.
async fn running_allocations<C: ControlPlane + ?Sized>(
    scrape: &Scrape<C>,
    node: &Node,
) -> CollectResult<Vec<Allocation>> {
    let allocs = scrape
        .client
        .node_allocations(&node.id, scrape.opts)
        .await
        .map_err(|e| {
            CollectError::client(format!("failed to get node {} running allocs", node.name), e)
        })?;
    Ok(allocs
        .into_iter()
        .filter(|a| a.client_status == ALLOC_CLIENT_RUNNING)
        .collect())
}
