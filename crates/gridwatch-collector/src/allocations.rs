//! Allocation and task tallies, and per-allocation resource usage.

use gridwatch_client::{
    ALLOC_CLIENT_RUNNING, ALLOC_DESIRED_RUN, AllocResourceUsage, Allocation, AllocationListStub,
    ControlPlane, NodeListStub,
};
use tracing::debug;

use crate::error::{CollectError, CollectResult};
use crate::pool::FanOut;
use crate::scrape::Scrape;
use crate::version;

const MIB: f64 = 1024.0 * 1024.0;

/// Reset the allocation accumulators and refill them from the current
/// allocation list. Usage gauges of running allocations go straight into
/// the scrape output.
pub async fn collect_allocations<C>(scrape: &Scrape<C>) -> CollectResult<()>
where
    C: ControlPlane + ?Sized + 'static,
{
    let m = &scrape.metrics;
    m.allocations.reset().await;
    m.tasks.reset().await;
    m.allocation_zombies.set(0.0);

    if !scrape.should_read {
        return Ok(());
    }

    let stubs = m
        .timed("get_allocations", scrape.client.list_allocations(scrape.opts))
        .await
        .map_err(|e| CollectError::client("could not get allocations", e))?;

    let mut pool = FanOut::new(scrape.config.allocation_concurrency);
    for stub in stubs {
        let scrape = scrape.clone();
        pool.spawn(move |bound| async move {
            let Some(node) = eligible_node(&scrape, &stub) else {
                return;
            };
            let _permit = bound.acquire().await;
            collect_allocation(&scrape, &stub, &node).await;
        });
    }
    pool.join().await?;

    m.allocations.collect(&scrape.sink).await;
    m.tasks.collect(&scrape.sink).await;
    m.allocation_zombies.collect(&scrape.sink);
    Ok(())
}

/// The node of an allocation worth fetching, counting orphans on the way.
fn eligible_node<C: ControlPlane + ?Sized>(
    scrape: &Scrape<C>,
    stub: &AllocationListStub,
) -> Option<NodeListStub> {
    let Some(node) = scrape.inventory.get(&stub.node_id) else {
        debug!(alloc = %stub.id, "allocation has no node associated, skipping");
        scrape.metrics.allocation_zombies.add(1.0);
        return None;
    };
    if !node.is_ready() {
        debug!(alloc = %stub.name, node = %node.name, status = %node.status, "skipping allocation on node that is not ready");
        return None;
    }
    if !version::supported(&node.name, &node.version) {
        debug!(alloc = %stub.name, node = %node.name, version = %node.version, "skipping allocation on unsupported node version");
        return None;
    }
    if stub.desired_status != ALLOC_DESIRED_RUN {
        debug!(alloc = %stub.name, "skipping allocation not desired to run");
        return None;
    }
    Some(node.clone())
}

async fn collect_allocation<C: ControlPlane + ?Sized>(
    scrape: &Scrape<C>,
    stub: &AllocationListStub,
    node: &NodeListStub,
) {
    let m = &scrape.metrics;

    let alloc = match m
        .timed("get_allocation_info", scrape.client.allocation_info(&stub.id, scrape.opts))
        .await
    {
        Ok(alloc) => alloc,
        Err(e) => {
            let err = CollectError::client(format!("failed to get allocation {} info", stub.id), e);
            m.report(&err).await;
            return;
        }
    };

    let job = &alloc.job;
    let job_version = job.version.to_string();
    m.allocations
        .inc(&[
            &alloc.client_status,
            &job.job_type,
            &alloc.job_id,
            &job_version,
            &alloc.task_group,
            &node.name,
        ])
        .await;
    for task in alloc.task_states.values() {
        m.tasks.inc(&[&task.state, &job.job_type, &node.name]).await;
    }

    if stub.client_status != ALLOC_CLIENT_RUNNING {
        return;
    }

    let stats = match m
        .timed_node(
            "get_allocation_stats",
            &node.name,
            scrape.client.allocation_stats(&alloc, scrape.opts),
        )
        .await
    {
        Ok(stats) => stats,
        Err(e) => {
            let err = CollectError::client(format!("failed to get allocation {} stats", alloc.id), e);
            m.report(&err).await;
            return;
        }
    };

    emit_usage(scrape, &alloc, node, &stats);
}

fn emit_usage<C: ControlPlane + ?Sized>(
    scrape: &Scrape<C>,
    alloc: &Allocation,
    node: &NodeListStub,
    stats: &AllocResourceUsage,
) {
    let g = &scrape.metrics.allocation;
    let job_version = alloc.job.version.to_string();
    let labels: Vec<&str> = vec![
        alloc.job.name.as_str(),
        job_version.as_str(),
        alloc.task_group.as_str(),
        alloc.id.as_str(),
        alloc.job.region.as_str(),
        node.datacenter.as_str(),
        node.name.as_str(),
    ];

    let usage = &stats.resource_usage;
    scrape.emit(&g.cpu_percent, usage.cpu_stats.percent, &labels);
    scrape.emit(&g.cpu_throttled, usage.cpu_stats.throttled_time as f64, &labels);
    scrape.emit(&g.memory_rss, usage.memory_stats.rss as f64, &labels);
    scrape.emit(&g.cpu_ticks, usage.cpu_stats.total_ticks, &labels);
    scrape.emit(&g.cpu_user_mode, usage.cpu_stats.user_mode, &labels);
    scrape.emit(&g.cpu_system_mode, usage.cpu_stats.system_mode, &labels);
    scrape.emit(&g.memory_required, alloc.resources.memory_mb as f64 * MIB, &labels);
    scrape.emit(&g.cpu_required, alloc.resources.cpu as f64, &labels);

    for (task, task_stats) in &stats.tasks {
        let mut task_labels = labels.clone();
        task_labels.push(task.as_str());
        let usage = &task_stats.resource_usage;
        scrape.emit(&g.task_cpu_percent, usage.cpu_stats.percent, &task_labels);
        scrape.emit(&g.task_cpu_total_ticks, usage.cpu_stats.total_ticks, &task_labels);
        scrape.emit(&g.task_memory_rss, usage.memory_stats.rss as f64, &task_labels);
    }
}
