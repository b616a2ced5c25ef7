//! Deployment counts and per task group rollout progress.

use gridwatch_client::ControlPlane;

use crate::error::{CollectError, CollectResult};
use crate::scrape::Scrape;

pub async fn collect_deployments<C: ControlPlane + ?Sized>(
    scrape: &Scrape<C>,
) -> CollectResult<()> {
    let m = &scrape.metrics;
    let groups = &m.deployment_task_groups;
    m.deployments.reset().await;
    for gauge in groups.all() {
        gauge.reset().await;
    }

    if !scrape.should_read {
        return Ok(());
    }

    let deployments = scrape
        .client
        .list_deployments(scrape.opts)
        .await
        .map_err(|e| CollectError::client("could not get deployments", e))?;

    for dep in &deployments {
        let job_version = dep.job_version.to_string();
        m.deployments
            .inc(&[&dep.status, &dep.job_id, &job_version])
            .await;

        for (name, tg) in &dep.task_groups {
            let promoted = tg.promoted.to_string();
            let auto_revert = tg.auto_revert.to_string();
            let labels: &[&str] = &[
                &dep.status,
                &dep.job_id,
                &job_version,
                name,
                &promoted,
                &auto_revert,
            ];
            groups.desired_canaries.set(labels, tg.desired_canaries as f64).await;
            groups.desired_total.set(labels, tg.desired_total as f64).await;
            groups.placed_allocs.set(labels, tg.placed_allocs as f64).await;
            groups.healthy_allocs.set(labels, tg.healthy_allocs as f64).await;
            groups.unhealthy_allocs.set(labels, tg.unhealthy_allocs as f64).await;
        }
    }

    m.deployments.collect(&scrape.sink).await;
    for gauge in groups.all() {
        gauge.collect(&scrape.sink).await;
    }
    Ok(())
}
