//! Evaluation counts by status.

use gridwatch_client::ControlPlane;

use crate::error::{CollectError, CollectResult};
use crate::scrape::Scrape;

pub async fn collect_evaluations<C: ControlPlane + ?Sized>(
    scrape: &Scrape<C>,
) -> CollectResult<()> {
    let evals = &scrape.metrics.evals;
    evals.reset().await;

    if !scrape.should_read {
        return Ok(());
    }

    let list = scrape
        .client
        .list_evaluations(scrape.opts)
        .await
        .map_err(|e| CollectError::client("could not get evaluation metrics", e))?;
    for eval in &list {
        evals.inc(&[&eval.status]).await;
    }

    evals.collect(&scrape.sink).await;
    Ok(())
}
