//! Bounded fan-out of per-entity work.
//!
//! Every work item is spawned immediately and receives a [`Bound`]; it
//! acquires a permit from it before the part of its work that talks to the
//! control plane. At most `limit` items hold a permit at once.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::error;

use crate::error::{CollectError, CollectResult};

/// Shared concurrency ceiling handed to each work item.
#[derive(Debug, Clone)]
pub struct Bound {
    semaphore: Option<Arc<Semaphore>>,
}

impl Bound {
    /// Wait for a slot. The slot is released when the permit drops.
    /// Unbounded pools return `None` immediately.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        match &self.semaphore {
            Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
            None => None,
        }
    }
}

/// Spawned work items joined by [`FanOut::join`].
pub struct FanOut {
    bound: Bound,
    tasks: JoinSet<()>,
}

impl FanOut {
    /// A pool running at most `limit` items concurrently. 0 is unbounded.
    pub fn new(limit: usize) -> Self {
        let semaphore = (limit > 0).then(|| Arc::new(Semaphore::new(limit)));
        Self {
            bound: Bound { semaphore },
            tasks: JoinSet::new(),
        }
    }

    pub fn spawn<F, Fut>(&mut self, work: F)
    where
        F: FnOnce(Bound) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(work(self.bound.clone()));
    }

    /// Number of items not yet joined.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every item. A panicked item does not stop the others from
    /// being awaited; the first such failure is returned afterwards.
    pub async fn join(mut self) -> CollectResult<()> {
        let mut first: Option<CollectError> = None;
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "fan-out task failed");
                first.get_or_insert(CollectError::Join(e));
            }
        }
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn run(limit: usize, items: usize) -> (usize, usize) {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        let mut pool = FanOut::new(limit);
        for _ in 0..items {
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            let done = Arc::clone(&done);
            pool.spawn(move |bound| async move {
                let _permit = bound.acquire().await;
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(pool.len(), items);
        pool.join().await.unwrap();
        (peak.load(Ordering::SeqCst), done.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn bound_is_a_ceiling() {
        let (peak, done) = run(3, 12).await;
        assert!(peak <= 3, "peak {peak} exceeded bound");
        assert_eq!(done, 12);
    }

    #[tokio::test]
    async fn zero_is_unbounded() {
        let (peak, done) = run(0, 8).await;
        assert_eq!(done, 8);
        assert!(peak > 3);
    }

    #[tokio::test]
    async fn panicked_item_is_reported_after_others_finish() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut pool = FanOut::new(2);
        pool.spawn(|_| async { panic!("boom") });
        for _ in 0..4 {
            let done = Arc::clone(&done);
            pool.spawn(move |_| async move {
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert!(matches!(pool.join().await, Err(CollectError::Join(_))));
        assert_eq!(done.load(Ordering::SeqCst), 4);
    }
}
