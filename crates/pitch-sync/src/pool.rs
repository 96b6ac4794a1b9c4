//! Bounded worker pools.
//!
//! One abstraction serves every phase: each work item is spawned onto a
//! JoinSet behind a semaphore and results are collected as workers finish.
//! Completion order is not submission order; callers that need ordering
//! carry an index through the result.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

/// Run `f` over every item with at most `limit` workers in flight.
///
/// A worker that panics is logged and dropped; siblings keep running.
pub async fn run_bounded<T, R, F, Fut>(
    limit: usize,
    items: impl IntoIterator<Item = T>,
    f: F,
) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let limit = Arc::new(Semaphore::new(limit.max(1)));
    let mut workers = JoinSet::new();
    for item in items {
        let limit = Arc::clone(&limit);
        let f = f.clone();
        workers.spawn(async move {
            let _permit = limit.acquire_owned().await.expect("semaphore not closed");
            f(item).await
        });
    }

    let mut results = Vec::with_capacity(workers.len());
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(err) => warn!(error = %err, "worker task failed; siblings continue"),
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_item_produces_a_result() {
        let results = run_bounded(3, 0..20, |n: i32| async move { n * 2 }).await;
        assert_eq!(results.len(), 20);
        let mut sorted = results.clone();
        sorted.sort();
        assert_eq!(sorted, (0..20).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn in_flight_workers_never_exceed_the_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let counters = (in_flight.clone(), peak.clone());
        run_bounded(2, 0..16, move |_n: i32| {
            let (in_flight, peak) = counters.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn a_panicking_worker_does_not_cancel_siblings() {
        let results = run_bounded(4, 0..8, |n: i32| async move {
            if n == 3 {
                panic!("malformed item");
            }
            n
        })
        .await;
        assert_eq!(results.len(), 7);
        assert!(!results.contains(&3));
    }
}
