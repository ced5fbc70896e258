use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

const MAX_FAN_OUT: usize = 64;

pub(crate) fn clamp_fan_out(limit: usize) -> usize {
    limit.clamp(1, MAX_FAN_OUT)
}

/// Runs `task` over every item with at most `limit` in flight.
///
/// The output is index-aligned with `items` regardless of completion order.
/// Failures are not short-circuited: when `R` is a `Result`, each slot
/// carries its own outcome and the caller decides whether to mask or
/// propagate it.
pub async fn bounded_map<T, R, F, Fut>(items: Vec<T>, limit: usize, task: F) -> Vec<R>
where
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = R>,
{
    let semaphore = Arc::new(Semaphore::new(clamp_fan_out(limit)));
    let futures = items.into_iter().enumerate().map(|(index, item)| {
        let semaphore = Arc::clone(&semaphore);
        let work = task(index, item);
        async move {
            // The semaphore is local and never closed; a failed acquire
            // only means running without a permit.
            let _permit = semaphore.acquire_owned().await.ok();
            work.await
        }
    });
    join_all(futures).await
}
