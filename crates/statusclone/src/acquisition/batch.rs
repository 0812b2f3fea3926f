//! Bounded fan-out/fan-in in strict batches.
//!
//! Each batch is joined with settle-all semantics: every future in the batch
//! runs to completion (success or failure) before the next batch starts.

use futures::future::join_all;
use std::future::Future;

/// Run `f` over `items`, at most `batch_size` at a time, preserving input order
/// in the output.
pub async fn run_in_batches<T, R, F, Fut>(items: Vec<T>, batch_size: usize, mut f: F) -> Vec<R>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = R>,
{
    let batch_size = batch_size.max(1);
    let mut results = Vec::with_capacity(items.len());
    let mut iter = items.into_iter().peekable();

    while iter.peek().is_some() {
        let batch: Vec<Fut> = iter.by_ref().take(batch_size).map(&mut f).collect();
        results.extend(join_all(batch).await);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_peak_concurrency_is_bounded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = run_in_batches((0..12).collect(), 5, |i: u64| {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5 + (i % 3) * 5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                i * 2
            }
        })
        .await;

        assert_eq!(results, (0..12).map(|i| i * 2).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= 5);
    }

    #[tokio::test]
    async fn test_failures_do_not_stall_the_batch() {
        let results: Vec<Result<u32, String>> = run_in_batches(vec![1u32, 2, 3], 5, |i| async move {
            if i == 2 {
                Err("boom".to_string())
            } else {
                Ok(i)
            }
        })
        .await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[tokio::test]
    async fn test_next_batch_waits_for_previous() {
        let finished = Arc::new(AtomicUsize::new(0));
        let seen_at_start = run_in_batches((0..4).collect(), 2, |i: u64| {
            let finished = Arc::clone(&finished);
            async move {
                let before = finished.load(Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(if i == 0 { 20 } else { 1 })).await;
                finished.fetch_add(1, Ordering::SeqCst);
                before
            }
        })
        .await;
        // Items 2 and 3 start only after both of the first batch completed.
        assert_eq!(seen_at_start[2], 2);
        assert_eq!(seen_at_start[3], 2);
    }
}
