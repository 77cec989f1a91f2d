//! Batched execution of async tasks.
//!
//! Placing a large structure would otherwise create one in-flight future per
//! block at once. A [`BatchedExecutor`] queues tasks and releases them in
//! groups of at most `batch_size`, pausing between groups.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, join_all};

/// Tuning for a [`BatchedExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum number of tasks in flight at once. Zero is treated as one.
    pub batch_size: usize,
    /// Pause between batches.
    pub interval: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            interval: Duration::from_millis(5),
        }
    }
}

/// Queue of tasks released in bounded batches.
pub struct BatchedExecutor<'a, T> {
    config: BatchConfig,
    queue: VecDeque<BoxFuture<'a, T>>,
}

impl<'a, T> BatchedExecutor<'a, T> {
    #[must_use]
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
        }
    }

    /// Queue a task. It does not start until [`run`](Self::run).
    pub fn submit(&mut self, task: impl Future<Output = T> + Send + 'a) {
        self.queue.push_back(task.boxed());
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Run every queued task, one batch at a time.
    ///
    /// Tasks within a batch run concurrently; a batch must finish before the
    /// next starts. Outputs are returned in submission order.
    pub async fn run(&mut self) -> Vec<T> {
        let batch_size = self.config.batch_size.max(1);
        let mut outputs = Vec::with_capacity(self.queue.len());
        let mut batch_index = 0_usize;

        while !self.queue.is_empty() {
            let take = batch_size.min(self.queue.len());
            let batch: Vec<_> = self.queue.drain(..take).collect();
            tracing::debug!(
                batch = batch_index,
                size = take,
                remaining = self.queue.len(),
                "running batch"
            );

            outputs.extend(join_all(batch).await);
            batch_index += 1;

            if !self.queue.is_empty() && !self.config.interval.is_zero() {
                tokio::time::sleep(self.config.interval).await;
            }
        }
        outputs
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_in_flight_never_exceeds_batch_size() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut executor = BatchedExecutor::new(BatchConfig {
            batch_size: 4,
            interval: Duration::from_millis(1),
        });

        for i in 0..10 {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            executor.submit(async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                i
            });
        }
        assert_eq!(executor.pending(), 10);

        let outputs = executor.run().await;
        assert_eq!(outputs, (0..10).collect::<Vec<_>>());
        assert_eq!(peak.load(Ordering::SeqCst), 4);
        assert_eq!(executor.pending(), 0);
    }

    #[tokio::test]
    async fn test_zero_batch_size_still_progresses() {
        let mut executor = BatchedExecutor::new(BatchConfig {
            batch_size: 0,
            interval: Duration::ZERO,
        });
        executor.submit(async { 1 });
        executor.submit(async { 2 });
        assert_eq!(executor.run().await, vec![1, 2]);
    }
}
