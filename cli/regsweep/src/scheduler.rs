//! Bounded-concurrency fetch scheduler.
//!
//! Runs up to N index fetches at a time; excess submissions queue in
//! submission order behind a fair semaphore. On abort, queued tasks are
//! dropped without running while in-flight tasks run to their own next
//! checkpoint. [`FetchPool::join`] resolves once every submitted task has
//! completed or been dropped.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use regsweep_cancel::Abort;

/// Fixed-size pool of fetch tasks wired to the run's abort signal.
pub struct FetchPool {
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<()>,
    abort: Abort,
}

impl FetchPool {
    /// Create a pool admitting at most `concurrency` tasks at a time.
    pub fn new(concurrency: usize, abort: Abort) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            tasks: JoinSet::new(),
            abort,
        }
    }

    /// Submit a task. It starts once a permit frees up, unless the run is
    /// aborted first, in which case it is dropped without running.
    pub fn submit<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        let abort = self.abort.clone();
        self.tasks.spawn(async move {
            let _permit = tokio::select! {
                permit = semaphore.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
                _ = abort.cancelled() => return,
            };
            if abort.is_aborted() {
                return;
            }
            task.await;
        });
    }

    /// Number of tasks still queued or running.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every submitted task to complete or be dropped.
    pub async fn join(&mut self) {
        while self.tasks.join_next().await.is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let abort = Abort::new();
        let mut pool = FetchPool::new(2, abort);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        pool.join().await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_abort_drops_queued_tasks() {
        let abort = Abort::new();
        let mut pool = FetchPool::new(1, abort.clone());
        let started = Arc::new(AtomicUsize::new(0));

        // First task holds the only permit, then aborts the run; the
        // queued tasks must never start.
        {
            let started = Arc::clone(&started);
            let abort = abort.clone();
            pool.submit(async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                abort.abort("stop");
            });
        }
        for _ in 0..5 {
            let started = Arc::clone(&started);
            pool.submit(async move {
                started.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.join().await;

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert!(abort.is_aborted());
    }

    #[tokio::test]
    async fn test_join_on_empty_pool() {
        let mut pool = FetchPool::new(4, Abort::new());
        pool.join().await;
        assert!(pool.is_empty());
    }
}
