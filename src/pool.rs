use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::error;

/// Counters observed by the pool over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub peak_in_flight: usize,
}

/// A held concurrency slot. Dropping it decrements the in-flight count
/// before the semaphore permit is returned.
struct Slot {
    running: Arc<AtomicUsize>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bounded worker pool. At most `concurrency` tasks run at once; every
/// finished task sends its output to the completion channel, in finish order.
pub struct WorkerPool<T> {
    sem: Arc<Semaphore>,
    set: JoinSet<()>,
    done_tx: mpsc::UnboundedSender<T>,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    submitted: u64,
    failed: u64,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn new(concurrency: usize, done_tx: mpsc::UnboundedSender<T>) -> Self {
        Self {
            sem: Arc::new(Semaphore::new(concurrency.max(1))),
            set: JoinSet::new(),
            done_tx,
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            submitted: 0,
            failed: 0,
        }
    }

    /// Wait for a free slot, then start `job`.
    pub async fn submit<F>(&mut self, job: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permit = self
            .sem
            .clone()
            .acquire_owned()
            .await
            .expect("pool semaphore is never closed");
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let slot = Slot {
            running: self.running.clone(),
            _permit: permit,
        };
        let done_tx = self.done_tx.clone();
        self.submitted += 1;

        self.set.spawn(async move {
            let output = job.await;
            let _ = done_tx.send(output);
            drop(slot);
        });

        // Reap what already finished so the set does not grow with the input.
        while let Some(res) = self.set.try_join_next() {
            self.reap(res);
        }
    }

    /// Number of tasks currently holding a slot.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Shared handle on the in-flight counter, for sampling from outside.
    pub fn running_counter(&self) -> Arc<AtomicUsize> {
        self.running.clone()
    }

    /// Wait until every submitted task has finished and handed over its output.
    pub async fn drain(mut self) -> PoolStats {
        while let Some(res) = self.set.join_next().await {
            self.reap(res);
        }
        PoolStats {
            submitted: self.submitted,
            completed: self.submitted - self.failed,
            failed: self.failed,
            peak_in_flight: self.peak.load(Ordering::SeqCst),
        }
    }

    fn reap(&mut self, res: Result<(), JoinError>) {
        if let Err(e) = res {
            self.failed += 1;
            error!(error = %e, "scan task aborted");
        }
    }
}
