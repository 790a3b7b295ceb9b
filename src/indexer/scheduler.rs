//! Bounded worker pool
//!
//! Queues only ever talk to a [`WorkerScheduler`]: they ask how many slots are
//! free and hand over at most that many tasks. [`TaskScheduler`] runs each task
//! on the tokio runtime through a [`TaskExecutor`], reports completion to the
//! shared [`ProgressCounter`] and signals every freed slot so the driver can
//! refill it.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::{Notify, mpsc};
use tracing::{debug, error, trace, warn};

use crate::indexer::progress::ProgressCounter;
use crate::indexer::task::WorkerTask;

// ============================================================================
// Scheduler Interface
// ============================================================================

/// Capacity of a worker pool and how much of it is busy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SlotUsage {
    pub capacity: usize,
    pub in_use: usize,
}

impl SlotUsage {
    pub fn new(capacity: usize, in_use: usize) -> Self {
        Self { capacity, in_use }
    }

    pub fn free(&self) -> usize {
        self.capacity.saturating_sub(self.in_use)
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait WorkerScheduler: Send + Sync {
    fn slot_usage(&self) -> SlotUsage;

    /// Start the given tasks; callers never pass more than the free slots
    fn add_tasks(&self, tasks: Vec<WorkerTask>);
}

// ============================================================================
// Task Execution
// ============================================================================

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task failed: {reason}")]
    Failed { reason: String },
}

/// Runs one dispatched task to completion
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: WorkerTask) -> Result<(), ExecutionError>;
}

// ============================================================================
// TaskScheduler
// ============================================================================

/// Worker pool on the tokio runtime
///
/// Must be used from within a runtime: every task is a spawned future.
pub struct TaskScheduler {
    capacity: usize,
    in_use: Arc<AtomicUsize>,
    failures: Arc<AtomicUsize>,
    executor: Arc<dyn TaskExecutor>,
    progress: Arc<ProgressCounter>,
    slot_freed: mpsc::UnboundedSender<()>,
    idle: Arc<Notify>,
}

impl TaskScheduler {
    /// Create a scheduler and the receiver signalled once per finished task
    pub fn new(
        capacity: usize,
        executor: Arc<dyn TaskExecutor>,
        progress: Arc<ProgressCounter>,
    ) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (slot_freed, slot_freed_receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            capacity,
            in_use: Arc::new(AtomicUsize::new(0)),
            failures: Arc::new(AtomicUsize::new(0)),
            executor,
            progress,
            slot_freed,
            idle: Arc::new(Notify::new()),
        };
        (scheduler, slot_freed_receiver)
    }

    /// Resolve once no task is running
    pub async fn wait_for_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.in_use.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Number of tasks whose executor returned an error
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

impl WorkerScheduler for TaskScheduler {
    fn slot_usage(&self) -> SlotUsage {
        SlotUsage::new(self.capacity, self.in_use.load(Ordering::SeqCst))
    }

    fn add_tasks(&self, tasks: Vec<WorkerTask>) {
        let usage = self.slot_usage();
        if tasks.len() > usage.free() {
            warn!(
                "TaskScheduler: {} tasks added with only {} free slots",
                tasks.len(),
                usage.free()
            );
        }
        debug!("TaskScheduler: starting {} tasks", tasks.len());

        for task in tasks {
            self.in_use.fetch_add(1, Ordering::SeqCst);

            let executor = Arc::clone(&self.executor);
            let progress = Arc::clone(&self.progress);
            let in_use = Arc::clone(&self.in_use);
            let failures = Arc::clone(&self.failures);
            let idle = Arc::clone(&self.idle);
            let slot_freed = self.slot_freed.clone();

            tokio::spawn(async move {
                let name = task.name();
                // Run the executor as its own task so a panic surfaces as a JoinError
                // and the slot below is still released
                let outcome = tokio::spawn(async move { executor.execute(task).await }).await;
                match outcome {
                    Ok(Ok(())) => trace!("TaskScheduler: {} task finished", name),
                    Ok(Err(e)) => {
                        warn!("TaskScheduler: {} task failed: {}", name, e);
                        failures.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        error!("TaskScheduler: {} task aborted: {}", name, e);
                        failures.fetch_add(1, Ordering::SeqCst);
                    }
                }

                progress.add_progress(1);
                if in_use.fetch_sub(1, Ordering::SeqCst) == 1 {
                    idle.notify_waiters();
                }
                // The driver may already be gone
                let _ = slot_freed.send(());
            });
        }
    }
}
