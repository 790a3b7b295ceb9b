//! Scheduler double for queue tests

use parking_lot::Mutex;

use crate::indexer::scheduler::{SlotUsage, WorkerScheduler};
use crate::indexer::task::WorkerTask;

/// Scheduler with a fixed slot usage that records every handed over task
///
/// Added tasks count as running until [`RecordingScheduler::finish_all`].
pub struct RecordingScheduler {
    capacity: usize,
    in_use: Mutex<usize>,
    added: Mutex<Vec<Vec<WorkerTask>>>,
}

impl RecordingScheduler {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            in_use: Mutex::new(0),
            added: Mutex::new(Vec::new()),
        }
    }

    pub fn with_in_use(self, in_use: usize) -> Self {
        *self.in_use.lock() = in_use;
        self
    }

    /// Every `add_tasks` call, in call order
    pub fn batches(&self) -> Vec<Vec<WorkerTask>> {
        self.added.lock().clone()
    }

    pub fn tasks(&self) -> Vec<WorkerTask> {
        self.added.lock().iter().flatten().cloned().collect()
    }

    pub fn finish_all(&self) {
        *self.in_use.lock() = 0;
    }
}

impl WorkerScheduler for RecordingScheduler {
    fn slot_usage(&self) -> SlotUsage {
        SlotUsage::new(self.capacity, *self.in_use.lock())
    }

    fn add_tasks(&self, tasks: Vec<WorkerTask>) {
        *self.in_use.lock() += tasks.len();
        self.added.lock().push(tasks);
    }
}
