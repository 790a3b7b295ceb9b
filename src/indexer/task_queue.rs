//! Deduplicating, key ordered queue in front of the worker pool
//!
//! Pending tasks are keyed by (file, project part). Submitting a key again
//! replaces the pending task, and dispatch always takes the lowest keys first,
//! which makes dispatch order reproducible even though completion order is not.
//! The queue forgets a task once it is handed to the scheduler.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::indexer::progress::ProgressCounter;
use crate::indexer::scheduler::WorkerScheduler;
use crate::indexer::task::{SymbolIndexerTask, TaskKey, WorkerTask};
use crate::project::ProjectPartId;

pub struct SymbolIndexerTaskQueue {
    pending: BTreeMap<TaskKey, SymbolIndexerTask>,
    scheduler: Arc<dyn WorkerScheduler>,
    progress: Arc<ProgressCounter>,
}

impl SymbolIndexerTaskQueue {
    pub fn new(scheduler: Arc<dyn WorkerScheduler>, progress: Arc<ProgressCounter>) -> Self {
        Self {
            pending: BTreeMap::new(),
            scheduler,
            progress,
        }
    }

    /// Insert new keys and replace the pending task of known ones
    ///
    /// Only new keys grow the progress total.
    pub fn add_or_update_tasks(&mut self, tasks: Vec<SymbolIndexerTask>) {
        let mut added = 0u64;
        for task in tasks {
            if self.pending.insert(task.key(), task).is_none() {
                added += 1;
            }
        }
        debug!(
            "SymbolIndexerTaskQueue: {} new tasks, {} pending",
            added,
            self.pending.len()
        );
        self.progress.add_total(added);
    }

    /// Drop every pending task of the given project parts
    pub fn remove_tasks(&mut self, project_part_ids: &[ProjectPartId]) {
        let before = self.pending.len();
        self.pending
            .retain(|(_, project_part_id), _| !project_part_ids.contains(project_part_id));
        let removed = before - self.pending.len();
        debug!("SymbolIndexerTaskQueue: removed {} pending tasks", removed);
        self.progress.remove_total(removed as u64);
    }

    /// Hand as many of the lowest keyed tasks to the scheduler as it has free slots
    pub fn process_entries(&mut self) {
        let free = self.scheduler.slot_usage().free();
        let count = free.min(self.pending.len());
        if count == 0 {
            return;
        }

        let mut dispatched = Vec::with_capacity(count);
        while dispatched.len() < count {
            let Some((_, task)) = self.pending.pop_first() else {
                break;
            };
            dispatched.push(WorkerTask::Index(task));
        }

        debug!(
            "SymbolIndexerTaskQueue: dispatching {} tasks, {} left",
            dispatched.len(),
            self.pending.len()
        );
        self.scheduler.add_tasks(dispatched);
    }

    /// Pending tasks in dispatch order
    pub fn tasks(&self) -> impl Iterator<Item = &SymbolIndexerTask> {
        self.pending.values()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Forget all pending work and reset the progress counters
    pub fn clear(&mut self) {
        self.pending.clear();
        self.progress.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FilePathId;
    use crate::indexer::progress::Progress;
    use crate::indexer::scheduler::{MockWorkerScheduler, SlotUsage};
    use crate::indexer::testing::RecordingScheduler;

    fn task(file: u32, part: u32) -> SymbolIndexerTask {
        SymbolIndexerTask::new(FilePathId(file), ProjectPartId(part), Arc::new(Vec::new()))
    }

    fn keyed(file: u32, part: u32) -> TaskKey {
        (FilePathId(file), ProjectPartId(part))
    }

    fn queue(
        scheduler: Arc<RecordingScheduler>,
    ) -> (SymbolIndexerTaskQueue, Arc<ProgressCounter>) {
        let progress = Arc::new(ProgressCounter::new());
        (
            SymbolIndexerTaskQueue::new(scheduler, Arc::clone(&progress)),
            progress,
        )
    }

    fn pending_keys(queue: &SymbolIndexerTaskQueue) -> Vec<TaskKey> {
        queue.tasks().map(SymbolIndexerTask::key).collect()
    }

    fn dispatched_keys(scheduler: &RecordingScheduler) -> Vec<TaskKey> {
        scheduler
            .tasks()
            .into_iter()
            .map(|task| match task {
                WorkerTask::Index(task) => task.key(),
                other => panic!("unexpected task {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_resubmission_replaces_pending_task() {
        let (mut queue, progress) = queue(Arc::new(RecordingScheduler::new(4)));

        queue.add_or_update_tasks(vec![task(1, 1), task(3, 1), task(5, 1)]);
        let mut replacement = task(3, 1);
        replacement.arguments = Arc::new(vec!["-DNEW".to_string()]);
        queue.add_or_update_tasks(vec![task(2, 1), replacement]);

        assert_eq!(
            pending_keys(&queue),
            vec![keyed(1, 1), keyed(2, 1), keyed(3, 1), keyed(5, 1)]
        );
        let replaced = queue.tasks().find(|t| t.key() == keyed(3, 1)).unwrap();
        assert_eq!(replaced.arguments.as_slice(), ["-DNEW".to_string()]);
        assert_eq!(progress.progress(), Progress { done: 0, total: 4 });
    }

    #[test]
    fn test_keys_stay_unique_and_sorted() {
        let (mut queue, _) = queue(Arc::new(RecordingScheduler::new(4)));

        queue.add_or_update_tasks(vec![task(4, 2), task(4, 1), task(1, 9), task(4, 2)]);
        queue.add_or_update_tasks(vec![task(1, 9), task(0, 3)]);

        assert_eq!(
            pending_keys(&queue),
            vec![keyed(0, 3), keyed(1, 9), keyed(4, 1), keyed(4, 2)]
        );
    }

    #[test]
    fn test_dispatch_respects_free_slots() {
        let scheduler = Arc::new(RecordingScheduler::new(2));
        let (mut queue, _) = queue(Arc::clone(&scheduler));
        queue.add_or_update_tasks(vec![task(3, 1), task(1, 1), task(2, 1)]);

        queue.process_entries();

        assert_eq!(dispatched_keys(&scheduler), vec![keyed(1, 1), keyed(2, 1)]);
        assert_eq!(pending_keys(&queue), vec![keyed(3, 1)]);
    }

    #[test]
    fn test_dispatch_accounts_for_busy_slots() {
        let scheduler = Arc::new(RecordingScheduler::new(3).with_in_use(2));
        let (mut queue, _) = queue(Arc::clone(&scheduler));
        queue.add_or_update_tasks(vec![task(1, 1), task(2, 1)]);

        queue.process_entries();
        assert_eq!(dispatched_keys(&scheduler), vec![keyed(1, 1)]);

        queue.process_entries();
        assert_eq!(scheduler.batches().len(), 1, "no slot left, nothing added");

        scheduler.finish_all();
        queue.process_entries();
        assert_eq!(dispatched_keys(&scheduler), vec![keyed(1, 1), keyed(2, 1)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_whole_queue_moves_when_slots_suffice() {
        let scheduler = Arc::new(RecordingScheduler::new(8));
        let (mut queue, _) = queue(Arc::clone(&scheduler));
        queue.add_or_update_tasks(vec![task(1, 1), task(2, 1), task(3, 1)]);

        queue.process_entries();

        assert_eq!(scheduler.batches().len(), 1);
        assert_eq!(scheduler.tasks().len(), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_remove_tasks_of_project_parts() {
        let (mut queue, progress) = queue(Arc::new(RecordingScheduler::new(1)));
        queue.add_or_update_tasks(vec![task(1, 1), task(2, 2), task(3, 1), task(4, 3)]);

        queue.remove_tasks(&[ProjectPartId(1), ProjectPartId(3)]);

        assert_eq!(pending_keys(&queue), vec![keyed(2, 2)]);
        assert_eq!(progress.progress(), Progress { done: 0, total: 1 });
    }

    #[test]
    fn test_clear_resets_progress() {
        let (mut queue, progress) = queue(Arc::new(RecordingScheduler::new(1)));
        queue.add_or_update_tasks(vec![task(1, 1)]);

        queue.clear();

        assert!(queue.is_empty());
        assert_eq!(progress.progress(), Progress::default());
    }

    #[test]
    fn test_slot_usage_queried_before_dispatch() {
        let mut scheduler = MockWorkerScheduler::new();
        scheduler
            .expect_slot_usage()
            .times(1)
            .returning(|| SlotUsage::new(2, 1));
        scheduler
            .expect_add_tasks()
            .withf(|tasks| tasks.len() == 1)
            .times(1)
            .return_const(());
        let mut queue =
            SymbolIndexerTaskQueue::new(Arc::new(scheduler), Arc::new(ProgressCounter::new()));
        queue.add_or_update_tasks(vec![task(1, 1), task(2, 1)]);

        queue.process_entries();

        assert_eq!(queue.len(), 1);
    }
}
