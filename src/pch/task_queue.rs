//! Pending precompiled header work
//!
//! Keeps one list of system and one list of project tasks. A new task first
//! takes its project parts away from every pending task of the same kind, so a
//! part is never served by two pending headers, and is then folded into a
//! pending task with identical content when there is one. System tasks are
//! always dispatched before project tasks.

use std::sync::Arc;
use tracing::debug;

use crate::error::PipelineError;
use crate::indexer::{PchJob, ProgressCounter, WorkerScheduler, WorkerTask};
use crate::pch::task::{PchKind, PchTask};
use crate::project::ProjectPartId;

#[cfg_attr(test, mockall::automock)]
pub trait PchTaskQueueTrait: Send {
    fn add_system_pch_tasks(&mut self, tasks: Vec<PchTask>) -> Result<(), PipelineError>;
    fn add_project_pch_tasks(&mut self, tasks: Vec<PchTask>) -> Result<(), PipelineError>;
    fn remove_pch_tasks(&mut self, project_part_ids: &[ProjectPartId]);
    fn process_entries(&mut self);
}

pub struct PchTaskQueue {
    system_tasks: Vec<PchTask>,
    project_tasks: Vec<PchTask>,
    scheduler: Arc<dyn WorkerScheduler>,
    progress: Arc<ProgressCounter>,
}

impl PchTaskQueue {
    pub fn new(scheduler: Arc<dyn WorkerScheduler>, progress: Arc<ProgressCounter>) -> Self {
        Self {
            system_tasks: Vec::new(),
            project_tasks: Vec::new(),
            scheduler,
            progress,
        }
    }

    pub fn system_tasks(&self) -> &[PchTask] {
        &self.system_tasks
    }

    pub fn project_tasks(&self) -> &[PchTask] {
        &self.project_tasks
    }

    pub fn is_empty(&self) -> bool {
        self.system_tasks.is_empty() && self.project_tasks.is_empty()
    }

    fn add_tasks(
        pending: &mut Vec<PchTask>,
        tasks: Vec<PchTask>,
        progress: &ProgressCounter,
    ) -> Result<(), PipelineError> {
        for mut task in tasks {
            if task.project_part_ids.is_empty() {
                return Err(PipelineError::invariant(
                    "PCH task without project parts",
                ));
            }
            task.project_part_ids.sort();
            task.project_part_ids.dedup();

            let before = pending.len();
            remove_project_parts(pending, &task.project_part_ids);

            match pending.iter_mut().find(|existing| existing.is_mergeable(&task)) {
                Some(existing) => existing.merge(task),
                None => pending.push(task),
            }

            let after = pending.len();
            if after > before {
                progress.add_total((after - before) as u64);
            } else {
                progress.remove_total((before - after) as u64);
            }
        }
        Ok(())
    }

    fn dispatch(pending: &mut Vec<PchTask>, kind: PchKind, count: usize) -> Vec<WorkerTask> {
        let count = count.min(pending.len());
        pending
            .drain(..count)
            .map(|task| WorkerTask::BuildPch(PchJob::new(kind, task)))
            .collect()
    }
}

/// Take the parts away from pending tasks and drop tasks left serving nobody
fn remove_project_parts(pending: &mut Vec<PchTask>, ids: &[ProjectPartId]) {
    for task in pending.iter_mut() {
        task.project_part_ids.retain(|id| !ids.contains(id));
    }
    pending.retain(|task| !task.project_part_ids.is_empty());
}

impl PchTaskQueueTrait for PchTaskQueue {
    fn add_system_pch_tasks(&mut self, tasks: Vec<PchTask>) -> Result<(), PipelineError> {
        debug!("PchTaskQueue: adding {} system tasks", tasks.len());
        Self::add_tasks(&mut self.system_tasks, tasks, &self.progress)
    }

    fn add_project_pch_tasks(&mut self, tasks: Vec<PchTask>) -> Result<(), PipelineError> {
        debug!("PchTaskQueue: adding {} project tasks", tasks.len());
        Self::add_tasks(&mut self.project_tasks, tasks, &self.progress)
    }

    fn remove_pch_tasks(&mut self, project_part_ids: &[ProjectPartId]) {
        let before = self.system_tasks.len() + self.project_tasks.len();
        remove_project_parts(&mut self.system_tasks, project_part_ids);
        remove_project_parts(&mut self.project_tasks, project_part_ids);
        let removed = before - self.system_tasks.len() - self.project_tasks.len();
        self.progress.remove_total(removed as u64);
    }

    /// Dispatch system tasks first; project tasks only once none is pending
    fn process_entries(&mut self) {
        let free = self.scheduler.slot_usage().free();
        let mut tasks = Self::dispatch(&mut self.system_tasks, PchKind::System, free);
        if self.system_tasks.is_empty() {
            let left = free - tasks.len();
            tasks.extend(Self::dispatch(&mut self.project_tasks, PchKind::Project, left));
        }
        if tasks.is_empty() {
            return;
        }

        debug!(
            "PchTaskQueue: dispatching {} tasks, {} system and {} project left",
            tasks.len(),
            self.system_tasks.len(),
            self.project_tasks.len()
        );
        self.scheduler.add_tasks(tasks);
    }
}
