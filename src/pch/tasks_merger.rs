//! Hand generated task sets to the PCH queue

use tracing::debug;

use crate::error::PipelineError;
use crate::pch::task::PchTaskSet;
use crate::pch::task_queue::PchTaskQueueTrait;
use crate::project::ProjectPartId;

/// Splits task sets into their system and project halves
///
/// Both halves keep submission order. The system half always reaches the
/// queue first; collapsing identical content is left to the queue.
pub struct PchTasksMerger;

impl PchTasksMerger {
    pub fn merge_tasks<Q>(queue: &mut Q, task_sets: Vec<PchTaskSet>) -> Result<(), PipelineError>
    where
        Q: PchTaskQueueTrait + ?Sized,
    {
        let (system_tasks, project_tasks): (Vec<_>, Vec<_>) = task_sets
            .into_iter()
            .map(|set| (set.system, set.project))
            .unzip();
        debug!(
            "PchTasksMerger: handing over {} system and {} project tasks",
            system_tasks.len(),
            project_tasks.len()
        );

        queue.add_system_pch_tasks(system_tasks)?;
        queue.add_project_pch_tasks(project_tasks)?;
        queue.process_entries();
        Ok(())
    }

    pub fn remove_tasks<Q>(queue: &mut Q, project_part_ids: &[ProjectPartId])
    where
        Q: PchTaskQueueTrait + ?Sized,
    {
        queue.remove_pch_tasks(project_part_ids);
    }
}
