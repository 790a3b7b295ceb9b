//! From project parts to PCH task sets
//!
//! For every project part: collect (or reuse) its build dependency, split it
//! with the [`UsedMacroFilter`] and describe one system and one project header.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::FilePathId;
use crate::dependencies::{BuildDependenciesProvider, BuildDependency};
use crate::error::PipelineError;
use crate::pch::task::{PchTask, PchTaskSet};
use crate::pch::task_queue::PchTaskQueueTrait;
use crate::pch::tasks_merger::PchTasksMerger;
use crate::pch::used_macro_filter::UsedMacroFilter;
use crate::project::{ProjectPart, ProjectPartId};

pub struct PchTaskGenerator {
    provider: BuildDependenciesProvider,
}

impl PchTaskGenerator {
    pub fn new(provider: BuildDependenciesProvider) -> Self {
        Self { provider }
    }

    /// Task sets for every part whose collection ran to completion, in input order
    pub fn generate(
        &mut self,
        project_parts: &[ProjectPart],
        cancellation: &CancellationToken,
    ) -> Vec<PchTaskSet> {
        let mut task_sets = Vec::with_capacity(project_parts.len());
        for project_part in project_parts {
            match self.provider.create(project_part, cancellation) {
                Some(dependency) => task_sets.push(task_set(project_part, &dependency)),
                None => debug!(
                    "PchTaskGenerator: {} cancelled, no tasks generated",
                    project_part.id
                ),
            }
        }
        info!(
            "PchTaskGenerator: generated {} task sets for {} project parts",
            task_sets.len(),
            project_parts.len()
        );
        task_sets
    }

    /// Generate task sets and hand them to the queue
    pub fn add_project_parts<Q>(
        &mut self,
        project_parts: &[ProjectPart],
        queue: &mut Q,
        cancellation: &CancellationToken,
    ) -> Result<(), PipelineError>
    where
        Q: PchTaskQueueTrait + ?Sized,
    {
        let task_sets = self.generate(project_parts, cancellation);
        PchTasksMerger::merge_tasks(queue, task_sets)
    }

    pub fn remove_project_parts<Q>(&mut self, ids: &[ProjectPartId], queue: &mut Q)
    where
        Q: PchTaskQueueTrait + ?Sized,
    {
        self.provider.remove_project_parts(ids);
        PchTasksMerger::remove_tasks(queue, ids);
    }

    pub fn provider(&self) -> &BuildDependenciesProvider {
        &self.provider
    }

    /// Forward file change notifications to the staleness check
    pub fn paths_changed(&mut self, ids: &[FilePathId]) {
        self.provider.paths_changed(ids);
    }
}

fn task_set(project_part: &ProjectPart, dependency: &BuildDependency) -> PchTaskSet {
    let filter = UsedMacroFilter::new(
        &dependency.includes,
        &dependency.used_macros,
        &project_part.compiler_macros,
    );

    let system = PchTask::new(
        project_part.id,
        filter.top_system_includes,
        filter.system_includes,
        filter.system_compiler_macros,
        filter.system_used_macros,
    );
    let project = PchTask::new(
        project_part.id,
        filter.top_project_includes,
        filter.project_includes,
        filter.project_compiler_macros,
        filter.project_used_macros,
    );
    PchTaskSet::new(system, project)
}
