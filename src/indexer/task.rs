//! Work handed to the worker pool

use serde::Serialize;
use std::sync::Arc;

use crate::cache::FilePathId;
use crate::pch::{PchKind, PchTask};
use crate::project::ProjectPartId;

/// Queue key of a symbol indexer task
pub type TaskKey = (FilePathId, ProjectPartId);

/// Index the symbols of one source file under one project part
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolIndexerTask {
    pub file_path_id: FilePathId,
    pub project_part_id: ProjectPartId,
    /// Compile arguments of the project part, shared by all its tasks
    #[serde(skip)]
    pub arguments: Arc<Vec<String>>,
}

impl SymbolIndexerTask {
    pub fn new(
        file_path_id: FilePathId,
        project_part_id: ProjectPartId,
        arguments: Arc<Vec<String>>,
    ) -> Self {
        Self {
            file_path_id,
            project_part_id,
            arguments,
        }
    }

    pub fn key(&self) -> TaskKey {
        (self.file_path_id, self.project_part_id)
    }
}

/// Build one precompiled header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PchJob {
    pub kind: PchKind,
    pub task: PchTask,
}

impl PchJob {
    pub fn new(kind: PchKind, task: PchTask) -> Self {
        Self { kind, task }
    }
}

/// Every kind of work a worker can run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerTask {
    Index(SymbolIndexerTask),
    BuildPch(PchJob),
}

impl WorkerTask {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerTask::Index(_) => "index",
            WorkerTask::BuildPch(job) => match job.kind {
                PchKind::System => "system-pch",
                PchKind::Project => "project-pch",
            },
        }
    }
}
