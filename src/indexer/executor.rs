//! Default task executor
//!
//! Writes the body of every precompiled header (macro definitions followed by
//! the top level includes) so an external compiler can turn it into a PCH, and
//! records each finished task for the run report. Symbol extraction itself is
//! left to the consumer of the report.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::cache::{FilePathCache, FilePathId};
use crate::indexer::scheduler::{ExecutionError, TaskExecutor};
use crate::indexer::task::{PchJob, WorkerTask};
use crate::pch::PchKind;
use crate::project::ProjectPartId;

/// One task the executor finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletedTask {
    Index {
        file: PathBuf,
        project_part_id: ProjectPartId,
    },
    Pch {
        kind: PchKind,
        project_part_ids: Vec<ProjectPartId>,
        digest: String,
        header: Option<PathBuf>,
    },
}

pub struct PchBodyExecutor {
    cache: Arc<FilePathCache>,
    output_directory: Option<PathBuf>,
    completed: Mutex<Vec<CompletedTask>>,
}

impl PchBodyExecutor {
    /// Without an output directory nothing is written
    pub fn new(cache: Arc<FilePathCache>, output_directory: Option<PathBuf>) -> Self {
        Self {
            cache,
            output_directory,
            completed: Mutex::new(Vec::new()),
        }
    }

    /// Finished tasks in completion order
    pub fn completed(&self) -> Vec<CompletedTask> {
        self.completed.lock().clone()
    }

    /// Source text of the header a PCH is built from
    pub fn header_body(&self, job: &PchJob) -> Result<String, ExecutionError> {
        let mut body = String::new();
        let parts: Vec<String> = job
            .task
            .project_part_ids
            .iter()
            .map(ToString::to_string)
            .collect();
        let _ = writeln!(body, "// {:?} PCH for {}", job.kind, parts.join(", "));
        let _ = writeln!(body, "#pragma once");

        for compiler_macro in job.task.compiler_macros.iter().filter(|m| m.is_used()) {
            let _ = writeln!(
                body,
                "#define {} {}",
                compiler_macro.name, compiler_macro.value
            );
        }
        for &include in &job.task.includes {
            let _ = writeln!(body, "#include \"{}\"", self.path(include)?.display());
        }
        Ok(body)
    }

    fn path(&self, id: FilePathId) -> Result<PathBuf, ExecutionError> {
        self.cache
            .file_path(id)
            .map_err(|e| ExecutionError::Failed {
                reason: e.to_string(),
            })
    }

    async fn build_pch(&self, job: PchJob) -> Result<CompletedTask, ExecutionError> {
        let digest = job.task.content_digest();
        let header = match &self.output_directory {
            Some(directory) => {
                let kind = match job.kind {
                    PchKind::System => "system",
                    PchKind::Project => "project",
                };
                let path = directory.join(format!("{}-{}.h", kind, &digest[..16]));
                tokio::fs::create_dir_all(directory).await?;
                tokio::fs::write(&path, self.header_body(&job)?).await?;
                debug!("PchBodyExecutor: wrote {}", path.display());
                Some(path)
            }
            None => None,
        };

        Ok(CompletedTask::Pch {
            kind: job.kind,
            project_part_ids: job.task.project_part_ids,
            digest,
            header,
        })
    }
}

#[async_trait]
impl TaskExecutor for PchBodyExecutor {
    async fn execute(&self, task: WorkerTask) -> Result<(), ExecutionError> {
        let completed = match task {
            WorkerTask::Index(task) => CompletedTask::Index {
                file: self.path(task.file_path_id)?,
                project_part_id: task.project_part_id,
            },
            WorkerTask::BuildPch(job) => self.build_pch(job).await?,
        };
        self.completed.lock().push(completed);
        Ok(())
    }
}
