//! End-to-end run over a workspace
//!
//! Discovers compilation databases, turns their entries into project parts,
//! generates and queues PCH tasks, queues one symbol indexer task per source
//! and drives both queues against a bounded [`TaskScheduler`] until idle.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, info, warn};

use crate::cache::FilePathCache;
use crate::cache::FilePathId;
use crate::dependencies::{
    BuildDependenciesProvider, BuildDependencyCollector, IncludeScanner, ModifiedTimeChecker,
};
use crate::error::PipelineError;
use crate::indexer::{
    CompletedTask, PchBodyExecutor, Progress, ProgressCounter, SymbolIndexerTask,
    SymbolIndexerTaskQueue, TaskScheduler,
};
use crate::io::{FileSystemStatusProvider, RealFileSystem};
use crate::log_timing;
use crate::pch::{PchTask, PchTaskGenerator, PchTaskQueue, PchTaskQueueTrait, PchTasksMerger};
use crate::project::{CompilationDatabase, ProjectError, ProjectPart, ProjectScanner};

/// Builtin system directories searched after every path from the arguments
pub const DEFAULT_SYSTEM_INCLUDE_PATHS: [&str; 2] = ["/usr/local/include", "/usr/include"];

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Workspace scanned for compilation databases
    pub root: PathBuf,
    /// Use this database instead of scanning
    pub compile_commands: Option<PathBuf>,
    /// Directory depth searched below the root
    pub depth: usize,
    /// Worker slots
    pub workers: usize,
    pub system_include_paths: Vec<PathBuf>,
    /// Where PCH header bodies are written; nothing is written when unset
    pub pch_directory: Option<PathBuf>,
    /// Generate and queue tasks without dispatching any
    pub dry_run: bool,
}

impl PipelineConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            compile_commands: None,
            depth: 3,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            system_include_paths: DEFAULT_SYSTEM_INCLUDE_PATHS
                .iter()
                .map(PathBuf::from)
                .collect(),
            pch_directory: None,
            dry_run: false,
        }
    }
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ProjectPartReport {
    #[serde(flatten)]
    pub project_part: ProjectPart,
    pub source_paths: Vec<PathBuf>,
    pub include_count: usize,
    pub used_macro_count: usize,
    pub missing_includes: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub generated_at: DateTime<Utc>,
    pub root: PathBuf,
    pub compilation_databases: Vec<PathBuf>,
    pub project_parts: Vec<ProjectPartReport>,
    pub pch_task_sets: usize,
    /// Work still queued: everything on a dry run, leftovers after cancellation
    pub pending_system_pch_tasks: Vec<PchTask>,
    pub pending_project_pch_tasks: Vec<PchTask>,
    pub pending_index_tasks: usize,
    pub completed: Vec<CompletedTask>,
    pub failures: usize,
    pub progress: Progress,
    pub cancelled: bool,
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct Pipeline {
    config: PipelineConfig,
    cache: Arc<FilePathCache>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            cache: FilePathCache::shared(),
        }
    }

    pub fn cache(&self) -> &Arc<FilePathCache> {
        &self.cache
    }

    /// The explicit database, or every database found under the root
    pub fn compilation_databases(&self) -> Result<Vec<PathBuf>, PipelineError> {
        if let Some(path) = &self.config.compile_commands {
            return Ok(vec![path.clone()]);
        }

        let databases = ProjectScanner::new().find_compilation_databases(
            &self.config.root,
            self.config.depth,
            None,
        )?;
        if databases.is_empty() {
            return Err(ProjectError::CompilationDatabaseNotFound {
                path: self.config.root.to_string_lossy().to_string(),
            }
            .into());
        }
        Ok(databases)
    }

    /// Project parts of all databases, numbered across databases
    pub fn project_parts(
        &self,
        databases: &[PathBuf],
    ) -> Result<Vec<ProjectPart>, PipelineError> {
        let mut project_parts = Vec::new();
        for path in databases {
            let database = CompilationDatabase::new(path.clone())?;
            let first_id = project_parts.len() as u32 + 1;
            project_parts.extend(database.project_parts(&self.cache, first_id));
        }
        Ok(project_parts)
    }

    pub async fn run(
        &self,
        cancellation: CancellationToken,
    ) -> Result<PipelineReport, PipelineError> {
        let started = Instant::now();
        let databases = self.compilation_databases()?;
        let project_parts = self.project_parts(&databases)?;
        info!(
            "Pipeline: {} compilation databases, {} project parts",
            databases.len(),
            project_parts.len()
        );

        let preprocessor = IncludeScanner::new(RealFileSystem)?
            .with_builtin_system_paths(self.config.system_include_paths.clone());
        let status_provider = Arc::new(FileSystemStatusProvider::new(
            RealFileSystem,
            Arc::clone(&self.cache),
        ));
        let collector = BuildDependencyCollector::new(
            Arc::clone(&self.cache),
            Arc::new(preprocessor),
            status_provider.clone(),
        );
        let checker = ModifiedTimeChecker::new(status_provider);
        let mut generator =
            PchTaskGenerator::new(BuildDependenciesProvider::new(collector, checker));

        let progress = Arc::new(ProgressCounter::with_sink(|progress: Progress| {
            debug!("Pipeline: progress {}/{}", progress.done, progress.total);
        }));
        let executor = Arc::new(PchBodyExecutor::new(
            Arc::clone(&self.cache),
            self.config.pch_directory.clone(),
        ));
        // No slots on a dry run: queues accept work but never dispatch
        let capacity = if self.config.dry_run {
            0
        } else {
            self.config.workers.max(1)
        };
        let (scheduler, mut slot_freed) =
            TaskScheduler::new(capacity, executor.clone(), Arc::clone(&progress));
        let scheduler = Arc::new(scheduler);

        let mut pch_queue = PchTaskQueue::new(scheduler.clone(), Arc::clone(&progress));
        let mut indexer_queue =
            SymbolIndexerTaskQueue::new(scheduler.clone(), Arc::clone(&progress));

        let generation_started = Instant::now();
        let task_sets = generator.generate(&project_parts, &cancellation);
        let pch_task_sets = task_sets.len();
        log_timing!(Level::INFO, "generate_pch_tasks", generation_started.elapsed());
        PchTasksMerger::merge_tasks(&mut pch_queue, task_sets)?;

        indexer_queue.add_or_update_tasks(index_tasks(&project_parts));

        let mut cancelled = cancellation.is_cancelled();
        if !self.config.dry_run {
            if !cancelled {
                indexer_queue.process_entries();
            }
            while !cancelled && !(pch_queue.is_empty() && indexer_queue.is_empty()) {
                tokio::select! {
                    _ = cancellation.cancelled() => {
                        warn!("Pipeline: cancelled with work still queued");
                        cancelled = true;
                        break;
                    }
                    freed = slot_freed.recv() => {
                        if freed.is_none() {
                            break;
                        }
                        pch_queue.process_entries();
                        indexer_queue.process_entries();
                    }
                }
            }
            scheduler.wait_for_idle().await;
        }

        let report = PipelineReport {
            generated_at: Utc::now(),
            root: self.config.root.clone(),
            compilation_databases: databases,
            project_parts: self.project_part_reports(&generator, project_parts),
            pch_task_sets,
            pending_system_pch_tasks: pch_queue.system_tasks().to_vec(),
            pending_project_pch_tasks: pch_queue.project_tasks().to_vec(),
            pending_index_tasks: indexer_queue.len(),
            completed: executor.completed(),
            failures: scheduler.failures(),
            progress: progress.progress(),
            cancelled,
        };
        log_timing!(Level::INFO, "pipeline", started.elapsed());
        Ok(report)
    }

    fn project_part_reports(
        &self,
        generator: &PchTaskGenerator,
        project_parts: Vec<ProjectPart>,
    ) -> Vec<ProjectPartReport> {
        project_parts
            .into_iter()
            .map(|project_part| {
                let paths = |ids: &[FilePathId]| -> Vec<PathBuf> {
                    ids.iter()
                        .filter_map(|&id| self.cache.file_path(id).ok())
                        .collect()
                };
                let source_paths = paths(&project_part.sources);
                let (include_count, used_macro_count, missing_includes) =
                    match generator.provider().dependency(project_part.id) {
                        Ok(dependency) => (
                            dependency.all_includes().len(),
                            dependency.used_macros.len(),
                            paths(&dependency.missing_includes),
                        ),
                        Err(_) => (0, 0, Vec::new()),
                    };
                ProjectPartReport {
                    project_part,
                    source_paths,
                    include_count,
                    used_macro_count,
                    missing_includes,
                }
            })
            .collect()
    }
}

/// One indexer task per source and project part
fn index_tasks(project_parts: &[ProjectPart]) -> Vec<SymbolIndexerTask> {
    project_parts
        .iter()
        .flat_map(|project_part| {
            let arguments = Arc::new(project_part.arguments.clone());
            project_part.sources.iter().map(move |&source| {
                SymbolIndexerTask::new(source, project_part.id, Arc::clone(&arguments))
            })
        })
        .collect()
}
