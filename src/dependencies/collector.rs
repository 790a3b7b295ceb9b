//! Build dependency collector
//!
//! Runs the preprocessor collaborator over each added compile unit, walks the
//! returned include edges depth-first and accumulates one [`BuildDependency`]
//! across all added files. Per-file failures degrade to an empty contribution;
//! headers that cannot be found are recorded as data on the file naming them.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::cache::{FilePathCache, FilePathId};
use crate::dependencies::preprocessor::{
    IncludeOrigin, PreprocessedSource, Preprocessor, UnsavedFile,
};
use crate::dependencies::types::{
    BuildDependency, FileStatus, SourceDependency, SourceEntry, SourceKind, UsedMacro,
};
use crate::io::{FileStatusProvider, Timestamp, timestamp_from};

/// Outcome of one [`BuildDependencyCollector::collect`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectStatus {
    /// Every pending compile unit was processed
    Completed,
    /// Cancellation was observed between compile units; results are partial
    Cancelled,
}

struct PendingSource {
    id: FilePathId,
    arguments: Vec<String>,
}

/// Accumulated results plus the lookup sets that keep them duplicate free
#[derive(Default)]
struct CollectedState {
    dependency: BuildDependency,
    include_index: HashMap<FilePathId, usize>,
    used_macro_index: HashSet<UsedMacro>,
    dependency_index: HashSet<SourceDependency>,
    missing_index: HashSet<FilePathId>,
}

/// Collects includes, macro usage and file statuses for a set of compile units
pub struct BuildDependencyCollector {
    cache: Arc<FilePathCache>,
    preprocessor: Arc<dyn Preprocessor>,
    status_provider: Arc<dyn FileStatusProvider>,
    pending: Vec<PendingSource>,
    excluded: HashSet<FilePathId>,
    unsaved: Vec<UnsavedFile>,
    state: CollectedState,
}

fn top_kind(origin: IncludeOrigin) -> SourceKind {
    match origin {
        IncludeOrigin::System => SourceKind::TopSystemInclude,
        IncludeOrigin::Project | IncludeOrigin::User => SourceKind::TopProjectInclude,
    }
}

fn nested_kind(origin: IncludeOrigin) -> SourceKind {
    match origin {
        IncludeOrigin::System => SourceKind::SystemInclude,
        IncludeOrigin::Project => SourceKind::ProjectInclude,
        IncludeOrigin::User => SourceKind::UserInclude,
    }
}

impl BuildDependencyCollector {
    pub fn new(
        cache: Arc<FilePathCache>,
        preprocessor: Arc<dyn Preprocessor>,
        status_provider: Arc<dyn FileStatusProvider>,
    ) -> Self {
        Self {
            cache,
            preprocessor,
            status_provider,
            pending: Vec::new(),
            excluded: HashSet::new(),
            unsaved: Vec::new(),
            state: CollectedState::default(),
        }
    }

    /// Files that are recorded when reached but never expanded
    pub fn set_excluded_file_paths(&mut self, ids: impl IntoIterator<Item = FilePathId>) {
        self.excluded = ids.into_iter().collect();
    }

    /// In-memory overrides consulted before the disk
    pub fn add_unsaved_files(&mut self, files: impl IntoIterator<Item = UnsavedFile>) {
        self.unsaved.extend(files);
    }

    pub fn add_file(&mut self, id: FilePathId, arguments: &[String]) {
        self.pending.push(PendingSource {
            id,
            arguments: arguments.to_vec(),
        });
    }

    pub fn add_files(&mut self, ids: &[FilePathId], arguments: &[String]) {
        for &id in ids {
            self.add_file(id, arguments);
        }
    }

    /// Process every file added since the last call, in the order added
    ///
    /// Cancellation is checked once per compile unit. Whatever was collected
    /// before it was observed stays available.
    pub fn collect(&mut self, cancellation: &CancellationToken) -> CollectStatus {
        let pending = std::mem::take(&mut self.pending);
        debug!("BuildDependencyCollector: collecting {} sources", pending.len());

        for source in pending {
            if cancellation.is_cancelled() {
                debug!("BuildDependencyCollector: cancelled before {}", source.id);
                return CollectStatus::Cancelled;
            }
            self.collect_source(source);
        }

        debug!(
            "BuildDependencyCollector: {} entries, {} used macros, {} edges",
            self.state.dependency.includes.len(),
            self.state.dependency.used_macros.len(),
            self.state.dependency.source_dependencies.len()
        );
        CollectStatus::Completed
    }

    /// Reset everything: accumulated results, pending files, exclusions and overrides
    pub fn clear(&mut self) {
        self.pending.clear();
        self.excluded.clear();
        self.unsaved.clear();
        self.state = CollectedState::default();
    }

    /// Snapshot of the accumulated results
    pub fn build_dependency(&self) -> BuildDependency {
        self.state.dependency.clone()
    }

    /// Move the accumulated results out and reset the collector
    pub fn take_build_dependency(&mut self) -> BuildDependency {
        let dependency = std::mem::take(&mut self.state.dependency);
        self.clear();
        dependency
    }

    pub fn includes(&self) -> &[SourceEntry] {
        &self.state.dependency.includes
    }

    pub fn source_files(&self) -> &[FilePathId] {
        &self.state.dependency.source_files
    }

    pub fn file_statuses(&self) -> &[FileStatus] {
        &self.state.dependency.file_statuses
    }

    pub fn used_macros(&self) -> &[UsedMacro] {
        &self.state.dependency.used_macros
    }

    pub fn source_dependencies(&self) -> &[SourceDependency] {
        &self.state.dependency.source_dependencies
    }

    fn collect_source(&mut self, source: PendingSource) {
        let path = match self.cache.file_path(source.id) {
            Ok(path) => path,
            Err(e) => {
                warn!("BuildDependencyCollector: skipping source {}: {}", source.id, e);
                return;
            }
        };

        trace!("BuildDependencyCollector: preprocessing {:?}", path);
        let preprocessed = match self
            .preprocessor
            .preprocess(&path, &source.arguments, &self.unsaved)
        {
            Ok(preprocessed) => preprocessed,
            Err(e) => {
                warn!("BuildDependencyCollector: {} (source skipped)", e);
                return;
            }
        };

        if !self.state.dependency.source_files.contains(&source.id) {
            self.state.dependency.source_files.push(source.id);
        }
        self.record_entry(source.id, &path, SourceKind::Source);

        self.record_includes(&path, &preprocessed);
        self.record_edges(&preprocessed);
        self.record_missing_includes(&preprocessed);
        self.record_used_macros(&preprocessed);
    }

    /// Depth-first, pre-order walk over the include edges starting at `source`
    fn record_includes(&mut self, source: &Path, preprocessed: &PreprocessedSource) {
        let mut kinds: HashMap<&Path, SourceKind> = HashMap::new();
        let classified = preprocessed
            .top_includes
            .iter()
            .map(|header| (header, top_kind(header.origin)))
            .chain(
                preprocessed
                    .nested_includes
                    .iter()
                    .map(|header| (header, nested_kind(header.origin))),
            );
        for (header, kind) in classified {
            kinds
                .entry(header.path.as_path())
                .and_modify(|existing| *existing = existing.merge(kind))
                .or_insert(kind);
        }

        let mut children: HashMap<&Path, Vec<&Path>> = HashMap::new();
        for edge in &preprocessed.direct_edges {
            children
                .entry(edge.includer.as_path())
                .or_default()
                .push(edge.included.as_path());
        }

        let mut visited: HashSet<&Path> = HashSet::from([source]);
        let mut stack: Vec<&Path> = children
            .get(source)
            .map(|direct| direct.iter().rev().copied().collect())
            .unwrap_or_default();

        while let Some(path) = stack.pop() {
            if !visited.insert(path) {
                continue;
            }

            let kind = kinds
                .get(path)
                .copied()
                .unwrap_or(SourceKind::UserInclude);
            let id = self.cache.file_path_id(path);
            self.record_entry(id, path, kind);

            if self.excluded.contains(&id) {
                trace!("BuildDependencyCollector: not expanding excluded {:?}", path);
                continue;
            }
            if let Some(direct) = children.get(path) {
                stack.extend(
                    direct
                        .iter()
                        .rev()
                        .filter(|child| !visited.contains(*child))
                        .copied(),
                );
            }
        }
    }

    fn record_edges(&mut self, preprocessed: &PreprocessedSource) {
        for edge in &preprocessed.direct_edges {
            let dependent = self.cache.file_path_id(&edge.includer);
            if self.excluded.contains(&dependent) {
                continue;
            }
            let dependency = self.cache.file_path_id(&edge.included);
            self.record_dependency(SourceDependency::new(dependent, dependency));
        }
    }

    fn record_missing_includes(&mut self, preprocessed: &PreprocessedSource) {
        for missing in &preprocessed.missing_includes {
            let includer = self.cache.file_path_id(&missing.includer);
            if self.excluded.contains(&includer) {
                continue;
            }
            let missing_id = self.cache.file_path_id(&missing.path);
            debug!(
                "BuildDependencyCollector: {:?} includes missing {}",
                missing.includer, missing.spelling
            );

            self.record_dependency(SourceDependency::new(includer, missing_id));
            if self.state.missing_index.insert(missing_id) {
                self.state.dependency.missing_includes.push(missing_id);
            }
            if let Some(&index) = self.state.include_index.get(&includer) {
                self.state.dependency.includes[index].has_missing_includes = true;
            }
        }
    }

    fn record_used_macros(&mut self, preprocessed: &PreprocessedSource) {
        for usage in &preprocessed.used_macros {
            let file_path_id = self.cache.file_path_id(&usage.file);
            if self.excluded.contains(&file_path_id) {
                continue;
            }
            let used_macro = UsedMacro::new(usage.name.clone(), file_path_id);
            if self.state.used_macro_index.insert(used_macro.clone()) {
                self.state.dependency.used_macros.push(used_macro);
            }
        }
    }

    fn record_dependency(&mut self, dependency: SourceDependency) {
        if self.state.dependency_index.insert(dependency) {
            self.state.dependency.source_dependencies.push(dependency);
        }
    }

    fn record_entry(&mut self, id: FilePathId, path: &Path, kind: SourceKind) {
        if let Some(&index) = self.state.include_index.get(&id) {
            let entry = &mut self.state.dependency.includes[index];
            entry.kind = entry.kind.merge(kind);
            return;
        }

        let status = self.file_status(id, path);
        let entry = SourceEntry::new(id, kind, status.last_modified, false);
        self.state
            .include_index
            .insert(id, self.state.dependency.includes.len());
        self.state.dependency.includes.push(entry);
        self.state.dependency.file_statuses.push(status);
    }

    fn file_status(&self, id: FilePathId, path: &Path) -> FileStatus {
        let last_modified: Timestamp = self
            .status_provider
            .last_modified(id)
            .unwrap_or_else(|e| {
                trace!("BuildDependencyCollector: no timestamp for {:?}: {}", path, e);
                timestamp_from(std::time::UNIX_EPOCH)
            });

        if let Some(unsaved) = self.unsaved.iter().find(|file| file.path == path) {
            return FileStatus {
                file_path_id: id,
                size: unsaved.content.len() as u64,
                last_modified,
                is_generated: true,
            };
        }

        FileStatus {
            file_path_id: id,
            size: self.status_provider.size(id).unwrap_or(0),
            last_modified,
            is_generated: false,
        }
    }
}
