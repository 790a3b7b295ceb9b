//! Per project part build dependency cache
//!
//! Collection is the expensive step of PCH generation. The provider keeps the
//! last [`BuildDependency`] of every project part and hands it back as long as
//! the part still has the same sources, arguments and exclusions and the
//! [`ModifiedTimeChecker`] reports every recorded file up to date.

use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cache::FilePathId;
use crate::dependencies::collector::{BuildDependencyCollector, CollectStatus};
use crate::dependencies::modified_time_checker::ModifiedTimeChecker;
use crate::dependencies::types::BuildDependency;
use crate::error::PipelineError;
use crate::project::{ProjectPart, ProjectPartId};

/// A collected dependency and the part configuration it was collected for
struct CachedDependency {
    sources: Vec<FilePathId>,
    arguments: Vec<String>,
    excluded: Vec<FilePathId>,
    dependency: BuildDependency,
}

impl CachedDependency {
    fn matches(&self, project_part: &ProjectPart) -> bool {
        self.sources == project_part.sources
            && self.arguments == project_part.arguments
            && self.excluded == project_part.excluded
    }
}

pub struct BuildDependenciesProvider {
    collector: BuildDependencyCollector,
    checker: ModifiedTimeChecker,
    cached: HashMap<ProjectPartId, CachedDependency>,
}

impl BuildDependenciesProvider {
    pub fn new(collector: BuildDependencyCollector, checker: ModifiedTimeChecker) -> Self {
        Self {
            collector,
            checker,
            cached: HashMap::new(),
        }
    }

    /// Build dependency of `project_part`, collected again only when stale
    ///
    /// Returns `None` when cancellation interrupted a fresh collection; the
    /// partial result is discarded and nothing is cached.
    pub fn create(
        &mut self,
        project_part: &ProjectPart,
        cancellation: &CancellationToken,
    ) -> Option<BuildDependency> {
        if let Some(cached) = self.cached.get(&project_part.id)
            && cached.matches(project_part)
            && self.checker.is_up_to_date(&cached.dependency.includes)
        {
            debug!(
                "BuildDependenciesProvider: {} is up to date",
                project_part.id
            );
            return Some(cached.dependency.clone());
        }

        debug!(
            "BuildDependenciesProvider: collecting {} ({} sources)",
            project_part.id,
            project_part.sources.len()
        );
        self.collector.clear();
        self.collector
            .set_excluded_file_paths(project_part.excluded.iter().copied());
        self.collector
            .add_files(&project_part.sources, &project_part.arguments);

        if self.collector.collect(cancellation) == CollectStatus::Cancelled {
            self.collector.clear();
            return None;
        }

        let dependency = self.collector.take_build_dependency();
        self.cached.insert(
            project_part.id,
            CachedDependency {
                sources: project_part.sources.clone(),
                arguments: project_part.arguments.clone(),
                excluded: project_part.excluded.clone(),
                dependency: dependency.clone(),
            },
        );
        Some(dependency)
    }

    /// Files changed on disk; the next check re-reads their times
    pub fn paths_changed(&mut self, ids: &[FilePathId]) {
        self.checker.paths_changed(ids);
    }

    pub fn remove_project_parts(&mut self, ids: &[ProjectPartId]) {
        self.cached.retain(|id, _| !ids.contains(id));
    }

    pub fn is_cached(&self, id: ProjectPartId) -> bool {
        self.cached.contains_key(&id)
    }

    /// Last build dependency collected for a project part
    pub fn dependency(&self, id: ProjectPartId) -> Result<&BuildDependency, PipelineError> {
        self.cached
            .get(&id)
            .map(|cached| &cached.dependency)
            .ok_or(PipelineError::UnknownProjectPart { id: id.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FilePathCache;
    use crate::dependencies::preprocessor::{
        IncludeEdge, IncludeOrigin, IncludedHeader, PreprocessedSource,
    };
    use crate::dependencies::testing::{FixedStatusProvider, ScriptedPreprocessor};
    use std::sync::Arc;

    struct Fixture {
        cache: Arc<FilePathCache>,
        preprocessor: Arc<ScriptedPreprocessor>,
        status: Arc<FixedStatusProvider>,
        provider: BuildDependenciesProvider,
        part: ProjectPart,
    }

    fn fixture() -> Fixture {
        let cache = FilePathCache::shared();
        let preprocessor = Arc::new(ScriptedPreprocessor::new());
        let status = Arc::new(FixedStatusProvider::new(100));
        preprocessor.script(
            "/project/main.cpp",
            PreprocessedSource {
                top_includes: vec![IncludedHeader::new("/project/a.h", IncludeOrigin::Project)],
                direct_edges: vec![IncludeEdge::new("/project/main.cpp", "/project/a.h")],
                ..PreprocessedSource::default()
            },
        );

        let collector =
            BuildDependencyCollector::new(cache.clone(), preprocessor.clone(), status.clone());
        let checker = ModifiedTimeChecker::new(status.clone());
        let part = ProjectPart::new(ProjectPartId(1), "app", "/project", Vec::new())
            .with_sources(vec![cache.file_path_id("/project/main.cpp")]);

        Fixture {
            cache,
            preprocessor,
            status,
            provider: BuildDependenciesProvider::new(collector, checker),
            part,
        }
    }

    #[test]
    fn test_up_to_date_dependency_is_reused() {
        let mut f = fixture();
        let token = CancellationToken::new();

        let first = f.provider.create(&f.part, &token).unwrap();
        let second = f.provider.create(&f.part, &token).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.includes.len(), 2);
        assert_eq!(f.preprocessor.calls().len(), 1);
    }

    #[test]
    fn test_changed_header_triggers_recollection() {
        let mut f = fixture();
        let token = CancellationToken::new();
        f.provider.create(&f.part, &token).unwrap();

        let header = f.cache.file_path_id("/project/a.h");
        f.status.set_modified(header, 200);
        f.provider.paths_changed(&[header]);
        let refreshed = f.provider.create(&f.part, &token).unwrap();

        assert_eq!(f.preprocessor.calls().len(), 2);
        let entry = refreshed.entry(header).unwrap();
        assert_eq!(entry.last_modified.timestamp(), 200);
    }

    #[test]
    fn test_cancelled_collection_is_not_cached() {
        let mut f = fixture();
        let token = CancellationToken::new();
        token.cancel();

        assert!(f.provider.create(&f.part, &token).is_none());
        assert!(!f.provider.is_cached(f.part.id));
        assert!(f.provider.dependency(f.part.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_changed_part_configuration_triggers_recollection() {
        let mut f = fixture();
        let token = CancellationToken::new();
        f.provider.create(&f.part, &token).unwrap();

        let with_flag = ProjectPart::new(
            f.part.id,
            "app",
            "/project",
            vec!["-DEXTRA".to_string()],
        )
        .with_sources(f.part.sources.clone());
        f.provider.create(&with_flag, &token).unwrap();
        assert_eq!(f.preprocessor.calls().len(), 2);

        let extra_source = with_flag
            .clone()
            .with_sources(vec![f.part.sources[0], f.cache.file_path_id("/project/other.cpp")]);
        f.provider.create(&extra_source, &token).unwrap();
        assert_eq!(f.preprocessor.calls().len(), 4);

        f.provider.create(&extra_source, &token).unwrap();
        assert_eq!(f.preprocessor.calls().len(), 4);
    }

    #[test]
    fn test_removed_project_part_is_collected_again() {
        let mut f = fixture();
        let token = CancellationToken::new();
        f.provider.create(&f.part, &token).unwrap();

        f.provider.remove_project_parts(&[f.part.id]);
        f.provider.create(&f.part, &token).unwrap();

        assert_eq!(f.preprocessor.calls().len(), 2);
    }
}
