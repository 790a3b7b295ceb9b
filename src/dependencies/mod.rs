//! Build dependency collection
//!
//! Everything needed to turn a set of compile units into a [`BuildDependency`]:
//! compile argument parsing, the preprocessor collaborator, the collector that
//! walks include edges, and staleness detection for previously collected sets.

pub mod arguments;
pub mod collector;
pub mod modified_time_checker;
pub mod preprocessor;
pub mod provider;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use arguments::{CompilerArguments, IncludeSearchPath, SearchPathKind, shared_arguments};
pub use collector::{BuildDependencyCollector, CollectStatus};
pub use modified_time_checker::ModifiedTimeChecker;
#[cfg(test)]
pub use preprocessor::MockPreprocessor;
pub use preprocessor::{
    IncludeScanner, PreprocessError, PreprocessedSource, Preprocessor, UnsavedFile,
};
pub use provider::BuildDependenciesProvider;
pub use types::{
    BuildDependency, CompilerMacro, CompilerMacros, FileStatus, SourceDependency, SourceEntries,
    SourceEntry, SourceKind, UsedMacro, UsedMacros,
};
