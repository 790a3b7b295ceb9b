//! Records produced by one build dependency collection run

use serde::{Deserialize, Serialize};

use crate::cache::FilePathId;
use crate::io::Timestamp;

/// How a file was reached during collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKind {
    /// Directly included by a source file through a project or local path
    TopProjectInclude,
    /// Directly included by a source file through a system search path
    TopSystemInclude,
    /// Nested header found through a project search path
    ProjectInclude,
    /// Nested header found through a system search path
    SystemInclude,
    /// Nested header found next to the file including it
    UserInclude,
    /// A compile unit itself
    Source,
}

impl SourceKind {
    pub fn is_top(self) -> bool {
        matches!(
            self,
            SourceKind::TopProjectInclude | SourceKind::TopSystemInclude
        )
    }

    pub fn is_system(self) -> bool {
        matches!(self, SourceKind::TopSystemInclude | SourceKind::SystemInclude)
    }

    /// Headers found through a project search path; local includes are neither
    pub fn is_project(self) -> bool {
        matches!(self, SourceKind::TopProjectInclude | SourceKind::ProjectInclude)
    }

    /// Higher is more specific within one provenance family
    fn specificity(self) -> u8 {
        match self {
            SourceKind::Source => 4,
            SourceKind::TopProjectInclude | SourceKind::TopSystemInclude => 3,
            SourceKind::ProjectInclude | SourceKind::SystemInclude => 2,
            SourceKind::UserInclude => 1,
        }
    }

    /// Resolve the kind of a file reached twice within one collector run
    ///
    /// Sources stay sources. System and project provenance is fixed by the first
    /// classification; inside one family the more specific kind wins.
    pub fn merge(self, other: SourceKind) -> SourceKind {
        if self == SourceKind::Source || other == SourceKind::Source {
            return SourceKind::Source;
        }
        if self.is_system() != other.is_system() {
            return self;
        }
        if other.specificity() > self.specificity() {
            other
        } else {
            self
        }
    }
}

/// One file reached during collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub source_id: FilePathId,
    pub kind: SourceKind,
    /// Modification time captured during collection
    pub last_modified: Timestamp,
    /// The file names an include that could not be resolved
    pub has_missing_includes: bool,
}

impl SourceEntry {
    pub fn new(
        source_id: FilePathId,
        kind: SourceKind,
        last_modified: Timestamp,
        has_missing_includes: bool,
    ) -> Self {
        Self {
            source_id,
            kind,
            last_modified,
            has_missing_includes,
        }
    }
}

pub type SourceEntries = Vec<SourceEntry>;

/// A macro name the preprocessor consulted while processing a file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UsedMacro {
    pub name: String,
    pub file_path_id: FilePathId,
}

impl UsedMacro {
    pub fn new(name: impl Into<String>, file_path_id: FilePathId) -> Self {
        Self {
            name: name.into(),
            file_path_id,
        }
    }
}

pub type UsedMacros = Vec<UsedMacro>;

/// A command-line or builtin macro definition
///
/// `index` is the position among the definitions in argument order. A macro
/// that was defined but never consulted is carried with an empty value and no
/// index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompilerMacro {
    pub name: String,
    pub value: String,
    pub index: Option<usize>,
}

impl CompilerMacro {
    pub fn new(name: impl Into<String>, value: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            index: Some(index),
        }
    }

    /// Placeholder for a definition nobody consulted
    pub fn unused(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            index: None,
        }
    }

    pub fn is_used(&self) -> bool {
        self.index.is_some()
    }
}

pub type CompilerMacros = Vec<CompilerMacro>;

/// `dependent` includes `dependency` directly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceDependency {
    pub dependent: FilePathId,
    pub dependency: FilePathId,
}

impl SourceDependency {
    pub fn new(dependent: FilePathId, dependency: FilePathId) -> Self {
        Self {
            dependent,
            dependency,
        }
    }
}

/// On-disk state of a file at collection time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    pub file_path_id: FilePathId,
    pub size: u64,
    pub last_modified: Timestamp,
    /// Content came from an unsaved in-memory override
    pub is_generated: bool,
}

/// Aggregate output of one collection run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDependency {
    pub file_statuses: Vec<FileStatus>,
    /// Every reached file in discovery order, sources included
    pub includes: SourceEntries,
    pub used_macros: UsedMacros,
    pub source_files: Vec<FilePathId>,
    pub source_dependencies: Vec<SourceDependency>,
    /// Headers that were named but could not be found
    pub missing_includes: Vec<FilePathId>,
}

impl BuildDependency {
    /// Headers in discovery order, compile units excluded
    pub fn all_includes(&self) -> Vec<FilePathId> {
        self.includes
            .iter()
            .filter(|entry| entry.kind != SourceKind::Source)
            .map(|entry| entry.source_id)
            .collect()
    }

    pub fn entry(&self, id: FilePathId) -> Option<&SourceEntry> {
        self.includes.iter().find(|entry| entry.source_id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.source_files.is_empty()
    }
}
