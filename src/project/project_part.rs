use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::cache::FilePathId;
use crate::dependencies::{CompilerArguments, CompilerMacros};

/// Identifier of a group of sources sharing one set of compile arguments
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProjectPartId(pub u32);

impl fmt::Display for ProjectPartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part#{}", self.0)
    }
}

/// Sources compiled with identical arguments
///
/// This is the unit PCH tasks are generated for: every source of a part sees
/// the same search paths and the same macro definitions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectPart {
    pub id: ProjectPartId,
    pub name: String,
    /// Working directory the arguments are relative to
    pub directory: PathBuf,
    pub sources: Vec<FilePathId>,
    /// Compile arguments without the compiler, the source and the output
    pub arguments: Vec<String>,
    pub compiler_macros: CompilerMacros,
    /// Generated or otherwise volatile headers that must never be expanded
    pub excluded: Vec<FilePathId>,
}

impl ProjectPart {
    pub fn new(
        id: ProjectPartId,
        name: impl Into<String>,
        directory: impl Into<PathBuf>,
        arguments: Vec<String>,
    ) -> Self {
        let directory = directory.into();
        let compiler_macros = CompilerArguments::parse(&arguments, &directory).compiler_macros;
        Self {
            id,
            name: name.into(),
            directory,
            sources: Vec::new(),
            arguments,
            compiler_macros,
            excluded: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<FilePathId>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_excluded(mut self, excluded: Vec<FilePathId>) -> Self {
        self.excluded = excluded;
        self
    }

    pub fn add_source(&mut self, source: FilePathId) {
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
    }
}
