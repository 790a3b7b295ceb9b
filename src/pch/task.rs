//! Precompiled header work units

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::cache::FilePathId;
use crate::dependencies::CompilerMacros;
use crate::project::ProjectPartId;

/// Which of the paired headers a task builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PchKind {
    /// Headers found through system search paths; built first
    System,
    /// Project headers; may rely on the system PCH of the same parts
    Project,
}

/// Description of one precompiled header to build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PchTask {
    /// Parts served by this header, sorted and never empty once queued
    pub project_part_ids: Vec<ProjectPartId>,
    /// Top level includes, in discovery order; these are what the header includes
    pub includes: Vec<FilePathId>,
    /// Every header the top level includes pull in, in discovery order
    pub all_includes: Vec<FilePathId>,
    pub compiler_macros: CompilerMacros,
    /// Names of macros consulted by the included headers
    pub used_macros: Vec<String>,
}

impl PchTask {
    pub fn new(
        project_part_id: ProjectPartId,
        includes: Vec<FilePathId>,
        all_includes: Vec<FilePathId>,
        compiler_macros: CompilerMacros,
        used_macros: Vec<String>,
    ) -> Self {
        Self {
            project_part_ids: vec![project_part_id],
            includes,
            all_includes,
            compiler_macros,
            used_macros,
        }
    }

    /// Digest of everything that makes two headers byte-identical
    ///
    /// Covers the include set and the compiler macros, independent of their
    /// order. Unused macros hash apart from empty definitions. Project parts
    /// and used macro names do not take part.
    pub fn content_digest(&self) -> String {
        let mut includes = self.includes.clone();
        includes.sort();
        let mut macros: Vec<String> = self
            .compiler_macros
            .iter()
            .map(|m| {
                if m.is_used() {
                    format!("{}={}", m.name, m.value)
                } else {
                    format!("!{}", m.name)
                }
            })
            .collect();
        macros.sort();

        let mut hasher = Sha256::new();
        for include in includes {
            hasher.update(include.0.to_le_bytes());
        }
        hasher.update([0u8]);
        for m in macros {
            hasher.update(m.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }

    /// Whether one header can serve both tasks
    pub fn is_mergeable(&self, other: &PchTask) -> bool {
        self.content_digest() == other.content_digest()
    }

    /// Absorb a mergeable task: widen the parts and union the used macros
    pub fn merge(&mut self, other: PchTask) {
        self.project_part_ids.extend(other.project_part_ids);
        self.project_part_ids.sort();
        self.project_part_ids.dedup();

        for name in other.used_macros {
            if !self.used_macros.contains(&name) {
                self.used_macros.push(name);
            }
        }
        for include in other.all_includes {
            if !self.all_includes.contains(&include) {
                self.all_includes.push(include);
            }
        }
    }

    pub fn serves(&self, id: ProjectPartId) -> bool {
        self.project_part_ids.contains(&id)
    }
}

/// The system and project header generated for one project part
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PchTaskSet {
    pub system: PchTask,
    pub project: PchTask,
}

impl PchTaskSet {
    pub fn new(system: PchTask, project: PchTask) -> Self {
        Self { system, project }
    }
}
