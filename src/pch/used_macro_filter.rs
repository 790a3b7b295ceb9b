//! Split collected facts into system and project halves
//!
//! A system PCH must only bake in what system headers consult, and the same
//! holds for the project PCH. The filter partitions entries by kind, narrows
//! used macros to the files of each half, and marks command line macros that
//! nobody in a half consulted.

use std::collections::HashSet;

use crate::cache::FilePathId;
use crate::dependencies::{CompilerMacro, CompilerMacros, SourceEntry, UsedMacro};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedMacroFilter {
    /// Every entry id regardless of kind, ascending
    pub sources: Vec<FilePathId>,
    pub system_includes: Vec<FilePathId>,
    pub project_includes: Vec<FilePathId>,
    pub top_system_includes: Vec<FilePathId>,
    pub top_project_includes: Vec<FilePathId>,
    pub system_used_macros: Vec<String>,
    pub project_used_macros: Vec<String>,
    pub system_compiler_macros: CompilerMacros,
    pub project_compiler_macros: CompilerMacros,
}

impl UsedMacroFilter {
    pub fn new(
        includes: &[SourceEntry],
        used_macros: &[UsedMacro],
        compiler_macros: &[CompilerMacro],
    ) -> Self {
        let mut filter = Self::default();
        filter.filter_includes(includes);
        filter.filter_used_macros(used_macros);
        filter.system_compiler_macros =
            filter_compiler_macros(compiler_macros, &filter.system_used_macros);
        filter.project_compiler_macros =
            filter_compiler_macros(compiler_macros, &filter.project_used_macros);
        filter
    }

    fn filter_includes(&mut self, includes: &[SourceEntry]) {
        for entry in includes {
            self.sources.push(entry.source_id);

            // A header with an incomplete include graph cannot anchor a PCH
            let top = entry.kind.is_top() && !entry.has_missing_includes;

            let (half, top_half) = if entry.kind.is_system() {
                (&mut self.system_includes, &mut self.top_system_includes)
            } else if entry.kind.is_project() {
                (&mut self.project_includes, &mut self.top_project_includes)
            } else {
                continue;
            };
            if top {
                top_half.push(entry.source_id);
            }
            half.push(entry.source_id);
        }
        self.sources.sort();
        self.sources.dedup();
    }

    fn filter_used_macros(&mut self, used_macros: &[UsedMacro]) {
        let system: HashSet<FilePathId> = self.system_includes.iter().copied().collect();
        let project: HashSet<FilePathId> = self.project_includes.iter().copied().collect();

        for used in used_macros {
            let target = if system.contains(&used.file_path_id) {
                &mut self.system_used_macros
            } else if project.contains(&used.file_path_id) {
                &mut self.project_used_macros
            } else {
                continue;
            };
            if !target.contains(&used.name) {
                target.push(used.name.clone());
            }
        }
    }
}

/// Keep argument order; definitions nobody consulted lose value and index
fn filter_compiler_macros(compiler_macros: &[CompilerMacro], used: &[String]) -> CompilerMacros {
    compiler_macros
        .iter()
        .map(|compiler_macro| {
            if used.contains(&compiler_macro.name) {
                compiler_macro.clone()
            } else {
                CompilerMacro::unused(compiler_macro.name.clone())
            }
        })
        .collect()
}
