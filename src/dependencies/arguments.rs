//! Compiler argument inspection
//!
//! Extracts the two things the pipeline cares about from a compile command:
//! include search paths (with their provenance) and command-line macro
//! definitions (with their argument order).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::normalize_path;
use crate::dependencies::types::{CompilerMacro, CompilerMacros};

/// Flag that introduced an include search path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchPathKind {
    /// `-iquote`: only consulted for quoted includes
    Quote,
    /// `-I`
    User,
    /// `-isystem`
    System,
    /// `-idirafter` and sysroot defaults
    AfterSystem,
}

impl SearchPathKind {
    pub fn is_system(self) -> bool {
        matches!(self, SearchPathKind::System | SearchPathKind::AfterSystem)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeSearchPath {
    pub path: PathBuf,
    pub kind: SearchPathKind,
}

impl IncludeSearchPath {
    pub fn new(path: impl Into<PathBuf>, kind: SearchPathKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// What a compile command says about includes and macros
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerArguments {
    /// Search paths in lookup order: quote, user, system, after-system
    pub search_paths: Vec<IncludeSearchPath>,
    /// Definitions surviving `-U`, in first-definition order
    pub compiler_macros: CompilerMacros,
}

const PATH_FLAGS: [(&str, SearchPathKind); 4] = [
    ("-iquote", SearchPathKind::Quote),
    ("-isystem", SearchPathKind::System),
    ("-idirafter", SearchPathKind::AfterSystem),
    ("-I", SearchPathKind::User),
];

impl CompilerArguments {
    /// Parse an argument vector; relative search paths are resolved against `directory`
    pub fn parse(arguments: &[String], directory: &Path) -> Self {
        let mut search_paths = Vec::new();
        let mut sysroot: Option<PathBuf> = None;
        let mut macros = MacroTable::default();

        let mut iter = arguments.iter().peekable();
        while let Some(argument) = iter.next() {
            if let Some(value) = argument.strip_prefix("--sysroot=") {
                sysroot = Some(directory.join(value));
                continue;
            }
            if argument == "--sysroot" {
                if let Some(value) = iter.next() {
                    sysroot = Some(directory.join(value));
                }
                continue;
            }

            if let Some((flag_value, kind)) = split_flag(argument, &PATH_FLAGS) {
                let value = match flag_value {
                    Some(value) => Some(value.to_string()),
                    None => iter.next().cloned(),
                };
                if let Some(value) = value {
                    search_paths.push(IncludeSearchPath::new(directory.join(value), kind));
                }
                continue;
            }

            if let Some(rest) = argument.strip_prefix("-D") {
                let definition = if rest.is_empty() {
                    iter.next().cloned()
                } else {
                    Some(rest.to_string())
                };
                if let Some(definition) = definition {
                    macros.define(&definition);
                }
                continue;
            }

            if let Some(rest) = argument.strip_prefix("-U") {
                let name = if rest.is_empty() {
                    iter.next().cloned()
                } else {
                    Some(rest.to_string())
                };
                if let Some(name) = name {
                    macros.undefine(&name);
                }
            }
        }

        if let Some(sysroot) = sysroot {
            search_paths.push(IncludeSearchPath::new(
                sysroot.join("usr/include"),
                SearchPathKind::AfterSystem,
            ));
        }

        // Stable sort keeps argument order within each kind
        search_paths.sort_by_key(|search_path| match search_path.kind {
            SearchPathKind::Quote => 0,
            SearchPathKind::User => 1,
            SearchPathKind::System => 2,
            SearchPathKind::AfterSystem => 3,
        });

        Self {
            search_paths,
            compiler_macros: macros.into_macros(),
        }
    }

    pub fn project_search_paths(&self) -> impl Iterator<Item = &IncludeSearchPath> {
        self.search_paths
            .iter()
            .filter(|search_path| !search_path.kind.is_system())
    }

    pub fn system_search_paths(&self) -> impl Iterator<Item = &IncludeSearchPath> {
        self.search_paths
            .iter()
            .filter(|search_path| search_path.kind.is_system())
    }
}

/// Split `-Ifoo` / `-I` style flags into an optional joined value and the path kind
fn split_flag<'a>(
    argument: &'a str,
    flags: &[(&str, SearchPathKind)],
) -> Option<(Option<&'a str>, SearchPathKind)> {
    for (flag, kind) in flags {
        if argument == *flag {
            return Some((None, *kind));
        }
        if let Some(value) = argument.strip_prefix(flag) {
            return Some((Some(value), *kind));
        }
    }
    None
}

/// Flags that differ per compile unit and never affect what a header sees
const PER_UNIT_FLAGS_WITH_VALUE: [&str; 4] = ["-o", "-MF", "-MT", "-MQ"];
const PER_UNIT_FLAGS: [&str; 4] = ["-c", "-MD", "-MMD", "-MP"];

/// Rewrite one compile command into the arguments shared by its project part
///
/// Drops the compiler itself, the source, the output and dependency-file
/// flags, and makes relative search paths absolute against `directory`.
pub fn shared_arguments(arguments: &[String], source: &Path, directory: &Path) -> Vec<String> {
    let source = normalize_path(&directory.join(source));
    let mut shared = Vec::new();

    let mut iter = arguments.iter().skip(1);
    while let Some(argument) = iter.next() {
        if PER_UNIT_FLAGS.contains(&argument.as_str()) {
            continue;
        }
        if PER_UNIT_FLAGS_WITH_VALUE.contains(&argument.as_str()) {
            iter.next();
            continue;
        }
        if argument.starts_with("-o") {
            continue;
        }
        if !argument.starts_with('-') && normalize_path(&directory.join(argument)) == source {
            continue;
        }

        match PATH_FLAGS.iter().find(|(flag, _)| argument.starts_with(flag)) {
            Some((flag, _)) if argument == flag => {
                shared.push(argument.clone());
                if let Some(value) = iter.next() {
                    shared.push(absolute(directory, value));
                }
            }
            Some((flag, _)) => {
                let value = &argument[flag.len()..];
                shared.push(format!("{}{}", flag, absolute(directory, value)));
            }
            None => shared.push(argument.clone()),
        }
    }
    shared
}

fn absolute(directory: &Path, value: &str) -> String {
    normalize_path(&directory.join(value))
        .to_string_lossy()
        .into_owned()
}

#[derive(Default)]
struct MacroTable {
    macros: Vec<CompilerMacro>,
    next_index: usize,
}

impl MacroTable {
    fn define(&mut self, definition: &str) {
        let (name, value) = match definition.split_once('=') {
            Some((name, value)) => (name, value),
            None => (definition, "1"),
        };

        if let Some(existing) = self.macros.iter_mut().find(|m| m.name == name) {
            existing.value = value.to_string();
            return;
        }

        self.macros
            .push(CompilerMacro::new(name, value, self.next_index));
        self.next_index += 1;
    }

    fn undefine(&mut self, name: &str) {
        self.macros.retain(|m| m.name != name);
    }

    fn into_macros(self) -> CompilerMacros {
        self.macros
    }
}
