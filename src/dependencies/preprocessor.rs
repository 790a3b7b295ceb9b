//! Preprocessor collaborator
//!
//! The collector never parses C/C++ itself. It asks a [`Preprocessor`] for the
//! raw include and macro facts of one compile unit and does its own traversal
//! over the returned edge list. [`IncludeScanner`] is a lightweight directive
//! scanner that implements the trait without an external compiler.

use regex::Regex;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::cache::normalize_path;
use crate::dependencies::arguments::{CompilerArguments, IncludeSearchPath, SearchPathKind};
use crate::io::FileSystemTrait;

// ============================================================================
// Collaborator interface
// ============================================================================

/// In-memory content that shadows the file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsavedFile {
    pub path: PathBuf,
    pub content: String,
}

impl UnsavedFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: normalize_path(&path.into()),
            content: content.into(),
        }
    }
}

/// How an included header was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncludeOrigin {
    /// Found next to the including file
    User,
    /// Found through a project search path (`-I`, `-iquote`)
    Project,
    /// Found through a system search path
    System,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludedHeader {
    pub path: PathBuf,
    pub origin: IncludeOrigin,
}

impl IncludedHeader {
    pub fn new(path: impl Into<PathBuf>, origin: IncludeOrigin) -> Self {
        Self {
            path: path.into(),
            origin,
        }
    }
}

/// `includer` contains an `#include` that resolved to `included`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeEdge {
    pub includer: PathBuf,
    pub included: PathBuf,
}

impl IncludeEdge {
    pub fn new(includer: impl Into<PathBuf>, included: impl Into<PathBuf>) -> Self {
        Self {
            includer: includer.into(),
            included: included.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroUsage {
    pub name: String,
    pub file: PathBuf,
}

impl MacroUsage {
    pub fn new(name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
        }
    }
}

/// An include that named a header nobody could find
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingInclude {
    pub includer: PathBuf,
    /// The header name as written
    pub spelling: String,
    /// Where the header would have been, relative to the includer
    pub path: PathBuf,
}

impl MissingInclude {
    pub fn new(includer: impl Into<PathBuf>, spelling: impl Into<String>) -> Self {
        let includer = includer.into();
        let spelling = spelling.into();
        let directory = includer.parent().unwrap_or(Path::new("/")).to_path_buf();
        Self {
            path: normalize_path(&directory.join(&spelling)),
            includer,
            spelling,
        }
    }
}

/// Raw include and macro facts of one compile unit
///
/// `direct_edges` lists every resolved include in the order it appears in the
/// including file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessedSource {
    pub top_includes: Vec<IncludedHeader>,
    pub nested_includes: Vec<IncludedHeader>,
    pub direct_edges: Vec<IncludeEdge>,
    pub used_macros: Vec<MacroUsage>,
    pub missing_includes: Vec<MissingInclude>,
}

impl PreprocessedSource {
    pub fn is_empty(&self) -> bool {
        self.top_includes.is_empty()
            && self.nested_includes.is_empty()
            && self.direct_edges.is_empty()
            && self.used_macros.is_empty()
            && self.missing_includes.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Cannot read source {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Preprocessing {path} failed: {reason}")]
    Failed { path: PathBuf, reason: String },
}

/// Produces include and macro facts for one compile unit
#[cfg_attr(test, mockall::automock)]
pub trait Preprocessor: Send + Sync {
    fn preprocess(
        &self,
        source: &Path,
        arguments: &[String],
        unsaved: &[UnsavedFile],
    ) -> Result<PreprocessedSource, PreprocessError>;
}

// ============================================================================
// Directive parsing
// ============================================================================

/// One preprocessor directive of interest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Include { spelling: String, angled: bool },
    /// `#ifndef NAME`, kept apart for header guard detection
    IfNotDefined(String),
    Define(String),
    /// Any other directive that reads macro names
    Consults(Vec<String>),
}

/// Regex-based directive parser
#[derive(Clone)]
pub struct DirectiveParser {
    include_regex: Regex,
    test_regex: Regex,
    condition_regex: Regex,
    define_regex: Regex,
    identifier_regex: Regex,
}

impl DirectiveParser {
    /// Create a new parser with compiled regex patterns
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            // #include "a.h" / #include <vector> / #import "m.h"
            include_regex: Regex::new(r#"^\s*#\s*(?:include|import)\s*([<"])([^>"]+)[>"]"#)?,

            // #ifdef X / #ifndef X / #elifdef X / #elifndef X / #undef X
            test_regex: Regex::new(
                r"^\s*#\s*(ifdef|ifndef|elifdef|elifndef|undef)\s+([A-Za-z_][A-Za-z0-9_]*)",
            )?,

            // #if EXPR / #elif EXPR
            condition_regex: Regex::new(r"^\s*#\s*(?:if|elif)\b(.*)$")?,

            // #define X
            define_regex: Regex::new(r"^\s*#\s*define\s+([A-Za-z_][A-Za-z0-9_]*)")?,

            identifier_regex: Regex::new(r"[A-Za-z_][A-Za-z0-9_]*")?,
        })
    }

    /// Parse a comment-free line
    pub fn parse_line(&self, line: &str) -> Option<Directive> {
        if let Some(captures) = self.include_regex.captures(line) {
            return Some(Directive::Include {
                angled: captures.get(1)?.as_str() == "<",
                spelling: captures.get(2)?.as_str().trim().to_string(),
            });
        }

        if let Some(captures) = self.test_regex.captures(line) {
            let name = captures.get(2)?.as_str().to_string();
            return Some(match captures.get(1)?.as_str() {
                "ifndef" => Directive::IfNotDefined(name),
                _ => Directive::Consults(vec![name]),
            });
        }

        if let Some(captures) = self.condition_regex.captures(line) {
            let names = self
                .identifier_regex
                .find_iter(captures.get(1)?.as_str())
                .map(|m| m.as_str())
                .filter(|name| !matches!(*name, "defined" | "true" | "false"))
                .map(str::to_string)
                .collect();
            return Some(Directive::Consults(names));
        }

        if let Some(captures) = self.define_regex.captures(line) {
            return Some(Directive::Define(captures.get(1)?.as_str().to_string()));
        }

        None
    }

    /// Parse a whole file, dropping comments first
    pub fn parse(&self, content: &str) -> Vec<Directive> {
        let mut in_block_comment = false;
        content
            .lines()
            .filter_map(|line| {
                let code = strip_comments(line, &mut in_block_comment);
                self.parse_line(&code)
            })
            .collect()
    }
}

fn strip_comments(line: &str, in_block_comment: &mut bool) -> String {
    let mut code = String::with_capacity(line.len());
    let mut rest = line;
    loop {
        if *in_block_comment {
            match rest.find("*/") {
                Some(end) => {
                    rest = &rest[end + 2..];
                    *in_block_comment = false;
                }
                None => return code,
            }
        }
        let line_comment = rest.find("//");
        let block_comment = rest.find("/*");
        match (line_comment, block_comment) {
            (Some(line_start), Some(block_start)) if line_start < block_start => {
                code.push_str(&rest[..line_start]);
                return code;
            }
            (_, Some(block_start)) => {
                code.push_str(&rest[..block_start]);
                rest = &rest[block_start + 2..];
                *in_block_comment = true;
            }
            (Some(line_start), None) => {
                code.push_str(&rest[..line_start]);
                return code;
            }
            (None, None) => {
                code.push_str(rest);
                return code;
            }
        }
    }
}

/// Macro names a file consults, minus its own include guard
fn consulted_macros(directives: &[Directive]) -> Vec<String> {
    let guard = match directives {
        [Directive::IfNotDefined(tested), Directive::Define(defined), ..] if tested == defined => {
            Some(tested.as_str())
        }
        _ => None,
    };

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for directive in directives {
        let candidates: &[String] = match directive {
            Directive::IfNotDefined(name) => std::slice::from_ref(name),
            Directive::Consults(consulted) => consulted,
            _ => continue,
        };
        for name in candidates {
            if Some(name.as_str()) != guard && seen.insert(name.clone()) {
                names.push(name.clone());
            }
        }
    }
    names
}

// ============================================================================
// Include scanner
// ============================================================================

/// Directive-level preprocessor over a [`FileSystemTrait`]
///
/// Expands each header once per compile unit, which also terminates include
/// cycles. Conditional blocks are not evaluated: every include is followed.
pub struct IncludeScanner<F: FileSystemTrait> {
    file_system: F,
    parser: DirectiveParser,
    builtin_system_paths: Vec<PathBuf>,
}

impl<F: FileSystemTrait> IncludeScanner<F> {
    pub fn new(file_system: F) -> Result<Self, regex::Error> {
        Ok(Self {
            file_system,
            parser: DirectiveParser::new()?,
            builtin_system_paths: Vec::new(),
        })
    }

    /// System directories searched after every path from the arguments
    pub fn with_builtin_system_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.builtin_system_paths = paths;
        self
    }

    fn read(&self, path: &Path, unsaved: &[UnsavedFile]) -> Result<String, std::io::Error> {
        if let Some(file) = unsaved.iter().find(|file| file.path == path) {
            return Ok(file.content.clone());
        }
        let bytes = self.file_system.read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn exists(&self, path: &Path, unsaved: &[UnsavedFile]) -> bool {
        unsaved.iter().any(|file| file.path == path) || self.file_system.is_file(path)
    }

    fn is_under_system_path(&self, path: &Path, search_paths: &[IncludeSearchPath]) -> bool {
        search_paths
            .iter()
            .filter(|search_path| search_path.kind.is_system())
            .map(|search_path| search_path.path.as_path())
            .chain(self.builtin_system_paths.iter().map(PathBuf::as_path))
            .any(|directory| path.starts_with(directory))
    }

    /// Resolve an include the way a compiler walks its search list
    fn resolve(
        &self,
        includer: &Path,
        spelling: &str,
        angled: bool,
        search_paths: &[IncludeSearchPath],
        unsaved: &[UnsavedFile],
    ) -> Option<IncludedHeader> {
        if !angled {
            let directory = includer.parent().unwrap_or(Path::new("/"));
            let candidate = normalize_path(&directory.join(spelling));
            if self.exists(&candidate, unsaved) {
                let origin = if self.is_under_system_path(&candidate, search_paths) {
                    IncludeOrigin::System
                } else {
                    IncludeOrigin::User
                };
                return Some(IncludedHeader::new(candidate, origin));
            }
        }

        for search_path in search_paths {
            if angled && search_path.kind == SearchPathKind::Quote {
                continue;
            }
            let candidate = normalize_path(&search_path.path.join(spelling));
            if self.exists(&candidate, unsaved) {
                let origin = if search_path.kind.is_system() {
                    IncludeOrigin::System
                } else {
                    IncludeOrigin::Project
                };
                return Some(IncludedHeader::new(candidate, origin));
            }
        }

        self.builtin_system_paths
            .iter()
            .map(|directory| normalize_path(&directory.join(spelling)))
            .find(|candidate| self.exists(candidate, unsaved))
            .map(|candidate| IncludedHeader::new(candidate, IncludeOrigin::System))
    }
}

impl<F: FileSystemTrait> Preprocessor for IncludeScanner<F> {
    fn preprocess(
        &self,
        source: &Path,
        arguments: &[String],
        unsaved: &[UnsavedFile],
    ) -> Result<PreprocessedSource, PreprocessError> {
        let source = normalize_path(source);
        let directory = source.parent().unwrap_or(Path::new("/"));
        let compiler_arguments = CompilerArguments::parse(arguments, directory);
        let search_paths = compiler_arguments.search_paths;

        let source_content =
            self.read(&source, unsaved)
                .map_err(|error| PreprocessError::SourceUnreadable {
                    path: source.clone(),
                    source: error,
                })?;

        let mut result = PreprocessedSource::default();
        let mut expanded: HashSet<PathBuf> = HashSet::from([source.clone()]);
        let mut top_seen: HashSet<PathBuf> = HashSet::new();
        let mut nested_seen: HashSet<PathBuf> = HashSet::new();
        let mut worklist: VecDeque<(PathBuf, String)> =
            VecDeque::from([(source.clone(), source_content)]);

        while let Some((file, content)) = worklist.pop_front() {
            let directives = self.parser.parse(&content);
            let is_source = file == source;

            for name in consulted_macros(&directives) {
                result.used_macros.push(MacroUsage::new(name, file.clone()));
            }

            for directive in &directives {
                let Directive::Include { spelling, angled } = directive else {
                    continue;
                };

                let Some(header) = self.resolve(&file, spelling, *angled, &search_paths, unsaved)
                else {
                    debug!("IncludeScanner: {} not found from {:?}", spelling, file);
                    result
                        .missing_includes
                        .push(MissingInclude::new(file.clone(), spelling.clone()));
                    continue;
                };

                trace!("IncludeScanner: {:?} -> {:?}", file, header.path);
                result
                    .direct_edges
                    .push(IncludeEdge::new(file.clone(), header.path.clone()));

                let (seen, list) = if is_source {
                    (&mut top_seen, &mut result.top_includes)
                } else {
                    (&mut nested_seen, &mut result.nested_includes)
                };
                if seen.insert(header.path.clone()) {
                    list.push(header.clone());
                }

                if expanded.insert(header.path.clone()) {
                    match self.read(&header.path, unsaved) {
                        Ok(content) => worklist.push_back((header.path, content)),
                        Err(error) => {
                            warn!(
                                "IncludeScanner: cannot read {:?}: {} (not expanded)",
                                header.path, error
                            );
                        }
                    }
                }
            }
        }

        debug!(
            "IncludeScanner: {:?}: {} top, {} nested, {} missing",
            source,
            result.top_includes.len(),
            result.nested_includes.len(),
            result.missing_includes.len()
        );
        Ok(result)
    }
}
