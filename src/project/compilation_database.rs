//! compile_commands.json loading

use json_compilation_db::Entry;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::cache::FilePathCache;
use crate::dependencies::shared_arguments;
use crate::project::{ProjectPart, ProjectPartId};

#[derive(Error, Debug)]
pub enum CompilationDatabaseError {
    #[error("Compilation database file not found: {path}")]
    FileNotFound { path: String },
    #[error("Failed to read compilation database file: {error}")]
    ReadError { error: String },
    #[error("Failed to parse compilation database JSON: {error}")]
    ParseError { error: String },
    #[error("Compilation database is empty")]
    EmptyDatabase,
}

/// A loaded `compile_commands.json`
///
/// Serializes as its path only; entries can be large.
#[derive(Debug)]
pub struct CompilationDatabase {
    pub path: PathBuf,
    pub entries: Vec<Entry>,
}

impl CompilationDatabase {
    /// Load and parse the database, rejecting missing files and empty arrays
    pub fn new(path: PathBuf) -> Result<Self, CompilationDatabaseError> {
        if !path.is_file() {
            return Err(CompilationDatabaseError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        let content = std::fs::read(&path).map_err(|e| CompilationDatabaseError::ReadError {
            error: e.to_string(),
        })?;
        let entries: Vec<Entry> =
            serde_json::from_slice(&content).map_err(|e| CompilationDatabaseError::ParseError {
                error: e.to_string(),
            })?;
        if entries.is_empty() {
            return Err(CompilationDatabaseError::EmptyDatabase);
        }

        debug!(
            "CompilationDatabase: loaded {} entries from {:?}",
            entries.len(),
            path
        );
        Ok(Self { path, entries })
    }

    /// Group entries into project parts by their shared compile arguments
    ///
    /// Entries whose arguments only differ in the source, the output and
    /// dependency-file flags land in the same part. Parts are numbered from
    /// `first_id` in the order their first entry appears.
    pub fn project_parts(&self, cache: &FilePathCache, first_id: u32) -> Vec<ProjectPart> {
        let mut parts: Vec<ProjectPart> = Vec::new();

        for entry in &self.entries {
            let arguments = shared_arguments(&entry.arguments, &entry.file, &entry.directory);
            let source = cache.file_path_id(entry.directory.join(&entry.file));

            match parts
                .iter_mut()
                .find(|part| part.directory == entry.directory && part.arguments == arguments)
            {
                Some(part) => part.add_source(source),
                None => {
                    let id = ProjectPartId(first_id + parts.len() as u32);
                    let name = format!("{}:{}", entry.directory.display(), id.0);
                    parts.push(
                        ProjectPart::new(id, name, entry.directory.clone(), arguments)
                            .with_sources(vec![source]),
                    );
                }
            }
        }

        debug!(
            "CompilationDatabase: {} entries grouped into {} project parts",
            self.entries.len(),
            parts.len()
        );
        parts
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an entry names `file_path` exactly as written in the database
    pub fn contains_file(&self, file_path: &Path) -> bool {
        self.entries.iter().any(|entry| entry.file == file_path)
    }
}

impl Serialize for CompilationDatabase {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.path.serialize(serializer)
    }
}
