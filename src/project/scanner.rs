use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::project::ProjectError;

const COMPILATION_DATABASE_FILE: &str = "compile_commands.json";

/// Options for configuring project scanning behavior
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Skip hidden directories (starting with '.')
    pub skip_hidden: bool,

    /// Follow symbolic links during traversal
    pub follow_symlinks: bool,

    /// Maximum number of databases to discover (None = unlimited)
    pub max_databases: Option<usize>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            skip_hidden: true,
            follow_symlinks: false,
            max_databases: None,
        }
    }
}

/// Project scanner for discovering compilation databases in a workspace
#[derive(Debug, Default)]
pub struct ProjectScanner;

impl ProjectScanner {
    pub fn new() -> Self {
        Self
    }

    /// Find every `compile_commands.json` below `root_path`
    ///
    /// # Arguments
    /// * `root_path` - Root directory to start scanning from
    /// * `depth` - Maximum directory depth to traverse (0 = only root, 1 = root + immediate children, etc.)
    /// * `options` - Optional scanning configuration
    ///
    /// # Returns
    /// Database paths in traversal order, sorted by file name within a directory
    pub fn find_compilation_databases(
        &self,
        root_path: &Path,
        depth: usize,
        options: Option<ScanOptions>,
    ) -> Result<Vec<PathBuf>, ProjectError> {
        let options = options.unwrap_or_default();

        // Validate root path
        if !root_path.exists() {
            return Err(ProjectError::PathNotFound {
                path: root_path.to_string_lossy().to_string(),
            });
        }

        if !root_path.is_dir() {
            return Err(ProjectError::InvalidRoot {
                reason: format!("Root path is not a directory: {}", root_path.display()),
            });
        }

        let mut databases = Vec::new();

        // +1 because walkdir counts the root itself as depth 0 and the database is a file
        let walker = WalkDir::new(root_path)
            .max_depth(depth + 1)
            .follow_links(options.follow_symlinks)
            .sort_by_file_name();

        let skip_hidden = options.skip_hidden;
        let entries = walker.into_iter().filter_entry(move |entry| {
            !(skip_hidden
                && entry.depth() > 0
                && entry.file_type().is_dir()
                && entry.file_name().to_string_lossy().starts_with('.'))
        });

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // Log the error but continue scanning
                    tracing::warn!("Failed to access directory entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || entry.file_name() != COMPILATION_DATABASE_FILE {
                continue;
            }

            tracing::debug!(
                "ProjectScanner: found compilation database {}",
                entry.path().display()
            );
            databases.push(entry.path().to_path_buf());

            if let Some(max) = options.max_databases
                && databases.len() >= max
            {
                break;
            }
        }

        Ok(databases)
    }
}
