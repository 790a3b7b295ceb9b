use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path does not exist: {path}")]
    PathNotFound { path: String },

    #[error("Compilation database not found under: {path}")]
    CompilationDatabaseNotFound { path: String },

    #[error("Invalid project root: {reason}")]
    InvalidRoot { reason: String },
}
