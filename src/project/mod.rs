//! Project discovery
//!
//! Finds compilation databases under a workspace root and groups their entries
//! into project parts: sets of sources that share one compile configuration.

pub mod compilation_database;
pub mod error;
pub mod project_part;
pub mod scanner;

pub use compilation_database::{CompilationDatabase, CompilationDatabaseError};
pub use error::ProjectError;
pub use project_part::{ProjectPart, ProjectPartId};
pub use scanner::{ProjectScanner, ScanOptions};
