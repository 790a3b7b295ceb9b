//! Pipeline-wide error taxonomy
//!
//! Per-file failures (unreadable headers, failed preprocessor runs) never show up
//! here: they are absorbed by the stage that hit them and recorded as data. What
//! remains are lookups of keys that were never registered and broken invariants
//! that must abort the current pipeline invocation.

use thiserror::Error;

use crate::project::{CompilationDatabaseError, ProjectError};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// An id was never allocated by the cache it was looked up in
    #[error("Unknown id: {id}")]
    UnknownId { id: usize },

    /// A project part id was never registered
    #[error("Unknown project part: {id}")]
    UnknownProjectPart { id: u32 },

    /// A collaborator handed over data that breaks a pipeline invariant
    #[error("Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Compilation database error: {0}")]
    CompilationDatabase(#[from] CompilationDatabaseError),

    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl PipelineError {
    /// Create an invariant violation error
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            reason: reason.into(),
        }
    }

    /// Whether the caller can recover by registering the missing key
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PipelineError::UnknownId { .. } | PipelineError::UnknownProjectPart { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(PipelineError::UnknownId { id: 3 }.is_not_found());
        assert!(PipelineError::UnknownProjectPart { id: 1 }.is_not_found());
        assert!(!PipelineError::invariant("broken").is_not_found());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(PipelineError::UnknownId { id: 7 }.to_string(), "Unknown id: 7");
        assert_eq!(
            PipelineError::invariant("task dispatched twice").to_string(),
            "Invariant violation: task dispatched twice"
        );
    }
}
