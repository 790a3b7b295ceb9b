//! File status lookup by interned path id
//!
//! The status provider is a pure read: it snapshots size and modification time
//! and keeps no cache of its own.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

use crate::cache::{FilePathCache, FilePathId};
use crate::error::PipelineError;
use crate::io::file_system::FileSystemTrait;

/// Modification timestamps as recorded in file statuses and source entries
pub type Timestamp = DateTime<Utc>;

/// Convert a file system time to a [`Timestamp`]
pub fn timestamp_from(time: SystemTime) -> Timestamp {
    DateTime::<Utc>::from(time)
}

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Unknown file path: {0}")]
    UnknownPath(#[from] PipelineError),

    #[error("Cannot stat {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Size and modification time of a file, addressed by path id
#[cfg_attr(test, mockall::automock)]
pub trait FileStatusProvider: Send + Sync {
    /// Current on-disk modification time
    fn last_modified(&self, id: FilePathId) -> Result<Timestamp, StatusError>;

    /// Current on-disk size in bytes
    fn size(&self, id: FilePathId) -> Result<u64, StatusError>;
}

/// Status provider backed by a [`FileSystemTrait`] and the shared path cache
pub struct FileSystemStatusProvider<F: FileSystemTrait> {
    file_system: F,
    cache: Arc<FilePathCache>,
}

impl<F: FileSystemTrait> FileSystemStatusProvider<F> {
    pub fn new(file_system: F, cache: Arc<FilePathCache>) -> Self {
        Self { file_system, cache }
    }

    fn metadata(&self, id: FilePathId) -> Result<crate::io::FileMetadata, StatusError> {
        let path = self.cache.file_path(id)?;
        self.file_system
            .metadata(&path)
            .map_err(|source| StatusError::Io { path, source })
    }
}

impl<F: FileSystemTrait> FileStatusProvider for FileSystemStatusProvider<F> {
    fn last_modified(&self, id: FilePathId) -> Result<Timestamp, StatusError> {
        self.metadata(id).map(|metadata| timestamp_from(metadata.modified))
    }

    fn size(&self, id: FilePathId) -> Result<u64, StatusError> {
        self.metadata(id).map(|metadata| metadata.size)
    }
}
