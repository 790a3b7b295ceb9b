//! File path interning
//!
//! Every file the pipeline touches is identified by a [`FilePathId`]. Paths are
//! normalized lexically before interning so `a/./b.h` and `a/c/../b.h` share one id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::cache::string_cache::{CacheId, StringCache};
use crate::error::PipelineError;

/// Dense id of one normalized file path
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FilePathId(pub u32);

impl CacheId for FilePathId {
    fn from_index(index: usize) -> Self {
        FilePathId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FilePathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Remove `.` components and fold `..` into their parent without touching the disk
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Process-wide path cache, shared by `Arc` between pipeline stages
pub struct FilePathCache {
    paths: StringCache<FilePathId, Path>,
}

impl FilePathCache {
    pub fn new() -> Self {
        Self {
            paths: StringCache::new(),
        }
    }

    /// Convenience constructor for the shared handle every stage takes
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Id of `path`, allocating one for a path seen for the first time
    pub fn file_path_id(&self, path: impl AsRef<Path>) -> FilePathId {
        self.paths.id(&normalize_path(path.as_ref()))
    }

    /// Batch form of [`FilePathCache::file_path_id`], preserving input order
    pub fn file_path_ids<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<FilePathId> {
        let normalized: Vec<PathBuf> = paths
            .iter()
            .map(|path| normalize_path(path.as_ref()))
            .collect();
        self.paths.ids(&normalized)
    }

    /// Id of an already interned path
    pub fn find(&self, path: impl AsRef<Path>) -> Option<FilePathId> {
        self.paths.find(&normalize_path(path.as_ref()))
    }

    /// Resolve an id back to its path
    pub fn file_path(&self, id: FilePathId) -> Result<PathBuf, PipelineError> {
        self.paths.string(id).map(|path| path.to_path_buf())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Default for FilePathCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/project/./src/../include/a.h")),
            PathBuf::from("/project/include/a.h")
        );
        assert_eq!(
            normalize_path(Path::new("../up/x.h")),
            PathBuf::from("../up/x.h")
        );
    }

    #[test]
    fn test_equal_paths_share_id() {
        let cache = FilePathCache::new();

        let first = cache.file_path_id("/project/include/a.h");
        let second = cache.file_path_id("/project/src/../include/./a.h");

        assert_eq!(first, second);
        assert_eq!(first, FilePathId(0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_round_trip_path() {
        let cache = FilePathCache::new();
        let id = cache.file_path_id("/project/main.cpp");

        assert_eq!(cache.file_path(id).unwrap(), PathBuf::from("/project/main.cpp"));
    }

    #[test]
    fn test_unknown_path_id() {
        let cache = FilePathCache::new();

        assert!(cache.file_path(FilePathId(42)).unwrap_err().is_not_found());
        assert_eq!(cache.find("/never/seen.h"), None);
    }

    #[test]
    fn test_batch_ids() {
        let cache = FilePathCache::new();
        cache.file_path_id("/b.h");

        let ids = cache.file_path_ids(&["/a.h", "/b.h", "/./a.h"]);

        assert_eq!(ids, vec![FilePathId(1), FilePathId(0), FilePathId(1)]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_paths_keep_distinct_ids() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let cache = FilePathCache::new();
        let first = Path::new(OsStr::from_bytes(b"/p/\xff.h"));
        let second = Path::new(OsStr::from_bytes(b"/p/\xfe.h"));

        let first_id = cache.file_path_id(first);
        let second_id = cache.file_path_id(second);

        assert_ne!(first_id, second_id);
        assert_eq!(cache.file_path(first_id).unwrap(), first);
        assert_eq!(cache.file_path(second_id).unwrap(), second);
        assert_eq!(cache.find(second), Some(second_id));
    }
}
