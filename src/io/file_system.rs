//! File system abstraction layer
//!
//! Provides trait-based abstractions for file system operations, enabling
//! dependency injection and testing through an in-memory implementation.

use std::path::Path;
use std::time::SystemTime;

// ============================================================================
// File Metadata
// ============================================================================

/// Simplified, testable alternative to `std::fs::Metadata`
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    /// Last modification time
    pub modified: SystemTime,
    /// File size in bytes
    pub size: u64,
}

impl FileMetadata {
    /// Create new file metadata
    pub fn new(modified: SystemTime, size: u64) -> Self {
        Self { modified, size }
    }

    /// Convert from standard library metadata
    pub fn from_std_metadata(metadata: &std::fs::Metadata) -> Result<Self, std::io::Error> {
        Ok(Self {
            modified: metadata.modified()?,
            size: metadata.len(),
        })
    }
}

// ============================================================================
// File System Trait
// ============================================================================

/// Trait for file system operations
///
/// Only regular files are of interest: headers and sources.
pub trait FileSystemTrait: Send + Sync {
    /// Check if a regular file exists
    fn is_file(&self, path: &Path) -> bool;

    /// Read file contents as bytes
    fn read(&self, path: &Path) -> Result<Vec<u8>, std::io::Error>;

    /// Get file metadata (modification time and size)
    fn metadata(&self, path: &Path) -> Result<FileMetadata, std::io::Error>;
}

// ============================================================================
// Real File System Implementation
// ============================================================================

/// Real file system implementation using std::fs
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystemTrait for RealFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, std::io::Error> {
        std::fs::read(path)
    }

    fn metadata(&self, path: &Path) -> Result<FileMetadata, std::io::Error> {
        let metadata = std::fs::metadata(path)?;
        FileMetadata::from_std_metadata(&metadata)
    }
}

// ============================================================================
// Test File System Implementation
// ============================================================================

#[cfg(test)]
mod test_filesystem {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, UNIX_EPOCH};

    /// In-memory filesystem state for testing scenarios
    type TestFileData = HashMap<PathBuf, (Vec<u8>, SystemTime)>;

    /// In-memory file tree shared between clones
    #[derive(Clone, Default)]
    pub struct TestFileSystem {
        state: Arc<Mutex<TestFileData>>,
    }

    impl TestFileSystem {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add or replace a file, stamping it with `secs` after the epoch
        pub fn add_file<P: Into<PathBuf>>(&self, path: P, content: &str, secs: u64) {
            self.set_file_content(path, content, UNIX_EPOCH + Duration::from_secs(secs));
        }

        pub fn set_file_content<P: Into<PathBuf>>(
            &self,
            path: P,
            content: &str,
            modified: SystemTime,
        ) {
            let mut state = self.state.lock().unwrap();
            state.insert(path.into(), (content.as_bytes().to_vec(), modified));
        }

        /// Bump only the modification time of an existing file
        pub fn touch<P: AsRef<Path>>(&self, path: P, secs: u64) {
            let mut state = self.state.lock().unwrap();
            if let Some(entry) = state.get_mut(path.as_ref()) {
                entry.1 = UNIX_EPOCH + Duration::from_secs(secs);
            }
        }

        pub fn remove_file<P: AsRef<Path>>(&self, path: P) {
            self.state.lock().unwrap().remove(path.as_ref());
        }
    }

    impl FileSystemTrait for TestFileSystem {
        fn is_file(&self, path: &Path) -> bool {
            let state = self.state.lock().unwrap();
            state.contains_key(path)
        }

        fn read(&self, path: &Path) -> Result<Vec<u8>, std::io::Error> {
            let state = self.state.lock().unwrap();
            state
                .get(path)
                .map(|(content, _)| content.clone())
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "File not found"))
        }

        fn metadata(&self, path: &Path) -> Result<FileMetadata, std::io::Error> {
            let state = self.state.lock().unwrap();
            state
                .get(path)
                .map(|(content, modified)| FileMetadata {
                    modified: *modified,
                    size: content.len() as u64,
                })
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "File not found"))
        }
    }
}

#[cfg(test)]
pub use test_filesystem::TestFileSystem;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_test_filesystem_basic_operations() {
        let fs = TestFileSystem::new();
        let path = PathBuf::from("/project/include/a.h");

        assert!(!fs.is_file(&path));

        fs.add_file(&path, "#pragma once\n", 1000);
        assert!(fs.is_file(&path));
        assert_eq!(fs.read(&path).unwrap(), b"#pragma once\n");

        let metadata = fs.metadata(&path).unwrap();
        assert_eq!(metadata.modified, UNIX_EPOCH + Duration::from_secs(1000));
        assert_eq!(metadata.size, 13);
    }

    #[test]
    fn test_touch_and_remove() {
        let fs = TestFileSystem::new();
        let path = PathBuf::from("/project/a.h");
        fs.add_file(&path, "int a;", 10);

        fs.touch(&path, 20);
        assert_eq!(
            fs.metadata(&path).unwrap().modified,
            UNIX_EPOCH + Duration::from_secs(20)
        );

        fs.remove_file(&path);
        assert!(fs.read(&path).is_err());
    }

    #[test]
    fn test_clones_share_state() {
        let fs1 = TestFileSystem::new();
        let fs2 = fs1.clone();

        fs1.add_file("/shared.h", "x", 1);
        assert!(fs2.is_file(Path::new("/shared.h")));
    }

    #[test]
    fn test_real_filesystem_missing_file() {
        let fs = RealFileSystem;
        let non_existent = PathBuf::from("/definitely/does/not/exist.h");

        assert!(!fs.is_file(&non_existent));
        assert!(fs.read(&non_existent).is_err());
        assert!(fs.metadata(&non_existent).is_err());
    }

    #[test]
    fn test_real_filesystem_reads_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("real.h");
        std::fs::write(&path, "int real;").unwrap();

        let fs = RealFileSystem;
        assert!(fs.is_file(&path));
        assert_eq!(fs.metadata(&path).unwrap().size, 9);
    }
}
