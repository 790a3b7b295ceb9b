//! I/O layer - file access and file status abstractions
//!
//! - **File system**: trait-based file access so the include scanner can run
//!   against the real disk or an in-memory tree
//! - **File status**: size and modification time lookup by interned path id

pub mod file_status;
pub mod file_system;

pub use file_status::{
    FileStatusProvider, FileSystemStatusProvider, StatusError, Timestamp, timestamp_from,
};
pub use file_system::{FileMetadata, FileSystemTrait, RealFileSystem};

#[cfg(test)]
pub use file_status::MockFileStatusProvider;
#[cfg(test)]
pub use file_system::TestFileSystem;
