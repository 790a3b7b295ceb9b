//! Test doubles for the dependency collaborators
//!
//! Provides a scripted preprocessor and a fixed-time status provider so the
//! collector and everything downstream of it can be tested without a
//! compiler or a file system.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::cache::FilePathId;
use crate::dependencies::preprocessor::{
    PreprocessError, PreprocessedSource, Preprocessor, UnsavedFile,
};
use crate::io::{FileStatusProvider, StatusError, Timestamp};

// ============================================================================
// Scripted Preprocessor
// ============================================================================

/// Preprocessor answering from a per-source script
///
/// Sources without a script fail, which exercises the collector's
/// degrade-to-empty path.
#[derive(Default)]
pub struct ScriptedPreprocessor {
    scripts: Mutex<HashMap<PathBuf, PreprocessedSource>>,
    calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
}

impl ScriptedPreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, source: impl Into<PathBuf>, result: PreprocessedSource) {
        self.scripts.lock().insert(source.into(), result);
    }

    /// Every (source, arguments) pair seen so far
    pub fn calls(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.calls.lock().clone()
    }
}

impl Preprocessor for ScriptedPreprocessor {
    fn preprocess(
        &self,
        source: &Path,
        arguments: &[String],
        _unsaved: &[UnsavedFile],
    ) -> Result<PreprocessedSource, PreprocessError> {
        self.calls
            .lock()
            .push((source.to_path_buf(), arguments.to_vec()));
        self.scripts
            .lock()
            .get(source)
            .cloned()
            .ok_or_else(|| PreprocessError::Failed {
                path: source.to_path_buf(),
                reason: "no script".to_string(),
            })
    }
}

// ============================================================================
// Fixed Status Provider
// ============================================================================

/// Status provider returning the same time for every file unless overridden
pub struct FixedStatusProvider {
    default_secs: i64,
    overrides: Mutex<HashMap<FilePathId, i64>>,
}

impl FixedStatusProvider {
    pub fn new(default_secs: i64) -> Self {
        Self {
            default_secs,
            overrides: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_modified(&self, id: FilePathId, secs: i64) {
        self.overrides.lock().insert(id, secs);
    }
}

impl FileStatusProvider for FixedStatusProvider {
    fn last_modified(&self, id: FilePathId) -> Result<Timestamp, StatusError> {
        let secs = self
            .overrides
            .lock()
            .get(&id)
            .copied()
            .unwrap_or(self.default_secs);
        Ok(Timestamp::from_timestamp(secs, 0).unwrap_or_default())
    }

    fn size(&self, _id: FilePathId) -> Result<u64, StatusError> {
        Ok(1)
    }
}
