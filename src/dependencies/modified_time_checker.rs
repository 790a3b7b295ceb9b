//! Staleness detection by modification time
//!
//! Entries carry the time a file was captured at its last successful index. A
//! set of entries is up to date when no tracked file is newer than that. The
//! checker remembers the on-disk times it used, so repeated checks only go back
//! to the status provider for paths reported as changed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::cache::FilePathId;
use crate::dependencies::types::SourceEntry;
use crate::io::{FileStatusProvider, Timestamp};

pub struct ModifiedTimeChecker {
    status_provider: Arc<dyn FileStatusProvider>,
    current_timestamps: HashMap<FilePathId, Timestamp>,
    changed: HashSet<FilePathId>,
}

impl ModifiedTimeChecker {
    pub fn new(status_provider: Arc<dyn FileStatusProvider>) -> Self {
        Self {
            status_provider,
            current_timestamps: HashMap::new(),
            changed: HashSet::new(),
        }
    }

    /// True when every entry's file is no newer than its recorded time
    ///
    /// An empty entry set means "never indexed" and is never up to date. A
    /// file whose status cannot be read counts as stale.
    pub fn is_up_to_date(&mut self, entries: &[SourceEntry]) -> bool {
        if entries.is_empty() {
            return false;
        }

        let mut up_to_date = true;
        for entry in entries {
            match self.current_timestamp(entry.source_id) {
                Some(current) if current <= entry.last_modified => {}
                Some(current) => {
                    trace!(
                        "ModifiedTimeChecker: {} modified at {} after {}",
                        entry.source_id, current, entry.last_modified
                    );
                    up_to_date = false;
                }
                None => up_to_date = false,
            }
        }
        up_to_date
    }

    /// Force the given paths to be re-read on the next check
    pub fn paths_changed(&mut self, ids: &[FilePathId]) {
        debug!("ModifiedTimeChecker: {} paths changed", ids.len());
        self.changed.extend(ids.iter().copied());
    }

    /// Forget every remembered timestamp
    pub fn reset(&mut self) {
        self.current_timestamps.clear();
        self.changed.clear();
    }

    /// Remembered on-disk time of a path, if any
    pub fn remembered_timestamp(&self, id: FilePathId) -> Option<Timestamp> {
        self.current_timestamps.get(&id).copied()
    }

    fn current_timestamp(&mut self, id: FilePathId) -> Option<Timestamp> {
        if !self.changed.contains(&id)
            && let Some(timestamp) = self.current_timestamps.get(&id)
        {
            return Some(*timestamp);
        }

        match self.status_provider.last_modified(id) {
            Ok(timestamp) => {
                // Overwrite only after a successful read
                self.current_timestamps.insert(id, timestamp);
                self.changed.remove(&id);
                Some(timestamp)
            }
            Err(e) => {
                debug!("ModifiedTimeChecker: cannot read status of {}: {}", id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependencies::types::SourceKind;
    use crate::io::{MockFileStatusProvider, StatusError};

    fn time(secs: i64) -> Timestamp {
        Timestamp::from_timestamp(secs, 0).unwrap()
    }

    fn entry(id: u32, recorded: i64) -> SourceEntry {
        SourceEntry::new(FilePathId(id), SourceKind::ProjectInclude, time(recorded), false)
    }

    fn provider_with(times: &'static [(u32, i64)]) -> MockFileStatusProvider {
        let mut provider = MockFileStatusProvider::new();
        provider.expect_last_modified().returning(move |id| {
            times
                .iter()
                .find(|(known, _)| *known == id.0)
                .map(|(_, secs)| time(*secs))
                .ok_or_else(|| StatusError::Io {
                    path: format!("/{}", id.0).into(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
                })
        });
        provider
    }

    #[test]
    fn test_empty_entries_are_not_up_to_date() {
        let mut checker = ModifiedTimeChecker::new(Arc::new(MockFileStatusProvider::new()));

        assert!(!checker.is_up_to_date(&[]));
    }

    #[test]
    fn test_older_and_equal_files_are_up_to_date() {
        let mut checker = ModifiedTimeChecker::new(Arc::new(provider_with(&[(1, 50), (2, 100)])));

        assert!(checker.is_up_to_date(&[entry(1, 100), entry(2, 100)]));
    }

    #[test]
    fn test_newer_file_is_stale() {
        let mut checker = ModifiedTimeChecker::new(Arc::new(provider_with(&[(1, 50), (2, 101)])));

        assert!(!checker.is_up_to_date(&[entry(1, 100), entry(2, 100)]));
    }

    #[test]
    fn test_unreadable_file_is_stale() {
        let mut checker = ModifiedTimeChecker::new(Arc::new(provider_with(&[(1, 50)])));

        assert!(!checker.is_up_to_date(&[entry(1, 100), entry(7, 100)]));
        assert_eq!(checker.remembered_timestamp(FilePathId(7)), None);
    }

    #[test]
    fn test_remembered_timestamps_skip_provider() {
        let mut provider = MockFileStatusProvider::new();
        provider
            .expect_last_modified()
            .times(1)
            .returning(|_| Ok(time(10)));
        let mut checker = ModifiedTimeChecker::new(Arc::new(provider));

        assert!(checker.is_up_to_date(&[entry(1, 20)]));
        assert!(checker.is_up_to_date(&[entry(1, 20)]));
        assert_eq!(checker.remembered_timestamp(FilePathId(1)), Some(time(10)));
    }

    #[test]
    fn test_paths_changed_forces_reread() {
        let mut provider = MockFileStatusProvider::new();
        let mut sequence = mockall::Sequence::new();
        provider
            .expect_last_modified()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(time(10)));
        provider
            .expect_last_modified()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(time(30)));
        let mut checker = ModifiedTimeChecker::new(Arc::new(provider));

        assert!(checker.is_up_to_date(&[entry(1, 20)]));
        checker.paths_changed(&[FilePathId(1)]);
        assert!(!checker.is_up_to_date(&[entry(1, 20)]));
        // Second check uses the refreshed remembered value
        assert!(!checker.is_up_to_date(&[entry(1, 20)]));
    }

    #[test]
    fn test_failed_reread_keeps_previous_value() {
        let mut provider = MockFileStatusProvider::new();
        let mut sequence = mockall::Sequence::new();
        provider
            .expect_last_modified()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(time(10)));
        provider
            .expect_last_modified()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| {
                Err(StatusError::Io {
                    path: "/a.h".into(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
                })
            });
        let mut checker = ModifiedTimeChecker::new(Arc::new(provider));

        checker.is_up_to_date(&[entry(1, 20)]);
        checker.paths_changed(&[FilePathId(1)]);

        assert!(!checker.is_up_to_date(&[entry(1, 20)]));
        assert_eq!(checker.remembered_timestamp(FilePathId(1)), Some(time(10)));
    }

    #[test]
    fn test_reset_forgets_everything() {
        let mut provider = MockFileStatusProvider::new();
        provider
            .expect_last_modified()
            .times(2)
            .returning(|_| Ok(time(10)));
        let mut checker = ModifiedTimeChecker::new(Arc::new(provider));

        checker.is_up_to_date(&[entry(1, 20)]);
        checker.reset();
        checker.is_up_to_date(&[entry(1, 20)]);
    }
}
