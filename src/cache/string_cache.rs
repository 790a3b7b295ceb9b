//! Bidirectional string <-> dense id cache
//!
//! Ids are allocated in first-seen order starting at 0 and are never reused.
//! The cache never shrinks. Keys default to `str`; any unsized key with an
//! `Arc` conversion works, so paths are interned as `Path` without a lossy
//! detour through UTF-8.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use tracing::trace;

use crate::error::PipelineError;

/// Dense integer id handed out by a [`StringCache`]
pub trait CacheId: Copy + Eq + std::hash::Hash + std::fmt::Debug {
    /// Build the id for a storage index
    fn from_index(index: usize) -> Self;

    /// Storage index of this id
    fn index(self) -> usize;
}

/// Key types a [`StringCache`] can intern
pub trait CacheKey: Eq + Hash + fmt::Debug {
    fn shared(&self) -> Arc<Self>;
}

impl CacheKey for str {
    fn shared(&self) -> Arc<Self> {
        Arc::from(self)
    }
}

impl CacheKey for std::path::Path {
    fn shared(&self) -> Arc<Self> {
        Arc::from(self)
    }
}

struct CacheEntries<Id, S: ?Sized> {
    strings: Vec<Arc<S>>,
    ids: HashMap<Arc<S>, Id>,
}

impl<Id: CacheId, S: CacheKey + ?Sized> CacheEntries<Id, S> {
    fn insert(&mut self, string: &S) -> Id {
        if let Some(&id) = self.ids.get(string) {
            return id;
        }

        let id = Id::from_index(self.strings.len());
        let shared = string.shared();
        self.strings.push(Arc::clone(&shared));
        self.ids.insert(shared, id);
        trace!("StringCache: allocated {:?} for {:?}", id, string);
        id
    }
}

/// Thread-safe interning cache
///
/// Reads take a shared lock; allocation re-checks under the write lock so two
/// racing callers for the same string always agree on one id.
pub struct StringCache<Id, S: ?Sized = str> {
    entries: RwLock<CacheEntries<Id, S>>,
}

impl<Id: CacheId, S: CacheKey + ?Sized> StringCache<Id, S> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(CacheEntries {
                strings: Vec::new(),
                ids: HashMap::new(),
            }),
        }
    }

    /// Return the id of `string`, allocating the next id if it is new
    pub fn id(&self, string: &S) -> Id {
        {
            let entries = self.entries.read();
            if let Some(&id) = entries.ids.get(string) {
                return id;
            }
        }

        self.entries.write().insert(string)
    }

    /// Batch form of [`StringCache::id`]; output order matches input order
    pub fn ids<T: AsRef<S>>(&self, strings: &[T]) -> Vec<Id> {
        let mut entries = self.entries.write();
        strings
            .iter()
            .map(|string| entries.insert(string.as_ref()))
            .collect()
    }

    /// Look up a string that was already interned without allocating
    pub fn find(&self, string: &S) -> Option<Id> {
        self.entries.read().ids.get(string).copied()
    }

    /// Resolve an id back to its string
    pub fn string(&self, id: Id) -> Result<Arc<S>, PipelineError> {
        self.entries
            .read()
            .strings
            .get(id.index())
            .cloned()
            .ok_or(PipelineError::UnknownId { id: id.index() })
    }

    /// Number of interned strings
    pub fn len(&self) -> usize {
        self.entries.read().strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<Id: CacheId, S: CacheKey + ?Sized> Default for StringCache<Id, S> {
    fn default() -> Self {
        Self::new()
    }
}
