//! Interned string and file path caches
//!
//! Paths and other ever-repeated strings are mapped to small dense ids once and
//! referred to by id everywhere else. The caches are explicit objects shared
//! through `Arc`, never hidden statics.

pub mod file_path_cache;
pub mod string_cache;

pub use file_path_cache::{FilePathCache, FilePathId, normalize_path};
pub use string_cache::{CacheId, CacheKey, StringCache};
