//! LRU cache of tokenized files.
//!
//! The detector consults the cache between files, not inside tight loops,
//! so a single coarse mutex around an [`lru::LruCache`] is all the
//! concurrency this needs.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::token::TokenizedFile;

/// Default capacity in files.
const DEFAULT_CAPACITY: usize = 1000;

/// Hit/miss counters for cache introspection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Hit ratio in [0, 1]; 0 when the cache has never been queried.
    #[must_use]
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

struct CacheInner {
    entries: lru::LruCache<PathBuf, TokenizedFile>,
    hits: u64,
    misses: u64,
}

/// Thread-safe LRU cache keyed by source path.
pub struct TokenCache {
    inner: Mutex<CacheInner>,
}

impl TokenCache {
    /// Create a cache with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a cache holding at most `capacity` files (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            inner: Mutex::new(CacheInner {
                entries: lru::LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Look up a tokenized file, refreshing its recency on a hit.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<TokenizedFile> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.entries.get(path) {
            Some(file) => {
                let file = file.clone();
                inner.hits += 1;
                trace!(path = %path.display(), "token cache hit");
                Some(file)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Insert a tokenized file, evicting the least recently used entry if
    /// the cache is full.
    pub fn put(&self, path: PathBuf, file: TokenizedFile) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.put(path, file);
    }

    /// Drop all entries and reset the counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            len: inner.entries.len(),
            capacity: inner.entries.cap().get(),
        }
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}
