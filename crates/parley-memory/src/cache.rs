//! Fixed-capacity LRU cache of encoded images, keyed by source URL.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use tracing::warn;

/// Default number of cached images.
pub const DEFAULT_CACHE_CAPACITY: usize = 32;

/// Thread-safe LRU map from attachment URL to data URI.
///
/// A lookup promotes the entry to most-recently-used. An insert that grows
/// the map past capacity evicts the least-recently-used entry. Both happen
/// inside one critical section.
pub struct ImageCache {
    entries: Mutex<LruCache<String, String>>,
}

impl ImageCache {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, String>> {
        self.entries.lock().unwrap_or_else(|e| {
            warn!("ImageCache lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Look up `url`, marking it most-recently-used on a hit.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<String> {
        self.lock().get(url).cloned()
    }

    /// Insert or refresh `url`. Returns the evicted URL, if any.
    pub fn insert(&self, url: String, data_uri: String) -> Option<String> {
        let mut entries = self.lock();
        match entries.push(url, data_uri) {
            // `push` hands back the old pair when the key already existed.
            Some((old_key, _)) if !entries.contains(&old_key) => Some(old_key),
            _ => None,
        }
    }

    /// Whether `url` is cached. Does not change recency.
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.lock();
        f.debug_struct("ImageCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}
