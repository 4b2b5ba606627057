//! Bounded label-to-ordinal cache for high-volume ingestion.

use crate::error::{Error, Result};
use crate::segment::types::Ordinal;
use crate::taxonomy::label::FacetLabel;
use lru::LruCache;

/// LRU cache with bulk eviction.
///
/// Resolving a label through the dictionary is much slower than a map hit,
/// so eviction is batched: [`put`](Self::put) reports when the cache has
/// filled, and the caller then invokes [`make_room_lru`](Self::make_room_lru),
/// which frees a third of the capacity in one sweep. Paying eviction in
/// batches keeps per-insert cost flat and leaves recently used entries
/// resident.
///
/// Not internally thread-safe: callers serialize all access to one
/// instance (typically a single indexing writer).
pub struct OrdinalCache {
    cache: LruCache<FacetLabel, Ordinal>,
    max_size: usize,
}

impl OrdinalCache {
    /// Create a cache bounded to `max_size` entries. Zero capacity is
    /// rejected.
    pub fn new(max_size: usize) -> Result<Self> {
        if max_size == 0 {
            return Err(Error::InvalidArgument(
                "cache capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            cache: LruCache::unbounded(),
            max_size,
        })
    }

    /// Cached ordinal for `label`, refreshing its recency.
    pub fn get(&mut self, label: &FacetLabel) -> Option<Ordinal> {
        self.cache.get(label).copied()
    }

    /// Insert a mapping and report whether the cache has reached capacity.
    ///
    /// A `true` return asks the caller to follow up with
    /// [`make_room_lru`](Self::make_room_lru); deferring that call lets
    /// callers batch several inserts per eviction sweep.
    pub fn put(&mut self, label: FacetLabel, ordinal: Ordinal) -> bool {
        self.cache.put(label, ordinal);
        self.cache.len() >= self.max_size
    }

    /// Evict oldest entries until at least a third of the capacity is
    /// free. No-op while the cache is below capacity.
    pub fn make_room_lru(&mut self) {
        if self.cache.len() < self.max_size {
            return;
        }
        let target = 2 * self.max_size / 3;
        while self.cache.len() > target {
            if self.cache.pop_lru().is_none() {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Drop every entry, releasing the cache's memory.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
