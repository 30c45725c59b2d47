//! Cache Store Module
//!
//! Size-bounded collection of cached responses with approximate LRU eviction.
//! Callers synchronize through `CacheGate`; nothing here locks.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::cache::{lru, CacheEntry, CacheStats, EntryId};

// == Admission ==
/// Whether a response of `size` bytes may be cached under `max_object_size`.
pub fn is_admissible(size: usize, max_object_size: usize) -> bool {
    size > 0 && size < max_object_size
}

/// Outcome of offering a fetched response to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Inserted after evicting `evicted` entries
    Cached { id: EntryId, evicted: usize },
    /// Size is zero or not below the object size limit
    Rejected,
    /// The store ran out of entries to evict while still over capacity
    NoRoom { evicted: usize },
}

// == Cache Store ==
/// Cached responses in traversal order, head first.
///
/// Keys are not unique: repeated misses for one URI insert repeated entries,
/// and lookup returns the first in traversal order.
#[derive(Debug)]
pub struct CacheStore {
    entries: VecDeque<CacheEntry>,
    /// Sum of every entry's size
    total_size: usize,
    /// Upper bound for `total_size`
    capacity: usize,
    /// Exclusive upper bound for a single cached response
    max_object_size: usize,
    next_id: u64,
    stats: CacheStats,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `capacity` - Total payload bytes the store may hold
    /// * `max_object_size` - Responses of this many bytes or more are never admitted
    pub fn new(capacity: usize, max_object_size: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            total_size: 0,
            capacity,
            max_object_size,
            next_id: 0,
            stats: CacheStats::new(),
        }
    }

    // == Lookup ==
    /// Returns the first entry whose key equals `key` exactly.
    pub fn lookup(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    // == Insert ==
    /// Prepends a new entry and accounts for its size.
    ///
    /// Does not evict; the caller makes room first (see `admit`).
    pub fn insert(&mut self, key: String, payload: Vec<u8>) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;

        let entry = CacheEntry::new(id, key, payload);
        self.total_size += entry.size();
        self.entries.push_front(entry);
        id
    }

    // == Evict One ==
    /// Removes the entry with the largest recency counter.
    ///
    /// Returns the number of bytes released, or None if the store is empty.
    pub fn evict_one(&mut self) -> Option<usize> {
        let index = lru::select_victim(&self.entries)?;
        let victim = self.entries.remove(index)?;
        let size = victim.size();
        self.total_size -= size;
        self.stats.record_eviction();

        debug!(
            key = %victim.key,
            size,
            recency = victim.recency,
            "Evicted cache entry"
        );
        Some(size)
    }

    // == Age ==
    /// Advances every entry's recency clock after a request.
    ///
    /// `hit` is the entry that served the request, or None for a miss.
    pub fn age(&mut self, hit: Option<EntryId>) {
        match hit {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        lru::age(self.entries.iter_mut(), hit);
    }

    // == Admissible ==
    /// Whether a response of `size` bytes may be cached at all.
    pub fn is_admissible(&self, size: usize) -> bool {
        is_admissible(size, self.max_object_size)
    }

    // == Admit ==
    /// Applies the admission policy to a fully relayed response.
    ///
    /// Evicts until the response fits, then inserts it. If the store empties
    /// while still over capacity, nothing is inserted; the response was
    /// already delivered, so this is not an error.
    pub fn admit(&mut self, key: String, response_size: usize, payload: Vec<u8>) -> Admission {
        if !self.is_admissible(response_size) {
            return Admission::Rejected;
        }
        debug_assert_eq!(payload.len(), response_size);

        let mut evicted = 0;
        while self.total_size + response_size > self.capacity {
            if self.evict_one().is_none() {
                warn!(
                    key = %key,
                    size = response_size,
                    "Cache eviction failed, response not cached"
                );
                self.stats.record_skipped_admission();
                return Admission::NoRoom { evicted };
            }
            evicted += 1;
        }

        let id = self.insert(key, payload);
        self.stats.record_admission();
        Admission::Cached { id, evicted }
    }

    // == Clear ==
    /// Releases every entry, returning (entries, bytes) released.
    pub fn clear(&mut self) -> (usize, usize) {
        let released = (self.entries.len(), self.total_size);
        self.entries.clear();
        self.total_size = 0;
        released
    }

    // == Log Contents ==
    /// Writes one debug line per entry, head first.
    pub fn log_contents(&self) {
        debug!(
            total_size = self.total_size,
            entries = self.entries.len(),
            "Cache contents"
        );
        for (index, entry) in self.entries.iter().enumerate() {
            debug!(
                index,
                key = %entry.key,
                size = entry.size(),
                recency = entry.recency,
                inserted_at = %entry.inserted_at,
                "Cache entry"
            );
        }
    }

    /// Entries in traversal order, head first.
    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.iter()
    }

    #[cfg(test)]
    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut CacheEntry> {
        self.entries.iter_mut()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all cached payload sizes in bytes.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Total byte budget.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Exclusive upper bound for one cached response.
    pub fn max_object_size(&self) -> usize {
        self.max_object_size
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats.total_size = self.total_size;
        stats
    }
}
