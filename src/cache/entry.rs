//! Cache Entry Module
//!
//! Defines a single cached response and its recency counter.

use chrono::{DateTime, Utc};

// == Entry Id ==
/// Store-unique identity of an entry, stable for the entry's lifetime.
///
/// A hit is reported to `age` by id, so an entry evicted between lookup and
/// aging matches nothing instead of a neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) u64);

// == Cache Entry ==
/// Represents a cached origin response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub(crate) id: EntryId,
    /// Absolute request URI, compared byte for byte
    pub key: String,
    /// Response bytes captured at insertion time
    payload: Box<[u8]>,
    /// Requests served since this entry was last a hit
    pub recency: u64,
    /// When the entry was admitted
    pub inserted_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry with a zero recency counter.
    pub(crate) fn new(id: EntryId, key: String, payload: Vec<u8>) -> Self {
        Self {
            id,
            key,
            payload: payload.into_boxed_slice(),
            recency: 0,
            inserted_at: Utc::now(),
        }
    }

    /// Identity used to report a hit.
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// The cached response bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Number of payload bytes this entry accounts for.
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}
