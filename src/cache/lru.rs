//! Approximate LRU Module
//!
//! Recency is a logical clock per entry: the number of requests served since
//! the entry was last a hit. The victim is the entry with the largest count.

use crate::cache::{CacheEntry, EntryId};

// == Age ==
/// Advances every entry's clock by one request.
///
/// The hit entry (if any) resets to 0; all others increment. A miss passes
/// `None` and every entry ages.
pub fn age<'a, I>(entries: I, hit: Option<EntryId>)
where
    I: IntoIterator<Item = &'a mut CacheEntry>,
{
    for entry in entries {
        if Some(entry.id) == hit {
            entry.recency = 0;
        } else {
            entry.recency = entry.recency.saturating_add(1);
        }
    }
}

// == Select Victim ==
/// Returns the position of the entry to evict, or None when there are no entries.
///
/// Uses `>=` while scanning, so among entries tied at the maximum the one
/// positioned last in traversal order wins.
pub fn select_victim<'a, I>(entries: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a CacheEntry>,
{
    let mut oldest = 0u64;
    let mut victim = None;

    for (index, entry) in entries.into_iter().enumerate() {
        if entry.recency >= oldest {
            oldest = entry.recency;
            victim = Some(index);
        }
    }

    victim
}
