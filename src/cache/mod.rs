//! Cache Module
//!
//! Size-bounded in-memory response cache with approximate LRU eviction,
//! shared between workers through a readers-writer gate.

mod entry;
mod gate;
pub mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::{CacheEntry, EntryId};
pub use gate::{CacheGate, CacheReadGuard, CacheWriteGuard};
pub use stats::CacheStats;
pub use store::{Admission, CacheStore};

// == Public Constants ==
/// Default total cache capacity in bytes
pub const MAX_CACHE_SIZE: usize = 1_049_000;

/// Default exclusive upper bound for one cached response in bytes
pub const MAX_OBJECT_SIZE: usize = 102_400;
