//! Synchronization Gate
//!
//! Readers-writer discipline over the shared `CacheStore`. Any number of
//! lookups run concurrently; insert, evict and age each take exclusive access
//! and wait until every reader has released.
//!
//! Readers only queue on the writer permit when none of them is inside, so a
//! waiting writer never holds back lookups that arrive while others are
//! still reading.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard, Semaphore, SemaphorePermit};
use tracing::{debug, info};

use super::store::is_admissible;
use crate::cache::{Admission, CacheStats, CacheStore, EntryId};

// == Cache Gate ==
/// The process-wide cache, constructed once and shared by every worker.
///
/// Lookup and the following `age` are separate critical sections; other
/// writers may run between them.
#[derive(Debug)]
pub struct CacheGate {
    /// Never contended: the permit below decides who may touch the store
    store: RwLock<CacheStore>,
    /// Single permit, held by a writer or collectively by the readers
    writer: Semaphore,
    /// Serializes readers entering the gate
    entry: Mutex<()>,
    readers: AtomicUsize,
    max_object_size: usize,
}

/// Shared access to the store. Entry payloads borrowed through the guard
/// must not outlive it.
#[derive(Debug)]
pub struct CacheReadGuard<'a> {
    // Dropped before the slot, so the store is released before the permit
    store: RwLockReadGuard<'a, CacheStore>,
    _slot: ReaderSlot<'a>,
}

impl Deref for CacheReadGuard<'_> {
    type Target = CacheStore;

    fn deref(&self) -> &CacheStore {
        &self.store
    }
}

/// Exclusive access to the store.
#[derive(Debug)]
pub struct CacheWriteGuard<'a> {
    store: RwLockWriteGuard<'a, CacheStore>,
    _permit: SemaphorePermit<'a>,
}

impl Deref for CacheWriteGuard<'_> {
    type Target = CacheStore;

    fn deref(&self) -> &CacheStore {
        &self.store
    }
}

impl DerefMut for CacheWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut CacheStore {
        &mut self.store
    }
}

/// One reader's membership; the last one out hands the permit back.
#[derive(Debug)]
struct ReaderSlot<'a> {
    gate: &'a CacheGate,
}

impl Drop for ReaderSlot<'_> {
    fn drop(&mut self) {
        if self.gate.readers.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.gate.writer.add_permits(1);
        }
    }
}

impl CacheGate {
    /// Wraps a store for shared access.
    pub fn new(store: CacheStore) -> Self {
        let max_object_size = store.max_object_size();
        Self {
            store: RwLock::new(store),
            writer: Semaphore::new(1),
            entry: Mutex::new(()),
            readers: AtomicUsize::new(0),
            max_object_size,
        }
    }

    /// Object size limit, readable without entering the gate.
    pub fn max_object_size(&self) -> usize {
        self.max_object_size
    }

    async fn acquire_writer(&self) -> SemaphorePermit<'_> {
        // The semaphore is never closed
        self.writer
            .acquire()
            .await
            .expect("cache gate semaphore closed")
    }

    async fn enter_reader(&self) -> ReaderSlot<'_> {
        let _entry = self.entry.lock().await;

        let joined = self
            .readers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n > 0).then_some(n + 1)
            })
            .is_ok();
        if !joined {
            // First reader in: wait out any writer, then hold the permit for the group
            self.acquire_writer().await.forget();
            self.readers.fetch_add(1, Ordering::AcqRel);
        }
        ReaderSlot { gate: self }
    }

    // == Read ==
    /// Enters the reader side.
    pub async fn read(&self) -> CacheReadGuard<'_> {
        let slot = self.enter_reader().await;
        CacheReadGuard {
            store: self.store.read().await,
            _slot: slot,
        }
    }

    // == Write ==
    /// Enters the writer side once every reader has left.
    pub async fn write(&self) -> CacheWriteGuard<'_> {
        let permit = self.acquire_writer().await;
        CacheWriteGuard {
            store: self.store.write().await,
            _permit: permit,
        }
    }

    // == Age ==
    /// Ages the store as its own exclusive operation.
    pub async fn age(&self, hit: Option<EntryId>) {
        let mut store = self.write().await;
        store.age(hit);
    }

    // == Admit ==
    /// Runs eviction and insertion for a relayed response under one writer section.
    pub async fn admit(&self, key: String, response_size: usize, payload: Vec<u8>) -> Admission {
        if !is_admissible(response_size, self.max_object_size) {
            return Admission::Rejected;
        }

        let mut store = self.write().await;
        let outcome = store.admit(key, response_size, payload);
        if matches!(outcome, Admission::Cached { .. }) {
            debug!(
                total_size = store.total_size(),
                entries = store.len(),
                "Response cached"
            );
            store.log_contents();
        }
        outcome
    }

    // == Teardown ==
    /// Releases every entry and returns the final statistics.
    pub async fn teardown(&self) -> CacheStats {
        let mut store = self.write().await;
        let stats = store.stats();
        let (entries, bytes) = store.clear();
        info!(entries, bytes, "Cache released");
        stats
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::{oneshot, Barrier};

    fn populated_gate() -> Arc<CacheGate> {
        let mut store = CacheStore::new(10_000, 1_000);
        store.insert("http://a/".to_string(), vec![b'a'; 10]);
        store.insert("http://b/".to_string(), vec![b'b'; 20]);
        Arc::new(CacheGate::new(store))
    }

    #[tokio::test]
    async fn test_concurrent_reads_do_not_block_each_other() {
        const READERS: usize = 8;
        let gate = populated_gate();
        let barrier = Arc::new(Barrier::new(READERS));
        let mut handles = Vec::new();

        for _ in 0..READERS {
            let gate = gate.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                let store = gate.read().await;
                // Every reader holds its guard until all have entered
                barrier.wait().await;
                store.lookup("http://a/").map(|e| e.size())
            }));
        }

        for handle in handles {
            let found = tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("readers blocked each other")
                .unwrap();
            assert_eq!(found, Some(10));
        }
    }

    #[tokio::test]
    async fn test_writer_waits_for_all_readers() {
        const READERS: usize = 4;
        let gate = populated_gate();
        let barrier = Arc::new(Barrier::new(READERS + 1));
        let mut releases = Vec::new();
        let mut readers = Vec::new();

        for _ in 0..READERS {
            let gate = gate.clone();
            let barrier = barrier.clone();
            let (release_tx, release_rx) = oneshot::channel::<()>();
            releases.push(release_tx);
            readers.push(tokio::spawn(async move {
                let store = gate.read().await;
                barrier.wait().await;
                let _ = release_rx.await;
                drop(store);
            }));
        }

        // All readers are inside the gate
        barrier.wait().await;

        let writer = {
            let gate = gate.clone();
            tokio::spawn(async move {
                gate.admit("http://c/".to_string(), 5, vec![b'c'; 5]).await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!writer.is_finished(), "writer entered while readers held the gate");

        // Release all but one reader; the writer must still wait
        let last = releases.pop().unwrap();
        for release in releases {
            release.send(()).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!writer.is_finished(), "writer entered before the last reader left");

        last.send(()).unwrap();
        let outcome = tokio::time::timeout(Duration::from_secs(5), writer)
            .await
            .expect("writer never entered")
            .unwrap();
        assert!(matches!(outcome, Admission::Cached { .. }));

        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(gate.read().await.total_size(), 35);
    }

    #[tokio::test]
    async fn test_queued_writer_does_not_block_new_readers() {
        let gate = populated_gate();
        let first = gate.read().await;

        let writer = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.age(None).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!writer.is_finished(), "writer entered while a reader held the gate");

        let second = tokio::time::timeout(Duration::from_millis(500), gate.read())
            .await
            .expect("lookup waited behind a queued writer");
        assert_eq!(second.lookup("http://b/").map(|e| e.size()), Some(20));

        drop(first);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!writer.is_finished(), "writer entered before the last reader left");

        drop(second);
        tokio::time::timeout(Duration::from_secs(5), writer)
            .await
            .expect("writer never entered")
            .unwrap();
        assert_eq!(gate.read().await.lookup("http://a/").unwrap().recency, 1);
    }

    #[tokio::test]
    async fn test_cancelled_reader_leaves_gate_usable() {
        let gate = populated_gate();
        let writer = gate.write().await;

        // Gives up while waiting on the writer
        let attempt = tokio::time::timeout(Duration::from_millis(50), gate.read()).await;
        assert!(attempt.is_err());
        drop(writer);

        let store = tokio::time::timeout(Duration::from_secs(1), gate.read())
            .await
            .expect("gate stuck after a cancelled reader");
        assert_eq!(store.len(), 2);
        drop(store);

        tokio::time::timeout(Duration::from_secs(1), gate.age(None))
            .await
            .expect("writer stuck after readers left");
    }

    #[tokio::test]
    async fn test_admit_rejects_without_entering_gate() {
        let gate = populated_gate();
        let _reader = gate.read().await;

        // Would deadlock if it took the writer side while we hold a read guard
        let outcome = tokio::time::timeout(
            Duration::from_secs(1),
            gate.admit("http://big/".to_string(), 1_000, vec![0; 1_000]),
        )
        .await
        .expect("rejection should not wait for the gate");
        assert_eq!(outcome, Admission::Rejected);
    }

    #[tokio::test]
    async fn test_admit_bounds_match_store() {
        let gate = populated_gate();

        assert_eq!(gate.admit("http://zero/".to_string(), 0, Vec::new()).await, Admission::Rejected);
        assert_eq!(
            gate.admit("http://max/".to_string(), 1_000, vec![0; 1_000]).await,
            Admission::Rejected
        );
        assert!(matches!(
            gate.admit("http://under/".to_string(), 999, vec![0; 999]).await,
            Admission::Cached { .. }
        ));
    }

    #[tokio::test]
    async fn test_age_through_gate() {
        let gate = populated_gate();
        let hit = gate.read().await.lookup("http://a/").map(|e| e.id());

        gate.age(hit).await;

        let store = gate.read().await;
        assert_eq!(store.lookup("http://a/").unwrap().recency, 0);
        assert_eq!(store.lookup("http://b/").unwrap().recency, 1);
    }

    #[tokio::test]
    async fn test_teardown_releases_store() {
        let gate = populated_gate();
        let stats = gate.teardown().await;

        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.total_size, 30);
        assert!(gate.read().await.is_empty());
    }
}
