//! Source byte cache and per-document signing locks

use lru::LruCache;
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OnceCell, OwnedMutexGuard};

type Slot = Arc<OnceCell<Arc<Vec<u8>>>>;

/// Source PDF bytes keyed by document id, least recently used evicted first.
///
/// Concurrent first loads of the same id share one fetch. A failed load
/// leaves the slot empty, so the next caller tries again.
#[derive(Debug)]
pub struct SourceCache {
    slots: Mutex<LruCache<String, Slot>>,
}

impl Default for SourceCache {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl SourceCache {
    pub const DEFAULT_CAPACITY: usize = 16;

    pub fn new() -> Self {
        Self::default()
    }

    /// Hold at most `capacity` documents; zero is treated as one
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn slots(&self) -> MutexGuard<'_, LruCache<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, document_id: &str) -> Slot {
        self.slots()
            .get_or_insert(document_id.to_string(), Slot::default)
            .clone()
    }

    pub async fn get_or_load<F, Fut, E>(&self, document_id: &str, load: F) -> Result<Arc<Vec<u8>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        let slot = self.slot(document_id);
        let bytes = slot
            .get_or_try_init(|| async { load().await.map(Arc::new) })
            .await?;
        Ok(bytes.clone())
    }

    pub fn get(&self, document_id: &str) -> Option<Arc<Vec<u8>>> {
        self.slots()
            .get(document_id)
            .and_then(|slot| slot.get().cloned())
    }

    /// Seed the cache, replacing anything held for the id
    pub fn insert(&self, document_id: &str, bytes: Vec<u8>) {
        let slot = Arc::new(OnceCell::new_with(Some(Arc::new(bytes))));
        self.slots().put(document_id.to_string(), slot);
    }

    pub fn evict(&self, document_id: &str) -> bool {
        self.slots().pop(document_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots().cap().get()
    }
}

/// Async mutex per document id; signings of one document run one at a time
#[derive(Debug, Default)]
pub struct DocumentLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, document_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Idle entries are only referenced by the map
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(document_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
