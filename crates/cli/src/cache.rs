use lru::LruCache;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub capacity: usize,
}

impl CacheConfig {
    pub fn with_defaults() -> Self {
        Self {
            ttl: Duration::from_secs(86_400),
            capacity: 32,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

struct Slot<V> {
    cell: OnceCell<(Instant, Arc<V>)>,
}

impl<V> Slot<V> {
    fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cell
            .get()
            .is_some_and(|(created, _)| created.elapsed() >= ttl)
    }
}

/// Keyed memo of expensive loads, bounded by LRU capacity and TTL.
///
/// Concurrent misses on one key share a single in-flight load. Failed loads
/// leave nothing behind, so the next request retries.
pub struct RequestCache<V> {
    config: CacheConfig,
    entries: Mutex<LruCache<String, Arc<Slot<V>>>>,
    loads: AtomicU64,
}

impl<V> RequestCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            entries: Mutex::new(LruCache::new(capacity)),
            loads: AtomicU64::new(0),
        }
    }

    /// Number of times a loader actually ran.
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn get_or_load<F, Fut, E>(&self, key: &str, loader: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key);
        if let Some((_, value)) = slot.cell.get() {
            log::debug!("Cache hit for {key}");
            return Ok(value.clone());
        }

        let loaded = slot
            .cell
            .get_or_try_init(move || async move {
                self.loads.fetch_add(1, Ordering::Relaxed);
                let value = loader().await?;
                Ok::<_, E>((Instant::now(), Arc::new(value)))
            })
            .await;

        match loaded {
            Ok((_, value)) => Ok(value.clone()),
            Err(err) => {
                self.forget_failed(key, &slot);
                Err(err)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, Arc<Slot<V>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, key: &str) -> Arc<Slot<V>> {
        let mut entries = self.lock();
        if let Some(slot) = entries.get(key) {
            if !slot.is_expired(self.config.ttl) {
                return slot.clone();
            }
            log::debug!("Cache entry for {key} expired");
        }
        let slot = Arc::new(Slot::new());
        entries.put(key.to_string(), slot.clone());
        slot
    }

    fn forget_failed(&self, key: &str, slot: &Arc<Slot<V>>) {
        let mut entries = self.lock();
        let is_same_empty_slot = entries
            .peek(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && current.cell.get().is_none());
        if is_same_empty_slot {
            entries.pop(key);
        }
    }
}
