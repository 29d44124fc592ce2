use lru::LruCache;
use parking_lot::Mutex;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Bounded memo with least-recently-used eviction and a time-to-live per entry.
///
/// The lock is held only for map access. `get_or_compute` runs the computation
/// outside it, so two concurrent misses for the same key may both compute and the
/// later insert wins. Values must therefore be pure functions of their key.
pub struct ResultCache<K: Hash + Eq, V: Clone> {
    entries: Mutex<LruCache<K, Entry<V>>>,
    ttl: Duration,
}

impl<K: Hash + Eq, V: Clone> ResultCache<K, V> {
    /// A `max_entries` of zero is treated as one.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self { entries: Mutex::new(LruCache::new(cap)), ttl }
    }

    /// Fresh value for `key`, promoting it to most recently used. Expired entries
    /// are dropped and reported as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    /// Store `value` stamped with the current time, evicting the least recently
    /// used entry when at capacity.
    pub fn insert(&self, key: K, value: V) {
        let entry = Entry { value, inserted_at: Instant::now() };
        self.entries.lock().put(key, entry);
    }

    pub fn get_or_compute<E, F>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.get_or_compute_if(key, compute, |_| true)
    }

    /// Like [`get_or_compute`](Self::get_or_compute), but a freshly computed value
    /// is stored only if `admit` accepts its key. `admit` runs under the cache lock,
    /// so a [`clear`](Self::clear) either happens before the check or removes the
    /// stored entry.
    pub fn get_or_compute_if<E, F, P>(&self, key: K, compute: F, admit: P) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
        P: FnOnce(&K) -> bool,
    {
        if let Some(hit) = self.get(&key) {
            tracing::debug!("result cache hit");
            return Ok(hit);
        }
        tracing::debug!("result cache miss");
        let value = compute()?;
        let mut entries = self.entries.lock();
        if admit(&key) {
            entries.put(key, Entry { value: value.clone(), inserted_at: Instant::now() });
        } else {
            tracing::debug!("computed result not admitted to cache");
        }
        Ok(value)
    }

    /// Number of stored entries, expired ones included until they are touched.
    pub fn len(&self) -> usize { self.entries.lock().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn clear(&self) { self.entries.lock().clear(); }

    pub fn capacity(&self) -> usize { self.entries.lock().cap().get() }

    pub fn ttl(&self) -> Duration { self.ttl }
}
