use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::debug;

/// Bounded in-memory cache with TTL expiry.
///
/// One entry per key, overwritten on insert. An unbounded cache grows
/// forever, so this one expires entries after `ttl` and holds at most
/// `max_entries`: inserting into a full map first drops whatever has
/// expired, then the oldest entry. Reads and writes are safe from
/// concurrently in-flight requests.
pub struct QueryCache<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    ttl: Duration,
    max_entries: usize,
}

struct Entry<V> {
    value: V,
    cached_at: Instant,
}

impl<K: Eq + Hash + Clone, V: Clone> QueryCache<K, V> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Fresh value for the key, or `None` on miss or expiry.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = entries.get(key)?;
        if entry.cached_at.elapsed() >= self.ttl {
            // expired entries are swept on the next insert
            return None;
        }
        Some(entry.value.clone())
    }

    /// Insert or overwrite the entry for this key.
    pub fn put(&self, key: K, value: V) {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        entries.retain(|_, entry| entry.cached_at.elapsed() < self.ttl);

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.cached_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                debug!("cache full, evicting oldest entry");
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            Entry {
                value,
                cached_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        match self.entries.write() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}
