//! Bounded, TTL-expiring cache of computed relation paths.
//!
//! Keyed by (root field name, raw selection text). Entries are immutable once written:
//! when two callers race on a miss, the first insert wins and both observe it.
//! Expiry is checked on access; there is no background sweep.

use crate::path::RelationPath;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

type Key = (String, String);

struct CacheEntry {
    paths: Arc<[RelationPath]>,
    inserted: Instant,
}

pub struct RelationPathCache {
    entries: Mutex<LruCache<Key, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
}

impl RelationPathCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        RelationPathCache {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_settings(settings: &crate::settings::EngineSettings) -> Self {
        Self::new(settings.cache_capacity, settings.cache_ttl)
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<Key, CacheEntry>> {
        // entries are never left half-written, so a poisoned lock is still consistent
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, root_field: &str, selection: &str) -> Option<Arc<[RelationPath]>> {
        let key = (root_field.to_string(), selection.to_string());
        let mut entries = self.lock();
        let expired = match entries.get(&key) {
            Some(entry) if entry.inserted.elapsed() <= self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.paths.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(&key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Return the cached paths, or compute and store them. `compute` runs without the lock
    /// held; errors are returned and nothing is cached.
    pub fn get_or_try_insert_with<E>(
        &self,
        root_field: &str,
        selection: &str,
        compute: impl FnOnce() -> Result<Vec<RelationPath>, E>,
    ) -> Result<Arc<[RelationPath]>, E> {
        if let Some(paths) = self.get(root_field, selection) {
            tracing::debug!(root_field = %root_field, "relation path cache hit");
            return Ok(paths);
        }
        let computed: Arc<[RelationPath]> = compute()?.into();
        let key = (root_field.to_string(), selection.to_string());
        let mut entries = self.lock();
        if let Some(existing) = entries.get(&key) {
            if existing.inserted.elapsed() <= self.ttl {
                return Ok(existing.paths.clone());
            }
        }
        entries.put(
            key,
            CacheEntry {
                paths: computed.clone(),
                inserted: Instant::now(),
            },
        );
        Ok(computed)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: self.lock().len(),
        }
    }
}

impl Default for RelationPathCache {
    fn default() -> Self {
        Self::from_settings(&crate::settings::EngineSettings::default())
    }
}
