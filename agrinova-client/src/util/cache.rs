use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

/// Collection/organization pair a cached listing belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub collection: &'static str,
    pub scope: String,
    pub variant: String,
}

impl CacheKey {
    pub fn new(collection: &'static str, scope: &str) -> Self {
        Self {
            collection,
            scope: scope.to_string(),
            variant: String::new(),
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }
}

/// Snapshot of how often a key's collection has been invalidated. A read
/// takes one before going remote and hands it back to [`QueryCache::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    epoch: u64,
    scoped: u64,
}

struct Entry {
    stored_at: Instant,
    value: Value,
}

/// Short-lived cache of list reads. Values are kept as JSON so one map can
/// hold every row type.
pub struct QueryCache {
    ttl: Duration,
    entries: DashMap<CacheKey, Entry>,
    generations: DashMap<(&'static str, String), u64>,
    epoch: AtomicU64,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
            generations: DashMap::new(),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn get<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        if self.ttl.is_zero() {
            return None;
        }
        let fresh = self
            .entries
            .get(key)
            .filter(|e| e.stored_at.elapsed() <= self.ttl)
            .and_then(|e| serde_json::from_value(e.value.clone()).ok());
        if fresh.is_none() {
            self.entries.remove_if(key, |_, e| e.stored_at.elapsed() > self.ttl);
        } else {
            debug!(collection = key.collection, scope = %key.scope, "cache hit");
        }
        fresh
    }

    pub fn generation(&self, key: &CacheKey) -> Generation {
        let scoped = self
            .generations
            .get(&(key.collection, key.scope.clone()))
            .map(|g| *g)
            .unwrap_or(0);
        Generation {
            epoch: self.epoch.load(Ordering::Acquire),
            scoped,
        }
    }

    /// Stores `value` unless the key was invalidated after `generation` was
    /// taken, in which case the value may predate a write and is dropped.
    pub fn put<T: serde::Serialize>(&self, key: CacheKey, generation: Generation, value: &T) {
        if self.ttl.is_zero() {
            return;
        }
        if self.generation(&key) != generation {
            debug!(collection = key.collection, scope = %key.scope, "dropping stale read");
            return;
        }
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        let stored_at = Instant::now();
        self.entries.insert(key.clone(), Entry { stored_at, value });
        // An invalidation may have landed between the check and the insert.
        if self.generation(&key) != generation {
            self.entries.remove_if(&key, |_, e| e.stored_at == stored_at);
        }
    }

    /// Drops every entry of `collection` for `scope`, whatever the variant,
    /// and turns away reads that started before this call.
    pub fn invalidate(&self, collection: &'static str, scope: &str) {
        *self
            .generations
            .entry((collection, scope.to_string()))
            .or_insert(0) += 1;
        self.entries
            .retain(|k, _| !(k.collection == collection && k.scope == scope));
    }

    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
