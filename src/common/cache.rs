//! In-memory cache for storing key-value pairs.
//!
//! Uses moka's concurrent cache implementation.

use std::{hash::Hash, time::Duration};

use moka::sync::Cache;

/// Thread-safe in-memory cache with bounded capacity and optional expiry.
///
/// Used for the role list fetched from the role registry
/// (`MemCache<&'static str, Arc<Vec<Role>>>`).
#[derive(Clone)]
pub struct MemCache<K, V> {
    entries: Cache<K, V>,
}

impl<K, V> MemCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Allocate a new [`MemCache`] whose entries expire `ttl` after insertion.
    pub fn with_ttl(
        capacity: usize,
        ttl: Duration,
    ) -> Self {
        Self {
            entries: Cache::builder().max_capacity(capacity as u64).time_to_live(ttl).build(),
        }
    }

    pub fn set(
        &self,
        key: K,
        value: V,
    ) {
        self.entries.insert(key, value);
    }

    pub fn get(
        &self,
        key: &K,
    ) -> Option<V> {
        self.entries.get(key)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}
