//! Response caching with passive expiration
//!
//! Fetched pages and header sets are kept for a bounded time so that visiting
//! the same URL twice in one session does not hit the network twice. The cache
//! is an optimization only: every miss falls through to a live fetch.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A key-value store for fetched responses, keyed by exact URL string
pub trait ResponseCache<V>: Send + Sync {
    /// Returns a fresh cached value, if any
    fn get(&self, key: &str) -> Option<V>;

    /// Stores a value, replacing any previous entry for `key`
    fn insert(&self, key: &str, value: V);
}

/// A cached value along with the time it was stored
#[derive(Debug, Clone)]
pub struct CachedEntry<V> {
    /// The cached value
    pub value: V,

    /// When the value was fetched
    pub fetched_at: DateTime<Utc>,
}

impl<V> CachedEntry<V> {
    /// Creates a new entry stamped with the current time
    pub fn new(value: V) -> Self {
        Self {
            value,
            fetched_at: Utc::now(),
        }
    }

    /// Returns how long ago the value was fetched
    ///
    /// A timestamp in the future (clock skew) counts as zero age.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.fetched_at).to_std().unwrap_or_default()
    }

    /// Checks if the entry is older than `ttl`
    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }
}

/// In-memory cache whose entries expire after a fixed time-to-live
///
/// Stale entries are dropped when they are looked up; there is no background
/// eviction.
#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedEntry<V>>>,
}

impl<V> TtlCache<V> {
    /// Creates an empty cache with the given time-to-live
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored entries, stale ones included
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone + Send> ResponseCache<V> for TtlCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match entries.get(key) {
            Some(entry) if entry.is_stale(self.ttl) => {
                tracing::trace!("Cache entry for {} expired", key);
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    fn insert(&self, key: &str, value: V) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), CachedEntry::new(value));
    }
}

/// A cache that never stores anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl<V> ResponseCache<V> for NoCache {
    fn get(&self, _key: &str) -> Option<V> {
        None
    }

    fn insert(&self, _key: &str, _value: V) {}
}
