//! Query result cache.
//!
//! [`QueryCache`] is the boundary the engine talks to; [`TtlCache`] is the
//! default in-process implementation, a DashMap whose entries expire lazily
//! on read (or eagerly through [`TtlCache::purge_expired`]). A TTL too large
//! to represent as an `Instant` never expires.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Key-value cache with per-entry time-to-live.
pub trait QueryCache<V>: Send + Sync {
    /// Fetch a live entry.
    fn get(&self, key: &str) -> Option<V>;

    /// Store an entry that expires after `ttl`.
    fn set(&self, key: &str, value: V, ttl: Duration);
}

/// DashMap-backed TTL cache.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<String, (Option<Instant>, V)>,
}

fn is_live(expires: Option<Instant>, now: Instant) -> bool {
    expires.is_none_or(|at| at > now)
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (expires, _)| is_live(*expires, now));
        before - self.entries.len()
    }

    /// Number of entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> QueryCache<V> for TtlCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let live = {
            let entry = self.entries.get(key)?;
            let (expires, value) = entry.value();
            is_live(*expires, Instant::now()).then(|| value.clone())
        };
        if live.is_none() {
            self.entries.remove(key);
        }
        live
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        let expires = Instant::now().checked_add(ttl);
        self.entries.insert(key.to_string(), (expires, value));
    }
}
