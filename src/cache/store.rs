//! Bounded, time-limited result store.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::observability::metrics;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug)]
struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<String>,
}

/// Summary of a cache, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct CacheSnapshot {
    pub name: &'static str,
    pub entries: usize,
    pub max_entries: usize,
    pub ttl_secs: u64,
}

/// A thread-safe cache of successful upstream results.
///
/// Entries expire `ttl` after insertion. When full, the earliest inserted
/// entry is evicted; re-inserting a key moves it to the back.
#[derive(Debug)]
pub struct ResultCache<V> {
    name: &'static str,
    ttl: Duration,
    max_entries: usize,
    state: Mutex<CacheState<V>>,
}

impl<V: Clone> ResultCache<V> {
    /// Create an empty cache.
    pub fn new(name: &'static str, ttl: Duration, max_entries: usize) -> Self {
        Self {
            name,
            ttl,
            max_entries: max_entries.max(1),
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Create an empty cache from configuration.
    pub fn from_config(name: &'static str, config: &CacheConfig) -> Self {
        Self::new(name, config.ttl(), config.max_entries)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a fresh value. Expired entries are removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut state = self.state.lock();

        let expired = match state.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                metrics::record_cache_lookup(self.name, true);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            state.entries.remove(key);
            state.order.retain(|k| k != key);
            metrics::record_cache_size(self.name, state.entries.len());
        }
        metrics::record_cache_lookup(self.name, false);
        None
    }

    /// Insert or refresh a value.
    pub fn put(&self, key: &str, value: V) {
        let expires_at = Instant::now() + self.ttl;
        let mut state = self.state.lock();

        if state.entries.contains_key(key) {
            state.order.retain(|k| k != key);
        } else {
            while state.entries.len() >= self.max_entries {
                let Some(oldest) = state.order.pop_front() else {
                    break;
                };
                state.entries.remove(&oldest);
                tracing::trace!(cache = self.name, key = %oldest, "Evicted oldest entry");
            }
        }

        state.entries.insert(key.to_string(), CacheEntry { value, expires_at });
        state.order.push_back(key.to_string());
        metrics::record_cache_size(self.name, state.entries.len());
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        let before = state.entries.len();

        state.entries.retain(|_, entry| !entry.is_expired(now));
        let CacheState { entries, order } = &mut *state;
        order.retain(|k| entries.contains_key(k));

        let removed = before - state.entries.len();
        if removed > 0 {
            metrics::record_cache_size(self.name, state.entries.len());
        }
        removed
    }

    /// Number of stored entries, including not-yet-purged expired ones.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
        metrics::record_cache_size(self.name, 0);
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            name: self.name,
            entries: self.len(),
            max_entries: self.max_entries,
            ttl_secs: self.ttl.as_secs(),
        }
    }
}
