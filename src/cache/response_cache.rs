//! Answer cache with TTL expiry.
//!
//! Keys are normalized query strings (see [`crate::query::normalize`]).
//! Entries are served while `now - stored_at < ttl` and are treated as absent
//! afterwards. There is no capacity bound and no LRU: query volume from a
//! single interactive user is low, so lifetime alone bounds the store.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// A single cached answer.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Normalized query the answer was produced for.
    pub key: String,
    /// The answer text.
    pub value: String,
    /// When the entry was written.
    pub stored_at: Instant,
    /// Number of cache hits served from this entry.
    pub hit_count: u32,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) >= ttl
    }
}

/// In-memory answer cache with TTL expiry.
#[derive(Debug)]
pub struct ResponseCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ResponseCache {
    /// Create an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Time-to-live applied to every entry.
    /// Look up a cached answer. Returns `None` if the key is absent or expired.
    ///
    /// Expired entries are removed here; a hit bumps `hit_count`.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let now = Instant::now();
        let expired = self
            .entries
            .get(key)
            .map(|e| e.is_expired(now, self.ttl))?;
        if expired {
            debug!(key = %key, "Cache entry expired, removing");
            self.entries.remove(key);
            return None;
        }
        let entry = self.entries.get_mut(key)?;
        entry.hit_count = entry.hit_count.saturating_add(1);
        Some(entry.value.clone())
    }

    /// Store an answer, replacing any previous entry for `key` outright.
    ///
    /// Other expired entries are purged first.
    pub fn put(&mut self, key: String, value: String) {
        let now = Instant::now();
        self.evict_expired(now);
        self.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                value,
                stored_at: now,
                hit_count: 0,
            },
        );
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Snapshot of the live (unexpired) entries. Does not touch the store.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let mut entries: Vec<EntryAge> = self
            .entries
            .values()
            .filter(|e| !e.is_expired(now, self.ttl))
            .map(|e| EntryAge {
                key: e.key.clone(),
                age: now.saturating_duration_since(e.stored_at),
                hits: e.hit_count,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        CacheStats {
            size: entries.len(),
            total_hits: entries.iter().map(|e| u64::from(e.hits)).sum(),
            entries,
        }
    }

    /// Number of physically stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries.retain(|_, e| !e.is_expired(now, ttl));
    }
}

/// Age and hit count of one live entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryAge {
    pub key: String,
    pub age: Duration,
    pub hits: u32,
}

/// Read-only cache introspection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of live entries.
    pub size: usize,
    /// Hits served across all live entries.
    pub total_hits: u64,
    /// Per-entry ages, sorted by key.
    pub entries: Vec<EntryAge>,
}
