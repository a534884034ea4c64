//! TTL-bounded decision cache
//!
//! Memoized per-selector decisions, independent of the PermissionSet they
//! were derived from: an entry survives until its own TTL or an explicit
//! invalidation, even if the set is later replaced. Lookup treats expired
//! entries as absent; the periodic sweep is housekeeping on top of that.

use std::collections::HashMap;
use std::time::Duration;

use crate::types::Timestamp;

// ----------------------------------------------------------------------------
// Cache Key
// ----------------------------------------------------------------------------

/// Derive the cache key for an element-edit decision
pub fn cache_key(selector: &str) -> String {
    format!("edit_element_{selector}")
}

// ----------------------------------------------------------------------------
// Cache Entry
// ----------------------------------------------------------------------------

/// One memoized decision with its capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub value: bool,
    pub timestamp: Timestamp,
}

// ----------------------------------------------------------------------------
// Decision Cache
// ----------------------------------------------------------------------------

/// Map of memoized decisions with last-write-wins semantics per key
#[derive(Debug)]
pub struct DecisionCache {
    entries: HashMap<String, CacheEntry>,
    timeout: Duration,
}

impl DecisionCache {
    /// Create a cache with the given entry TTL
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            timeout,
        }
    }

    /// Look up a decision, treating expired entries as absent
    pub fn get(&self, key: &str, now: Timestamp) -> Option<bool> {
        self.entries
            .get(key)
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| entry.value)
    }

    /// Memoize a decision at the given time
    pub fn insert(&mut self, key: String, value: bool, now: Timestamp) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                timestamp: now,
            },
        );
    }

    /// Drop every memoized decision
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove entries older than the TTL, returning how many were removed
    pub fn sweep(&mut self, now: Timestamp) -> usize {
        let before = self.entries.len();
        let timeout = self.timeout;
        self.entries
            .retain(|_, entry| now.duration_since(entry.timestamp) < timeout);
        before - self.entries.len()
    }

    /// Number of entries, including any expired-but-unswept ones
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &CacheEntry, now: Timestamp) -> bool {
        now.duration_since(entry.timestamp) >= self.timeout
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
