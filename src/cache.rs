//! Short-lived in-memory result cache with fixed TTL and lazy eviction.
//!
//! Each game service owns one cache instance per logical namespace (search
//! results, single entities, expansions, pricing), so cross-game and
//! cross-namespace key collisions are impossible by construction. There is
//! no background sweep: an entry past its TTL is treated as absent and
//! deleted on the lookup that finds it expired.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::query::QueryOptions;

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Key→value map where entries are visible only while
/// `now - stored_at < ttl`.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: HashMap<String, Entry<V>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Look up a key. Returns `None` both when the key was never set and
    /// when the stored entry has outlived the TTL; in the expired case the
    /// entry is deleted as a side effect.
    pub fn get(&mut self, key: &str) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value under a key, replacing any previous entry and
    /// restarting its TTL.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(
            key.into(),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, including any not yet lazily evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Deterministic cache key for a paged operation: pure function of the game
/// id, the operation name and the canonically serialized option set, so
/// logically identical queries always collide and differing option sets
/// never do.
pub fn key(game_id: &str, operation: &str, opts: &QueryOptions) -> String {
    format!("{}:{}:{}", game_id, operation, opts.cache_key())
}

/// Cache key for a single-entity operation (lookup by id).
pub fn entity_key(game_id: &str, operation: &str, entity_id: &str) -> String {
    format!("{}:{}:{}", game_id, operation, entity_id)
}
