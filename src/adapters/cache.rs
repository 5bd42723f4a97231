//! TTL Cache
//!
//! Keyed cache with per-entry TTL and an injected clock. Owned by whoever
//! needs it; there is no process-wide instance.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Time source for expiry checks
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cache entry with TTL tracking
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Check if entry is still valid at `now`
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) < self.ttl
    }

    /// Time remaining before expiry
    pub fn time_remaining_at(&self, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.inserted_at);
        self.ttl.checked_sub(elapsed).filter(|d| !d.is_zero())
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// TTL cache over any clock
#[derive(Debug)]
pub struct TtlCache<K, V, C = SystemClock> {
    entries: HashMap<K, CacheEntry<V>>,
    default_ttl: Duration,
    max_entries: usize,
    clock: C,
    hits: u64,
    misses: u64,
}

impl<K: Eq + Hash + Clone, V> TtlCache<K, V, SystemClock> {
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Self::DEFAULT_MAX_ENTRIES, SystemClock)
    }
}

impl<K: Eq + Hash + Clone, V, C: Clock> TtlCache<K, V, C> {
    /// Default max cache entries
    pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

    pub fn with_clock(default_ttl: Duration, max_entries: usize, clock: C) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
            max_entries: max_entries.max(1),
            clock,
            hits: 0,
            misses: 0,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Insert with the default TTL
    pub fn insert(&mut self, key: K, value: V) {
        let ttl = self.default_ttl;
        self.insert_with_ttl(key, value, ttl);
    }

    pub fn insert_with_ttl(&mut self, key: K, value: V, ttl: Duration) {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.cleanup();
        }
        // still full after dropping expired entries
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.remove_oldest();
        }

        let entry = CacheEntry {
            value,
            inserted_at: self.clock.now(),
            ttl,
        };
        self.entries.insert(key, entry);
    }

    /// Valid value for `key`, counting the lookup as a hit or miss
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let now = self.clock.now();
        match self.entries.get(key).filter(|e| e.is_valid_at(now)) {
            Some(entry) => {
                self.hits += 1;
                Some(&entry.value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Valid entry with metadata, without touching the hit counters
    pub fn get_entry(&self, key: &K) -> Option<&CacheEntry<V>> {
        let now = self.clock.now();
        self.entries.get(key).filter(|e| e.is_valid_at(now))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get_entry(key).is_some()
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|e| e.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove expired entries
    pub fn cleanup(&mut self) {
        let now = self.clock.now();
        self.entries.retain(|_, entry| entry.is_valid_at(now));
    }

    fn remove_oldest(&mut self) {
        if let Some(oldest_key) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(key, _)| key.clone())
        {
            self.entries.remove(&oldest_key);
        }
    }

    /// Number of entries (including expired)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        let now = self.clock.now();
        self.entries.values().filter(|e| e.is_valid_at(now)).count()
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.entries.len();
        let valid = self.valid_count();
        CacheStats {
            total_entries: total,
            valid_entries: valid,
            expired_entries: total - valid,
            hits: self.hits,
            misses: self.misses,
        }
    }
}
