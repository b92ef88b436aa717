// In-memory TTL cache for API results.
// Memoizes operations by key, serializes concurrent misses, and records telemetry.

use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::error::Result;

use super::key::{CacheKey, KeyArgs};
use super::telemetry::{CacheMetrics, DEFAULT_TOP_N, Telemetry};

/// A cacheable operation: stable identity plus how long its results stay fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedOperation {
    pub id: &'static str,
    pub ttl: Duration,
}

impl CachedOperation {
    pub const fn new(id: &'static str, ttl: Duration) -> Self {
        Self { id, ttl }
    }
}

/// Stored value with its expiry.
struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Point-in-time view of cache contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries in storage, including expired ones not yet overwritten.
    pub total_entries: usize,
    pub live_entries: usize,
    /// Operations with at least one live entry, sorted.
    pub operations: Vec<String>,
    /// Time until the soonest live entry expires.
    pub soonest_expiry: Option<Duration>,
    /// Time until the last live entry expires.
    pub latest_expiry: Option<Duration>,
}

type Gate = Arc<tokio::sync::Mutex<()>>;

/// Process-wide memoization cache. Share it behind an `Arc`.
#[derive(Default)]
pub struct CacheStore {
    entries: Mutex<HashMap<CacheKey, Entry>>,
    telemetry: Mutex<Telemetry>,
    inflight: Mutex<HashMap<CacheKey, Gate>>,
}

/// Lock a std mutex, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `(op, args, cache_bust)` or compute it with `fetch`.
    ///
    /// Concurrent callers missing on the same key wait for the first one, so
    /// `fetch` runs at most once per key at a time. Only `Ok` values are stored.
    pub async fn memoize<A, V, F, Fut>(
        &self,
        op: &CachedOperation,
        args: &A,
        cache_bust: Option<&str>,
        fetch: F,
    ) -> Result<V>
    where
        A: KeyArgs + ?Sized,
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let key = CacheKey::new(op.id, args, cache_bust);

        if let Some(value) = self.lookup::<V>(&key) {
            self.record_hit(op.id);
            return Ok(value);
        }

        let gate = self.gate(&key);
        let result = {
            let _held = gate.lock().await;
            if let Some(value) = self.lookup::<V>(&key) {
                self.record_hit(op.id);
                Ok(value)
            } else {
                lock(&self.telemetry).record_miss(op.id);
                debug!(operation = op.id, busted = cache_bust.is_some(), "cache miss");

                let result = fetch().await;
                if let Ok(value) = &result {
                    self.insert(key.clone(), value.clone(), op.ttl);
                }
                result
            }
        };
        self.release(&key, gate);
        result
    }

    /// Live value for `key`, if any and of the expected type.
    fn lookup<V: Clone + 'static>(&self, key: &CacheKey) -> Option<V> {
        let entries = lock(&self.entries);
        let entry = entries.get(key)?;
        if !entry.is_live(Instant::now()) {
            return None;
        }
        entry.value.downcast_ref::<V>().cloned()
    }

    fn insert<V: Send + Sync + 'static>(&self, key: CacheKey, value: V, ttl: Duration) {
        let entry = Entry {
            value: Arc::new(value),
            expires_at: Instant::now() + ttl,
        };
        lock(&self.entries).insert(key, entry);
    }

    fn record_hit(&self, operation: &'static str) {
        trace!(operation, "cache hit");
        lock(&self.telemetry).record_hit(operation);
    }

    /// Per-key lock shared by concurrent callers.
    fn gate(&self, key: &CacheKey) -> Gate {
        lock(&self.inflight).entry(key.clone()).or_default().clone()
    }

    /// Give back this caller's handle and drop the per-key lock once nobody holds it.
    ///
    /// Handles are only cloned and dropped under the `inflight` lock, so a count
    /// of one means the map holds the last reference.
    fn release(&self, key: &CacheKey, gate: Gate) {
        let mut inflight = lock(&self.inflight);
        let ours = matches!(inflight.get(key), Some(current) if Arc::ptr_eq(current, &gate));
        drop(gate);
        if ours && inflight.get(key).is_some_and(|current| Arc::strong_count(current) == 1) {
            inflight.remove(key);
        }
    }

    /// Remove every entry. Telemetry is kept.
    pub fn clear(&self) {
        let mut entries = lock(&self.entries);
        let removed = entries.len();
        entries.clear();
        info!(removed, "cache cleared");
    }

    /// Zero all hit/miss counters.
    pub fn reset_telemetry(&self) {
        lock(&self.telemetry).reset();
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Describe current contents, judging liveness as of now.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = lock(&self.entries);

        let mut operations = BTreeSet::new();
        let mut soonest: Option<Instant> = None;
        let mut latest: Option<Instant> = None;
        let mut live_entries = 0;

        for (key, entry) in entries.iter().filter(|(_, e)| e.is_live(now)) {
            live_entries += 1;
            operations.insert(key.operation);
            soonest = Some(soonest.map_or(entry.expires_at, |s| s.min(entry.expires_at)));
            latest = Some(latest.map_or(entry.expires_at, |l| l.max(entry.expires_at)));
        }

        CacheStats {
            total_entries: entries.len(),
            live_entries,
            operations: operations.into_iter().map(str::to_string).collect(),
            soonest_expiry: soonest.map(|at| at - now),
            latest_expiry: latest.map(|at| at - now),
        }
    }

    /// Hit/miss totals with the default number of ranked operations.
    pub fn metrics(&self) -> CacheMetrics {
        self.metrics_top(DEFAULT_TOP_N)
    }

    pub fn metrics_top(&self, top_n: usize) -> CacheMetrics {
        lock(&self.telemetry).snapshot(top_n)
    }
}
