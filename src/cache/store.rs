//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and
//! deadline-driven TTL expiration.
//!
//! All state sits behind one `RwLock`: caller operations and the expiration
//! timer task serialize on its write half, so the entry map, the LRU tracker
//! and the expiration queue can never be observed mid-mutation.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::cache::expiry::{ExpirationQueue, ExpirationRecord};
use crate::cache::{CacheEntry, CacheKey, CacheStats, LruTracker};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::tasks::spawn_expiration_timer;

// == Armed Timer ==
/// The single outstanding expiration timer: the spawned task's handle plus
/// the deadline and key it was armed for. Arming a replacement aborts the
/// previous task first, so at most one is ever live.
struct ArmedTimer<K> {
    handle: JoinHandle<()>,
    deadline: Instant,
    key: CacheKey<K>,
}

// == Timed Cache ==
/// Bounded cache with LRU capacity eviction and per-entry TTL expiry.
///
/// Cloning the handle shares the underlying store. Entries are identified by
/// the (item, TTL) composite key: the same item added under two TTLs yields
/// two independent entries.
pub struct TimedCache<K, V> {
    inner: Arc<RwLock<CacheInner<K, V>>>,
}

impl<K, V> Clone for TimedCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> TimedCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a new cache from the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        let inner =
            Arc::new_cyclic(|weak| RwLock::new(CacheInner::new(config, Weak::clone(weak))));
        Self { inner }
    }

    /// Creates a new cache with the given capacity and default settings
    /// otherwise.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(CacheConfig {
            capacity,
            ..CacheConfig::default()
        })
    }

    // == Add ==
    /// Adds an entry under the composite key `(item, ttl)`.
    ///
    /// First write wins: if the composite key is already present the call is
    /// a silent no-op, leaving payload and expiry untouched. Otherwise the
    /// entry is stored, scheduled for expiry `ttl` from now, and marked most
    /// recently used; if that pushes the cache past capacity, the least
    /// recently touched entry is evicted.
    ///
    /// `ttl` defaults to the configured default TTL when `None`.
    pub async fn add(&self, item: K, payload: V, ttl: Option<Duration>) -> Result<()> {
        self.inner.write().await.add(item, payload, ttl)
    }

    // == Get ==
    /// Looks up the entry under `(item, ttl)`.
    ///
    /// A hit refreshes the entry's recency and returns its expiry instant
    /// and payload; a miss returns `None`.
    pub async fn get(&self, item: &K, ttl: Duration) -> Option<(Instant, V)> {
        self.inner.write().await.get(item, ttl)
    }

    // == Contains ==
    /// Checks whether `(item, ttl)` is live, without refreshing recency.
    pub async fn contains(&self, item: &K, ttl: Duration) -> bool {
        self.inner
            .read()
            .await
            .entries
            .contains_key(&CacheKey::new(item.clone(), ttl))
    }

    // == Length ==
    /// Returns the number of live entries.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    // == Is Empty ==
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats()
    }

    // == Clear ==
    /// Drops every entry, all expiration records and the armed timer.
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    #[cfg(test)]
    pub(crate) async fn check_consistency(&self) -> bool {
        self.inner.read().await.check_consistency()
    }
}

impl<K, V> TimedCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    // == Debug Dump ==
    /// Renders all three internal structures for diagnostics.
    ///
    /// Informational only; the output format is not stable.
    pub async fn debug_dump(&self) -> String {
        self.inner.read().await.render()
    }
}

// == Cache Inner ==
/// The store's guarded state: entry map, LRU tracker, expiration queue and
/// the armed-timer slot.
pub(crate) struct CacheInner<K, V> {
    /// Composite key to (expiry, payload) mapping
    entries: HashMap<CacheKey<K>, CacheEntry<V>>,
    /// Recency order over the live keys
    lru: LruTracker<CacheKey<K>>,
    /// Pending expiration records, stale ones included
    expirations: ExpirationQueue<K>,
    /// The at-most-one outstanding expiration timer
    timer: Option<ArmedTimer<K>>,
    /// Performance counters
    stats: CacheStats,
    /// Maximum number of live entries
    capacity: usize,
    /// TTL applied when `add` is called without one
    default_ttl: Duration,
    /// Expiration-queue size that triggers compaction
    queue_limit: usize,
    /// Non-owning path back to this state for timer tasks
    self_ref: Weak<RwLock<CacheInner<K, V>>>,
}

impl<K, V> CacheInner<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn new(config: CacheConfig, self_ref: Weak<RwLock<CacheInner<K, V>>>) -> Self {
        let queue_limit = config.queue_limit();
        Self {
            entries: HashMap::new(),
            // One past the store's capacity: the tracker transiently holds
            // the overflowing key until the eviction pop below, and must not
            // self-evict a key the store still considers live
            lru: LruTracker::new(config.capacity + 1),
            expirations: ExpirationQueue::new(queue_limit),
            timer: None,
            stats: CacheStats::new(),
            capacity: config.capacity,
            default_ttl: config.default_ttl,
            queue_limit,
            self_ref,
        }
    }

    // == Add ==
    fn add(&mut self, item: K, payload: V, ttl: Option<Duration>) -> Result<()> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let key = CacheKey::new(item, ttl);
        if self.entries.contains_key(&key) {
            // First write wins: neither payload nor expiry is refreshed
            return Ok(());
        }

        let entry = CacheEntry::new(payload, ttl);
        let expires_at = entry.expires_at;
        self.entries.insert(key.clone(), entry);
        self.expirations.push(ExpirationRecord {
            expires_at,
            key: key.clone(),
        });
        self.lru.touch(key);
        self.stats.set_total_entries(self.entries.len());

        if self.entries.len() > self.capacity {
            let evicted = self.lru.evict_oldest()?;
            self.entries.remove(&evicted);
            self.stats.record_eviction();
            self.stats.set_total_entries(self.entries.len());
            debug!(live = self.entries.len(), "evicted least recently used entry");

            // The evicted entry's record stays in the queue as a stale one;
            // only a timer armed for it needs replacing now
            let armed_for_evicted = self
                .timer
                .as_ref()
                .map_or(false, |timer| timer.key == evicted);
            if armed_for_evicted {
                self.cancel_timer();
                if self.expirations.is_oversized() {
                    self.compact();
                }
                self.refresh_schedule();
            }
        }

        // The timer must always track the true minimum expiry
        let supersedes_deadline = self
            .timer
            .as_ref()
            .map_or(true, |timer| expires_at <= timer.deadline);
        if supersedes_deadline {
            self.cancel_timer();
            self.refresh_schedule();
        }

        Ok(())
    }

    // == Get ==
    fn get(&mut self, item: &K, ttl: Duration) -> Option<(Instant, V)> {
        let key = CacheKey::new(item.clone(), ttl);
        match self.entries.get(&key) {
            Some(entry) => {
                let found = (entry.expires_at, entry.payload.clone());
                self.stats.record_hit();
                self.lru.touch(key);
                Some(found)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Stats ==
    fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Clear ==
    fn clear(&mut self) {
        self.cancel_timer();
        self.entries.clear();
        self.lru = LruTracker::new(self.capacity + 1);
        self.expirations = ExpirationQueue::new(self.queue_limit);
        self.stats.set_total_entries(0);
    }

    // == Refresh Schedule ==
    /// Re-arms the expiration timer for the soonest still-valid record.
    ///
    /// Stale minima (key gone, or expiry no longer the one the store
    /// recorded) are discarded as they surface. A minimum that is already
    /// due is collected on the spot and the loop continues, so a burst of
    /// simultaneous expiries drains without arming zero-length timers and
    /// without recursion.
    fn refresh_schedule(&mut self) {
        loop {
            let (expires_at, key) = loop {
                let Some(record) = self.expirations.peek() else {
                    return;
                };
                let valid = self
                    .entries
                    .get(&record.key)
                    .map_or(false, |entry| entry.expires_at == record.expires_at);
                if valid {
                    break (record.expires_at, record.key.clone());
                }
                self.expirations.pop();
            };

            if expires_at > Instant::now() {
                self.arm_timer(expires_at, key);
                return;
            }
            self.remove_expired(&key);
        }
    }

    // == Auto Cleanup ==
    /// Fired by the armed timer task once its deadline passes.
    ///
    /// Re-validates that the queue minimum still references the armed key:
    /// between this task firing and it acquiring the lock, a caller may have
    /// evicted the key and re-armed for something else, in which case the
    /// relevant cleanup already happened and this is a no-op.
    pub(crate) fn auto_cleanup(&mut self, key: &CacheKey<K>) {
        let still_current = self
            .expirations
            .peek()
            .map_or(false, |record| record.key == *key);
        if !still_current {
            trace!("expiration timer fired for a superseded record");
            return;
        }

        // This task was the armed one and has now run its course
        self.timer = None;
        self.remove_expired(key);
        self.refresh_schedule();
    }

    /// Removes the queue minimum and the entry and tracker node it refers
    /// to. Caller has validated that the minimum references `key`.
    fn remove_expired(&mut self, key: &CacheKey<K>) {
        self.expirations.pop();
        self.entries.remove(key);
        self.lru.remove(key);
        self.stats.record_expiration();
        self.stats.set_total_entries(self.entries.len());
        debug!(live = self.entries.len(), "entry expired");
    }

    // == Timer Maintenance ==
    /// Arms the deferred callback for `deadline`, cancelling any previous
    /// one first so exactly one timer is outstanding.
    fn arm_timer(&mut self, deadline: Instant, key: CacheKey<K>) {
        self.cancel_timer();
        let handle = spawn_expiration_timer(Weak::clone(&self.self_ref), deadline, key.clone());
        self.timer = Some(ArmedTimer {
            handle,
            deadline,
            key,
        });
        trace!(in_ms = %deadline.saturating_duration_since(Instant::now()).as_millis(), "armed expiration timer");
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
    }

    // == Compact ==
    /// One-pass rebuild of the expiration queue dropping records for keys
    /// that are no longer live.
    fn compact(&mut self) {
        let entries = &self.entries;
        let dropped = self.expirations.compact(|key| entries.contains_key(key));
        info!(
            dropped,
            remaining = self.expirations.len(),
            "compacted expiration queue"
        );
    }

    #[cfg(test)]
    pub(crate) fn check_consistency(&self) -> bool {
        // Live keys and tracked keys are in bijection
        if self.entries.len() != self.lru.len() {
            return false;
        }
        if !self.entries.keys().all(|key| self.lru.contains(key)) {
            return false;
        }
        // Capacity bound holds
        if self.entries.len() > self.capacity {
            return false;
        }
        // The soonest non-stale record agrees with the soonest live expiry
        let queue_min = self
            .expirations
            .iter()
            .filter(|record| {
                self.entries
                    .get(&record.key)
                    .map_or(false, |entry| entry.expires_at == record.expires_at)
            })
            .map(|record| record.expires_at)
            .min();
        let entries_min = self.entries.values().map(|entry| entry.expires_at).min();
        queue_min == entries_min
    }
}

impl<K, V> CacheInner<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn render(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let _ = writeln!(out, "Cache(size={}):", self.entries.len());
        for (key, entry) in &self.entries {
            let _ = writeln!(
                out,
                "| {:?} => {:?} (expires in {:?}) |",
                key,
                entry.payload,
                entry.ttl_remaining()
            );
        }
        let _ = writeln!(out, "Expiration queue(size={}):", self.expirations.len());
        for record in self.expirations.iter() {
            let _ = writeln!(
                out,
                "| {:?} in {:?} |",
                record.key,
                record.expires_at.saturating_duration_since(Instant::now())
            );
        }
        let chain: Vec<String> = self.lru.iter().map(|key| format!("{:?}", key)).collect();
        let _ = writeln!(out, "LRU[{}]", chain.join(" -> "));
        out
    }
}

impl<K, V> Drop for CacheInner<K, V> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
    }
}
