//! Cache Entry Module
//!
//! Defines the composite key and the stored entry it maps to.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Key ==
/// Composite key identifying a cache entry: the item identifier paired with
/// the TTL it was added under.
///
/// Equality and hashing are structural over both fields, so the same item
/// added with two different TTLs produces two distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey<K> {
    /// The item identifier
    pub item: K,
    /// The TTL this entry was configured with
    pub ttl: Duration,
}

impl<K> CacheKey<K> {
    /// Creates a new composite key.
    pub fn new(item: K, ttl: Duration) -> Self {
        Self { item, ttl }
    }
}

// == Cache Entry ==
/// A stored payload together with its absolute expiry timestamp.
///
/// Entries are created once at insertion and never updated in place:
/// re-adding the same composite key is a no-op at the store level.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Instant at which the entry stops being valid
    pub expires_at: Instant,
    /// The stored payload
    pub payload: V,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now.
    pub fn new(payload: V, ttl: Duration) -> Self {
        Self {
            expires_at: Instant::now() + ttl,
            payload,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current time is
    /// greater than or equal to its expiry instant.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}
