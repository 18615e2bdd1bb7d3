//! Expiring LRU - a bounded in-memory cache
//!
//! Combines LRU capacity eviction with per-entry TTL expiry: at most
//! `capacity` entries are kept, each one is dropped automatically once its
//! own lifetime elapses, and recently-touched entries survive capacity
//! pressure longest.

pub mod cache;
pub mod config;
pub mod error;

mod tasks;

pub use cache::{CacheEntry, CacheKey, CacheStats, LruTracker, TimedCache};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
