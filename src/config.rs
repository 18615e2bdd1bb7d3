//! Configuration Module
//!
//! Construction-time parameters for the cache, loadable from environment
//! variables with sensible defaults.

use std::env;
use std::time::Duration;

use crate::cache::{DEFAULT_CAPACITY, DEFAULT_TTL};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of live entries the cache can hold
    pub capacity: usize,
    /// TTL applied to entries added without an explicit TTL
    pub default_ttl: Duration,
    /// Size the expiration queue may grow to before stale records are
    /// compacted away; derived as 1.5x capacity when unset
    pub queue_limit: Option<usize>,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum live entries (default: 16)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds, fractional allowed (default: 60)
    /// - `CACHE_QUEUE_LIMIT` - Expiration queue compaction threshold (default: 1.5x capacity)
    pub fn from_env() -> Self {
        Self {
            capacity: env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CAPACITY),
            default_ttl: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .map(Duration::from_secs_f64)
                .unwrap_or(DEFAULT_TTL),
            queue_limit: env::var("CACHE_QUEUE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }

    /// Effective expiration-queue limit: the configured value, or 1.5x the
    /// cache capacity when none was given.
    pub fn queue_limit(&self) -> usize {
        self.queue_limit.unwrap_or(self.capacity + self.capacity / 2)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            default_ttl: DEFAULT_TTL,
            queue_limit: None,
        }
    }
}
