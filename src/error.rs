//! Error types for the cache
//!
//! Provides unified error handling using thiserror.
//!
//! A lookup miss is not an error (`get` returns `None`), and re-adding an
//! existing composite key is a silent no-op. The only runtime error in this
//! crate signals an internal-invariant violation.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Popped the oldest key from an empty LRU tracker. The store only pops
    /// after confirming it holds at least one entry, so reaching this
    /// variant means the tracker and the entry map have diverged.
    #[error("pop on empty LRU tracker")]
    EmptyStructure,
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
