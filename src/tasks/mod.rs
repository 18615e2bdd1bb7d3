//! Background Tasks Module
//!
//! Contains the deferred expiration timer spawned by the cache store.

mod expiration;

pub(crate) use expiration::spawn_expiration_timer;
