//! Expiration Timer Task
//!
//! The deferred half of the expiration scheduler: a spawned task that sleeps
//! until the armed deadline, then removes the entry it was armed for.

use std::hash::Hash;
use std::sync::Weak;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

use crate::cache::{CacheInner, CacheKey};

/// Spawns the deferred expiration callback for one armed deadline.
///
/// The task sleeps until `deadline`, re-acquires the store's write lock and
/// runs its cleanup path, which re-validates the record before acting. The
/// store holds the returned handle and aborts it when the armed deadline is
/// superseded; since arming and aborting only ever happen under the store's
/// write lock, an aborted task is either still sleeping or parked on the
/// lock — never mid-mutation.
///
/// The task holds only a `Weak` reference to the store, so an armed timer
/// never keeps a dropped cache alive; firing after the cache is gone is a
/// no-op.
pub(crate) fn spawn_expiration_timer<K, V>(
    store: Weak<RwLock<CacheInner<K, V>>>,
    deadline: Instant,
    key: CacheKey<K>,
) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        tokio::time::sleep_until(deadline).await;

        let Some(store) = store.upgrade() else {
            trace!("expiration timer fired after the cache was dropped");
            return;
        };
        let mut inner = store.write().await;
        inner.auto_cleanup(&key);
    })
}
