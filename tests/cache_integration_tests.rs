//! Integration tests for the cache
//!
//! Exercises the public API end to end: LRU eviction under capacity
//! pressure, scheduler-driven TTL expiry, and the interplay between the
//! two. Timing-sensitive cases run under tokio's paused clock so deadlines
//! are deterministic.

use std::time::Duration;

use tokio::time::Instant;

use expiring_lru::{CacheConfig, TimedCache};

const TTL: Duration = Duration::from_secs(60);

fn cache_with_capacity(capacity: usize) -> TimedCache<&'static str, &'static str> {
    TimedCache::new(CacheConfig {
        capacity,
        ..CacheConfig::default()
    })
}

// == LRU Eviction ==

#[tokio::test]
async fn eviction_drops_least_recently_added() {
    let cache = cache_with_capacity(2);

    cache.add("a", "A", Some(TTL)).await.unwrap();
    cache.add("b", "B", Some(TTL)).await.unwrap();
    cache.add("c", "C", Some(TTL)).await.unwrap();

    assert!(!cache.contains(&"a", TTL).await);
    assert!(cache.contains(&"b", TTL).await);
    assert!(cache.contains(&"c", TTL).await);
    assert_eq!(cache.len().await, 2);
}

#[tokio::test]
async fn accessed_entry_survives_eviction() {
    let cache = cache_with_capacity(3);

    cache.add("a", "A", Some(TTL)).await.unwrap();
    cache.add("b", "B", Some(TTL)).await.unwrap();
    cache.add("c", "C", Some(TTL)).await.unwrap();

    // Refresh "a" twice; "b" becomes the eviction candidate
    assert!(cache.get(&"a", TTL).await.is_some());
    assert!(cache.get(&"a", TTL).await.is_some());

    cache.add("d", "D", Some(TTL)).await.unwrap();

    assert!(cache.contains(&"a", TTL).await);
    assert!(!cache.contains(&"b", TTL).await);
    assert!(cache.contains(&"c", TTL).await);
    assert!(cache.contains(&"d", TTL).await);
}

// == Lookup Semantics ==

#[tokio::test(start_paused = true)]
async fn get_returns_expiry_and_payload() {
    let cache = cache_with_capacity(16);
    let now = Instant::now();

    cache.add("a", "A", Some(TTL)).await.unwrap();

    let (expires_at, payload) = cache.get(&"a", TTL).await.unwrap();
    assert_eq!(expires_at, now + TTL);
    assert_eq!(payload, "A");
}

#[tokio::test(start_paused = true)]
async fn re_adding_does_not_refresh() {
    let cache = cache_with_capacity(16);

    cache.add("a", "1", Some(TTL)).await.unwrap();
    let (first_expiry, _) = cache.get(&"a", TTL).await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    cache.add("a", "2", Some(TTL)).await.unwrap();

    let (expires_at, payload) = cache.get(&"a", TTL).await.unwrap();
    assert_eq!(payload, "1");
    assert_eq!(expires_at, first_expiry);
}

#[tokio::test]
async fn same_item_different_ttls_coexist() {
    let cache = cache_with_capacity(16);

    cache
        .add("a", "short", Some(Duration::from_secs(30)))
        .await
        .unwrap();
    cache
        .add("a", "long", Some(Duration::from_secs(90)))
        .await
        .unwrap();

    assert_eq!(cache.len().await, 2);
    assert!(cache.contains(&"a", Duration::from_secs(30)).await);
    assert!(cache.contains(&"a", Duration::from_secs(90)).await);
    assert!(!cache.contains(&"a", Duration::from_secs(60)).await);
}

// == Scheduler-Driven Expiry ==

#[tokio::test(start_paused = true)]
async fn entry_expires_without_manual_cleanup() {
    let cache = cache_with_capacity(16);
    let ttl = Duration::from_millis(50);

    cache.add("x", "X", Some(ttl)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!cache.contains(&"x", ttl).await);
    assert_eq!(cache.len().await, 0);
}

#[tokio::test(start_paused = true)]
async fn entry_is_never_removed_early() {
    let cache = cache_with_capacity(16);
    let ttl = Duration::from_secs(5);

    cache.add("x", "X", Some(ttl)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert!(cache.contains(&"x", ttl).await);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!cache.contains(&"x", ttl).await);
}

#[tokio::test(start_paused = true)]
async fn entries_expire_in_deadline_order() {
    let cache = cache_with_capacity(16);
    let short = Duration::from_millis(50);
    let long = Duration::from_millis(200);

    // Insert the long-lived entry first; the later insert with the sooner
    // deadline must supersede the armed timer
    cache.add("slow", "S", Some(long)).await.unwrap();
    cache.add("fast", "F", Some(short)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!cache.contains(&"fast", short).await);
    assert!(cache.contains(&"slow", long).await);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!cache.contains(&"slow", long).await);
    assert_eq!(cache.len().await, 0);
}

#[tokio::test(start_paused = true)]
async fn simultaneous_expiries_all_drain() {
    let cache = cache_with_capacity(16);
    let ttl = Duration::from_millis(50);

    for item in ["a", "b", "c", "d", "e"] {
        cache.add(item, "V", Some(ttl)).await.unwrap();
    }
    assert_eq!(cache.len().await, 5);

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(cache.len().await, 0);
    let stats = cache.stats().await;
    assert_eq!(stats.expirations, 5);
    assert_eq!(stats.evictions, 0);
}

// == Eviction / Scheduler Interplay ==

#[tokio::test(start_paused = true)]
async fn timer_rearms_after_armed_key_is_evicted() {
    let cache = cache_with_capacity(2);

    // "a" holds the soonest deadline, so the timer is armed for it
    cache.add("a", "A", Some(Duration::from_millis(50))).await.unwrap();
    cache.add("b", "B", Some(Duration::from_millis(150))).await.unwrap();
    // Capacity overflow evicts "a" (least recently used AND armed)
    cache.add("c", "C", Some(Duration::from_millis(250))).await.unwrap();

    assert!(!cache.contains(&"a", Duration::from_millis(50)).await);
    assert_eq!(cache.len().await, 2);

    // Past "a"'s old deadline nothing must disappear
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(cache.len().await, 2);

    // "b" then "c" expire on their own deadlines
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!cache.contains(&"b", Duration::from_millis(150)).await);
    assert!(cache.contains(&"c", Duration::from_millis(250)).await);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(cache.len().await, 0);

    let stats = cache.stats().await;
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.expirations, 2);
}

#[tokio::test(start_paused = true)]
async fn oversized_queue_is_compacted_and_cache_stays_correct() {
    // Tight queue limit so churn forces a compaction pass
    let cache: TimedCache<&str, &str> = TimedCache::new(CacheConfig {
        capacity: 2,
        queue_limit: Some(2),
        ..CacheConfig::default()
    });

    cache.add("a", "A", Some(Duration::from_secs(1))).await.unwrap();
    cache.add("b", "B", Some(Duration::from_secs(2))).await.unwrap();
    // Evicts "a", the armed key; the queue is past its limit and compacted
    cache.add("c", "C", Some(Duration::from_secs(3))).await.unwrap();
    // Same again for "b"
    cache.add("d", "D", Some(Duration::from_secs(4))).await.unwrap();

    assert_eq!(cache.len().await, 2);
    assert!(cache.contains(&"c", Duration::from_secs(3)).await);
    assert!(cache.contains(&"d", Duration::from_secs(4)).await);

    // Survivors still expire on schedule after the rebuild
    tokio::time::sleep(Duration::from_millis(3_100)).await;
    assert!(!cache.contains(&"c", Duration::from_secs(3)).await);
    assert!(cache.contains(&"d", Duration::from_secs(4)).await);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(cache.len().await, 0);
}

// == Bulk Reset ==

#[tokio::test(start_paused = true)]
async fn clear_cancels_pending_expiry() {
    let cache = cache_with_capacity(16);

    cache.add("a", "A", Some(Duration::from_millis(50))).await.unwrap();
    cache.add("b", "B", Some(TTL)).await.unwrap();

    cache.clear().await;
    assert!(cache.is_empty().await);

    // A fresh add after the reset lives out its own lifetime
    cache.add("c", "C", Some(Duration::from_millis(80))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(cache.contains(&"c", Duration::from_millis(80)).await);

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(cache.is_empty().await);
}
