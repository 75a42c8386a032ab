//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store against a plain `HashMap` model and to
//! exercise single-flight behaviour over random caller counts.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use futures::future::join_all;

use crate::cache::RequestCache;
use crate::error::CacheError;

// == Strategies ==
/// Generates cache keys from a small alphabet so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    Clear,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        4 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        2 => key_strategy().prop_map(|key| CacheOp::Delete { key }),
        1 => Just(CacheOp::Clear),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // With long TTLs the store behaves exactly like a map, and the hit/miss
    // counters match the number of lookups that found (or missed) a value.
    #[test]
    fn prop_matches_map_model(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let cache: RequestCache<String> = RequestCache::new(Duration::from_secs(300));
        let mut model: HashMap<String, String> = HashMap::new();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(key.clone(), value.clone(), None);
                    model.insert(key, value);
                }
                CacheOp::Get { key } => {
                    let got = cache.get(&key);
                    prop_assert_eq!(got.as_ref(), model.get(&key));
                    if got.is_some() {
                        expected_hits += 1;
                    } else {
                        expected_misses += 1;
                    }
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(cache.delete(&key), model.remove(&key).is_some());
                }
                CacheOp::Clear => {
                    prop_assert_eq!(cache.clear(), model.len());
                    model.clear();
                }
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, model.len(), "Total entries mismatch");
        prop_assert_eq!(stats.pending_requests, 0);
    }

    // Deleting one key never disturbs any other key.
    #[test]
    fn prop_delete_isolation(
        entries in prop::collection::hash_map(key_strategy(), value_strategy(), 2..10),
    ) {
        let cache: RequestCache<String> = RequestCache::default();
        for (key, value) in &entries {
            cache.set(key.clone(), value.clone(), None);
        }

        let victim = entries.keys().next().cloned().unwrap();
        prop_assert!(cache.delete(&victim));
        prop_assert!(cache.get(&victim).is_none());

        for (key, value) in entries.iter().filter(|(k, _)| **k != victim) {
            let got = cache.get(key);
            prop_assert_eq!(got.as_ref(), Some(value));
        }
    }

    // However many callers arrive together, the fetcher runs once and
    // everyone gets its value.
    #[test]
    fn prop_single_flight(callers in 1usize..40, value in any::<u64>()) {
        let cache: RequestCache<u64> = RequestCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let results = tokio_test::block_on(join_all((0..callers).map(|_| {
            let calls = Arc::clone(&calls);
            cache.dedupe(
                "key",
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok::<_, CacheError>(value)
                },
                None,
            )
        })));

        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
        prop_assert!(results.iter().all(|r| r == &Ok(value)));
        prop_assert_eq!(cache.stats().coalesced, callers as u64 - 1);
        prop_assert_eq!(cache.pending_len(), 0);
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // A value is readable before its TTL elapses and gone (purged, not just
    // hidden) afterwards.
    #[test]
    fn prop_ttl_expiration_behavior(key in key_strategy(), value in value_strategy()) {
        let cache: RequestCache<String> = RequestCache::default();

        cache.set(key.clone(), value.clone(), Some(Duration::from_millis(100)));
        prop_assert_eq!(cache.get(&key), Some(value));

        sleep(Duration::from_millis(150));

        prop_assert!(cache.get(&key).is_none(), "Entry should not be found after TTL expires");
        prop_assert_eq!(cache.len(), 0, "Expired entry should be purged on read");
        prop_assert!(cache.get(&key).is_none());
    }
}
