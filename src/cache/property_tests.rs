//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the manager's counting and round-trip guarantees
//! against the in-memory backend.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::keys::{escape_glob, PRICE, PRODUCT, SEARCH};
use crate::cache::{glob_match, CacheManager, CacheOptions, CacheStats, MemoryBackend};
use crate::config::{BackendKind, Config};

// == Test Setup ==
fn test_manager() -> CacheManager {
    let config = Config {
        backend: BackendKind::Memory,
        ..Config::default()
    };
    CacheManager::new(
        Arc::new(MemoryBackend::new()),
        Arc::new(CacheStats::new()),
        &config,
    )
}

// == Strategies ==
/// Generates cache keys
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,32}".prop_map(|s| s)
}

/// Generates JSON values of a few shapes
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,64}".prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        ("[a-z]{1,8}", any::<u32>()).prop_map(|(name, qty)| json!({ "name": name, "qty": qty })),
    ]
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    // Small key space so operations collide
    let key = "[a-d]".prop_map(|s| s);
    prop_oneof![
        (key.clone(), value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key.clone().prop_map(|key| CacheOp::Get { key }),
        key.prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Round trip: a value written and read back before expiry is unchanged.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in value_strategy()) {
        tokio_test::block_on(async {
            let manager = test_manager();
            let opts = CacheOptions::default();

            prop_assert!(manager.set(&key, &value, &opts).await);
            prop_assert_eq!(manager.get(&key, &opts).await, Some(value));
            Ok(())
        })?;
    }

    // A key never written reads as absent and counts exactly one miss.
    #[test]
    fn prop_unwritten_key_is_a_miss(key in key_strategy()) {
        tokio_test::block_on(async {
            let manager = test_manager();

            prop_assert_eq!(manager.get(&key, &CacheOptions::default()).await, None);
            let stats = manager.stats();
            prop_assert_eq!(stats.misses(), 1);
            prop_assert_eq!(stats.hits(), 0);
            prop_assert_eq!(stats.errors(), 0);
            Ok(())
        })?;
    }

    // Counters match a model of the keyspace for any operation sequence.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..40)) {
        tokio_test::block_on(async {
            let manager = test_manager();
            let opts = CacheOptions::default();
            let mut model: HashMap<String, Value> = HashMap::new();
            let (mut hits, mut misses, mut sets, mut deletes) = (0u64, 0u64, 0u64, 0u64);

            for op in ops {
                match op {
                    CacheOp::Set { key, value } => {
                        prop_assert!(manager.set(&key, &value, &opts).await);
                        model.insert(key, value);
                        sets += 1;
                    }
                    CacheOp::Get { key } => {
                        let got = manager.get(&key, &opts).await;
                        prop_assert_eq!(&got, &model.get(&key).cloned());
                        if got.is_some() { hits += 1 } else { misses += 1 }
                    }
                    CacheOp::Delete { key } => {
                        let removed = manager.del(&key, &opts).await;
                        prop_assert_eq!(removed, model.remove(&key).is_some());
                        if removed { deletes += 1 }
                    }
                }
            }

            let snapshot = manager.stats().snapshot();
            prop_assert_eq!(snapshot.hits, hits);
            prop_assert_eq!(snapshot.misses, misses);
            prop_assert_eq!(snapshot.sets, sets);
            prop_assert_eq!(snapshot.deletes, deletes);
            prop_assert_eq!(snapshot.errors, 0);
            Ok(())
        })?;
    }

    // mset of n entries moves the sets counter by exactly n.
    #[test]
    fn prop_mset_counts_every_entry(
        entries in prop::collection::hash_map(key_strategy(), value_strategy(), 1..20)
    ) {
        tokio_test::block_on(async {
            let manager = test_manager();
            let opts = CacheOptions::default();
            let batch: Vec<(String, Value)> = entries.clone().into_iter().collect();

            prop_assert!(manager.mset(&batch, &opts).await);
            prop_assert_eq!(manager.stats().sets(), batch.len() as u64);

            let keys: Vec<&String> = batch.iter().map(|(k, _)| k).collect();
            let values = manager.mget(&keys, &opts).await;
            let expected: Vec<Option<Value>> = batch.iter().map(|(_, v)| Some(v.clone())).collect();
            prop_assert_eq!(values, expected);
            Ok(())
        })?;
    }

    // flush_pattern reports exactly the keys it removed.
    #[test]
    fn prop_flush_pattern_count(
        search_ids in prop::collection::hash_set("[a-z0-9]{1,8}", 0..15),
        product_ids in prop::collection::hash_set("[a-z0-9]{1,8}", 0..15),
    ) {
        tokio_test::block_on(async {
            let manager = test_manager();
            for id in &search_ids {
                manager.set(id, &1, &CacheOptions::prefixed(SEARCH)).await;
            }
            for id in &product_ids {
                manager.set(id, &1, &CacheOptions::prefixed(PRODUCT)).await;
            }

            let removed = manager.flush_pattern(&format!("{}*", SEARCH)).await;
            prop_assert_eq!(removed, search_ids.len() as u64);
            for id in &search_ids {
                prop_assert!(!manager.exists(id, &CacheOptions::prefixed(SEARCH)).await);
            }
            for id in &product_ids {
                prop_assert!(manager.exists(id, &CacheOptions::prefixed(PRODUCT)).await);
            }
            Ok(())
        })?;
    }

    // Invalidating a product twice ends in the same state without errors.
    #[test]
    fn prop_invalidate_product_idempotent(id in key_strategy(), queries in prop::collection::vec("[a-z ]{1,16}", 0..5)) {
        tokio_test::block_on(async {
            let manager = test_manager();
            manager.cache_product(&id, &json!({"name": "Widget"})).await;
            manager.cache_price(&id, &9.99).await;
            for query in &queries {
                manager.cache_search_results(query, &json!([id.clone()])).await;
            }

            prop_assert!(manager.invalidate_product(&id).await);
            prop_assert!(manager.invalidate_product(&id).await);

            prop_assert_eq!(manager.get_product(&id).await, None);
            prop_assert_eq!(manager.get_price(&id).await, None);
            prop_assert!(!manager.exists(&id, &CacheOptions::prefixed(PRICE)).await);
            prop_assert_eq!(manager.flush_pattern(&format!("{}*", SEARCH)).await, 0);
            prop_assert_eq!(manager.stats().errors(), 0);
            Ok(())
        })?;
    }

    // An escaped id used as a pattern matches only itself.
    #[test]
    fn prop_escaped_pattern_matches_literal(raw in "[a-z*?\\[\\]\\\\]{0,12}", other in "[a-z*?]{0,12}") {
        let pattern = escape_glob(&raw);
        prop_assert!(glob_match(&pattern, &raw));
        prop_assert_eq!(glob_match(&pattern, &other), raw == other);
    }

    // A trailing star is a prefix test.
    #[test]
    fn prop_prefix_pattern(prefix in "[a-z:]{0,8}", text in "[a-z:]{0,16}") {
        let pattern = format!("{}*", escape_glob(&prefix));
        prop_assert_eq!(glob_match(&pattern, &text), text.starts_with(&prefix));
    }
}
