mod common;

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;

use common::{Harness, paragraphs, promo};
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use promo_embed::cache::{CacheKey, Lifetime, MemoryTagCache, TagCache};
use promo_embed::domain::types::TermId;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn promo_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let harness = Harness::new([promo(5, 7, 100)]);

    // lookup miss + query, then hit
    let picked = harness
        .manager
        .resolve(TermId(7))
        .await
        .expect("resolve")
        .expect("promo");
    harness.manager.resolve(TermId(7)).await.expect("resolve");

    // render miss, inject, then render hit
    harness
        .manager
        .inject(&picked, &paragraphs(4))
        .await
        .expect("inject");
    harness
        .manager
        .inject(&picked, &paragraphs(4))
        .await
        .expect("inject");

    // capacity eviction
    let tiny = Arc::new(MemoryTagCache::new(
        "tiny",
        NonZeroUsize::new(1).expect("non-zero"),
    ));
    for term in [1, 2] {
        tiny.set(
            CacheKey::PromoByTerm(TermId(term)),
            String::new(),
            Lifetime::Permanent,
            Default::default(),
        )
        .await
        .expect("set");
    }

    let snapshot = snapshotter.snapshot().into_vec();

    let names: HashSet<String> = snapshot
        .iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "promo_embed_cache_hit_total",
        "promo_embed_cache_miss_total",
        "promo_embed_cache_evict_total",
        "promo_embed_lookup_query_total",
        "promo_embed_render_total",
        "promo_embed_injected_total",
    ];
    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }

    let counters: HashMap<String, u64> = snapshot
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| match value {
            DebugValue::Counter(count) => {
                let key = composite_key.key();
                let bin = key
                    .labels()
                    .find(|label| label.key() == "bin")
                    .map(|label| format!("{{bin={}}}", label.value()))
                    .unwrap_or_default();
                Some((format!("{}{bin}", key.name()), count))
            }
            _ => None,
        })
        .collect();

    assert_eq!(counters.get("promo_embed_lookup_query_total"), Some(&1));
    assert_eq!(counters.get("promo_embed_render_total"), Some(&1));
    assert_eq!(counters.get("promo_embed_injected_total"), Some(&2));
    assert_eq!(counters.get("promo_embed_cache_hit_total{bin=lookup}"), Some(&1));
    assert_eq!(counters.get("promo_embed_cache_miss_total{bin=lookup}"), Some(&1));
    assert_eq!(counters.get("promo_embed_cache_hit_total{bin=render}"), Some(&1));
    assert_eq!(counters.get("promo_embed_cache_miss_total{bin=render}"), Some(&1));
    assert_eq!(counters.get("promo_embed_cache_evict_total{bin=tiny}"), Some(&1));
}
