//! Trait contract tests for ModelRegistry, SampleStore, and TrustGraphStore.
//!
//! These tests verify the behavioral contracts of the storage traits
//! using in-memory fakes. Any conforming implementation must pass these.

use agentmesh_state::fakes::{MemoryModelRegistry, MemorySampleStore, MemoryTrustGraph};
use agentmesh_state::storage_traits::*;
use agentmesh_state::{
    LabeledSample, LinkHealth, LinkRecord, ModelDoc, ModelMetrics, ModelThresholds, ModelWeights,
    PeerRecord, StorageError, Subscores,
};

fn doc(notes: &str) -> ModelDoc {
    ModelDoc::new(
        ModelWeights::default(),
        ModelThresholds::default(),
        ModelMetrics::default(),
        notes,
    )
    .unwrap()
}

// ===========================================================================
// ModelRegistry contract tests
// ===========================================================================

#[tokio::test]
async fn registry_active_is_none_when_empty() {
    let registry = MemoryModelRegistry::new();
    assert!(registry.active().await.unwrap().is_none());
}

#[tokio::test]
async fn registry_publish_activates_new_version() {
    let registry = MemoryModelRegistry::new();
    let first = doc("first");
    let second = doc("second");
    registry.publish(first.clone()).await.unwrap();
    registry.publish(second.clone()).await.unwrap();

    let active = registry.active().await.unwrap().unwrap();
    assert_eq!(active.version, second.version);
}

#[tokio::test]
async fn registry_rejects_duplicate_version() {
    let registry = MemoryModelRegistry::new();
    let d = doc("dup");
    registry.publish(d.clone()).await.unwrap();
    let err = registry.publish(d).await.unwrap_err();

    assert!(matches!(err, StorageError::VersionExists { .. }));
}

#[tokio::test]
async fn registry_history_is_newest_first_and_never_shrinks() {
    let registry = MemoryModelRegistry::new();
    let a = doc("a");
    let b = doc("b");
    registry.publish(a.clone()).await.unwrap();
    registry.publish(b.clone()).await.unwrap();
    registry.rollback().await.unwrap();

    let history = registry.history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version, b.version);
    assert_eq!(history[1].version, a.version);
}

#[tokio::test]
async fn registry_rollback_reselects_previous_version() {
    let registry = MemoryModelRegistry::new();
    let a = doc("a");
    let b = doc("b");
    registry.publish(a.clone()).await.unwrap();
    registry.publish(b.clone()).await.unwrap();

    let rolled = registry.rollback().await.unwrap();
    assert_eq!(rolled.version, a.version);
    assert_eq!(
        registry.active().await.unwrap().unwrap().version,
        a.version
    );
    // The newer document is still retrievable.
    assert_eq!(registry.get(&b.version).await.unwrap(), b);
}

#[tokio::test]
async fn registry_rollback_without_previous_fails() {
    let registry = MemoryModelRegistry::new();
    assert!(matches!(
        registry.rollback().await.unwrap_err(),
        StorageError::NoPreviousVersion
    ));

    registry.publish(doc("only")).await.unwrap();
    assert!(matches!(
        registry.rollback().await.unwrap_err(),
        StorageError::NoPreviousVersion
    ));
}

#[tokio::test]
async fn registry_select_unknown_version_fails() {
    let registry = MemoryModelRegistry::new();
    let err = registry.select("model-missing").await.unwrap_err();
    assert!(matches!(err, StorageError::ModelNotFound { .. }));
}

#[tokio::test]
async fn registry_select_any_prior_version() {
    let registry = MemoryModelRegistry::new();
    let a = doc("a");
    registry.publish(a.clone()).await.unwrap();
    registry.publish(doc("b")).await.unwrap();
    registry.publish(doc("c")).await.unwrap();

    registry.select(&a.version).await.unwrap();
    assert_eq!(
        registry.active().await.unwrap().unwrap().version,
        a.version
    );
}

// ===========================================================================
// SampleStore contract tests
// ===========================================================================

#[tokio::test]
async fn sample_store_preserves_insertion_order() {
    let store = MemorySampleStore::new();
    for i in 0..3 {
        store
            .record(LabeledSample {
                id: format!("s{i}"),
                subscores: Subscores::new(0.5, 0.5, 0.5, 0.5),
                label: i % 2 == 0,
                confidence: 0.9,
                session_id: None,
            })
            .await
            .unwrap();
    }
    let ids: Vec<String> = store
        .labeled_samples()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["s0", "s1", "s2"]);
}

// ===========================================================================
// TrustGraphStore contract tests
// ===========================================================================

fn graph() -> MemoryTrustGraph {
    MemoryTrustGraph::new(
        vec![
            PeerRecord {
                id: "a".into(),
                trust: 0.0,
            },
            PeerRecord {
                id: "b".into(),
                trust: 0.0,
            },
        ],
        vec![LinkRecord::new("a", "b", LinkHealth::Down)],
    )
}

#[tokio::test]
async fn trust_graph_set_trust_is_idempotent() {
    let g = graph();
    g.set_trust("a", 0.25).await.unwrap();
    g.set_trust("a", 0.25).await.unwrap();
    assert_eq!(g.trust_of("a").unwrap(), 0.25);
}

#[tokio::test]
async fn trust_graph_unknown_peer_fails() {
    let g = graph();
    let err = g.set_trust("zed", 0.1).await.unwrap_err();
    assert!(matches!(err, StorageError::PeerNotFound { .. }));
}

#[tokio::test]
async fn trust_graph_keeps_down_links() {
    let g = graph();
    let links = g.links().await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].health, LinkHealth::Down);
}

#[tokio::test]
async fn trust_graph_injected_failures_are_transient() {
    let g = graph();
    g.fail_next_writes("b", 1).unwrap();
    assert!(g.set_trust("b", 0.5).await.is_err());
    g.set_trust("b", 0.5).await.unwrap();
    assert_eq!(g.trust_of("b").unwrap(), 0.5);
    assert_eq!(g.write_count().unwrap(), 1);
}
