use agentmesh_core::{
    compute_trust, propagate_trust, LinkHealth, LinkRecord, PeerRecord, TrustConfig,
    TrustGraphStore, TrustPropagator,
};
use agentmesh_state::fakes::MemoryTrustGraph;

fn peers(ids: &[&str]) -> Vec<PeerRecord> {
    ids.iter()
        .map(|id| PeerRecord {
            id: id.to_string(),
            trust: 0.0,
        })
        .collect()
}

fn link(a: &str, b: &str, health: LinkHealth) -> LinkRecord {
    LinkRecord::new(a, b, health)
}

fn triangle() -> MemoryTrustGraph {
    MemoryTrustGraph::new(
        peers(&["a", "b", "c"]),
        vec![
            link("a", "b", LinkHealth::Up),
            link("b", "c", LinkHealth::Up),
            link("c", "a", LinkHealth::Up),
        ],
    )
}

#[tokio::test]
async fn fully_connected_triangle_gets_equal_trust() {
    let graph = triangle();
    let report = propagate_trust(&graph).await.unwrap();

    assert_eq!(report.updated, 3);
    assert_eq!(report.failed, 0);
    for id in ["a", "b", "c"] {
        let t = graph.trust_of(id).unwrap();
        assert!((t - 0.3333).abs() < 1e-9, "{id}: {t}");
    }
    assert!((report.mean - 0.3333).abs() < 1e-9);
}

#[test]
fn trust_sums_to_one_without_down_links() {
    let ps = peers(&["a", "b", "c", "d", "e"]);
    let ls = vec![
        link("a", "b", LinkHealth::Up),
        link("b", "c", LinkHealth::Degraded),
        link("c", "d", LinkHealth::Up),
        link("a", "c", LinkHealth::Up),
    ];
    let trust = compute_trust(&ps, &ls, &TrustConfig::default());
    let sum: f64 = trust.iter().map(|(_, t)| t).sum();
    // Rounded to 4 places per peer.
    assert!((sum - 1.0).abs() <= 5e-4, "sum {sum}");
}

#[test]
fn isolated_peer_keeps_a_positive_share() {
    let ps = peers(&["a", "b", "loner"]);
    let ls = vec![link("a", "b", LinkHealth::Up)];
    let trust = compute_trust(&ps, &ls, &TrustConfig::default());
    let loner = trust.iter().find(|(id, _)| id == "loner").unwrap().1;
    assert!(loner > 0.0);
}

#[test]
fn down_links_are_excluded() {
    let ps = peers(&["a", "b", "c"]);
    let with_down = vec![
        link("a", "b", LinkHealth::Up),
        link("b", "c", LinkHealth::Down),
    ];
    let without = vec![link("a", "b", LinkHealth::Up)];
    let cfg = TrustConfig::default();
    assert_eq!(
        compute_trust(&ps, &with_down, &cfg),
        compute_trust(&ps, &without, &cfg)
    );
}

#[tokio::test]
async fn down_links_stay_in_the_store() {
    let graph = MemoryTrustGraph::new(
        peers(&["a", "b"]),
        vec![link("a", "b", LinkHealth::Down)],
    );
    propagate_trust(&graph).await.unwrap();
    assert_eq!(graph.links().await.unwrap().len(), 1);
}

#[tokio::test]
async fn empty_graph_is_a_no_op() {
    let graph = MemoryTrustGraph::new(vec![], vec![]);
    let report = propagate_trust(&graph).await.unwrap();
    assert_eq!(report.updated, 0);
    assert_eq!(report.failed, 0);
    assert!(report.trust.is_empty());
    assert_eq!(graph.write_count().unwrap(), 0);
}

#[tokio::test]
async fn rerunning_is_idempotent() {
    let graph = triangle();
    let first = propagate_trust(&graph).await.unwrap();
    let second = propagate_trust(&graph).await.unwrap();
    assert_eq!(first.trust, second.trust);
}

#[tokio::test]
async fn transient_write_failures_are_retried() {
    let graph = triangle();
    graph.fail_next_writes("b", 2).unwrap();

    let report = propagate_trust(&graph).await.unwrap();

    assert_eq!(report.updated, 3);
    assert_eq!(report.failed, 0);
    assert!((graph.trust_of("b").unwrap() - 0.3333).abs() < 1e-9);
}

#[tokio::test]
async fn persistent_write_failure_is_reported_and_others_still_written() {
    let graph = triangle();
    graph.fail_next_writes("b", 10).unwrap();
    let propagator = TrustPropagator::new(TrustConfig {
        write_attempts: 2,
        ..TrustConfig::default()
    });

    let report = propagator.run(&graph).await.unwrap();

    assert_eq!(report.updated, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(graph.trust_of("b").unwrap(), 0.0);
    assert!((graph.trust_of("a").unwrap() - 0.3333).abs() < 1e-9);
}
