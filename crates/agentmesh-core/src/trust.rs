//! Trust propagation over the peer graph.
//!
//! PageRank with uniform teleport over an undirected graph built from live
//! links. Peers without a live link keep a self-loop so their mass is not
//! lost, and they still collect the teleport share every iteration.
//!
//! The computation runs a fixed number of iterations from the uniform vector,
//! so re-running it over an unchanged graph yields the same values.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use agentmesh_state::{LinkRecord, PeerRecord, TrustGraphStore};

use crate::domain::Result;
use crate::metrics::METRICS;
use crate::obs;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    pub damping: f64,
    pub iterations: usize,
    /// Decimal places kept when writing trust back.
    pub precision: u32,
    /// Attempts per peer write before the peer is reported as failed.
    pub write_attempts: usize,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            iterations: 20,
            precision: 4,
            write_attempts: 3,
        }
    }
}

fn round_to(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (value * scale).round() / scale
}

/// Trust value per peer, in the order peers first appear in `peers`.
///
/// Duplicate peer ids are collapsed. Links naming unknown peers, self-links
/// and links whose health is `down` are ignored.
pub fn compute_trust(
    peers: &[PeerRecord],
    links: &[LinkRecord],
    config: &TrustConfig,
) -> Vec<(String, f64)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut ids: Vec<&str> = Vec::new();
    for peer in peers {
        if !index.contains_key(peer.id.as_str()) {
            index.insert(peer.id.as_str(), ids.len());
            ids.push(peer.id.as_str());
        }
    }
    let n = ids.len();
    if n == 0 {
        return Vec::new();
    }

    let mut neighbours: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    for link in links.iter().filter(|l| l.health.is_live()) {
        let (Some(&a), Some(&b)) = (index.get(link.a.as_str()), index.get(link.b.as_str())) else {
            continue;
        };
        if a != b {
            neighbours[a].insert(b);
            neighbours[b].insert(a);
        }
    }
    for (i, set) in neighbours.iter_mut().enumerate() {
        if set.is_empty() {
            set.insert(i);
        }
    }
    let adjacency: Vec<Vec<usize>> = neighbours.into_iter().map(|s| s.into_iter().collect()).collect();

    let d = config.damping;
    let teleport = (1.0 - d) / n as f64;
    let mut current = vec![1.0 / n as f64; n];
    let mut next = vec![0.0; n];

    for _ in 0..config.iterations {
        for (i, slot) in next.iter_mut().enumerate() {
            let inflow: f64 = adjacency[i]
                .iter()
                .map(|&j| current[j] / adjacency[j].len() as f64)
                .sum();
            *slot = teleport + d * inflow;
        }
        let total: f64 = next.iter().sum();
        if total > 0.0 {
            for v in next.iter_mut() {
                *v /= total;
            }
        }
        std::mem::swap(&mut current, &mut next);
    }

    ids.into_iter()
        .zip(current)
        .map(|(id, trust)| (id.to_string(), round_to(trust, config.precision)))
        .collect()
}

/// Summary of one propagation pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrustReport {
    pub updated: usize,
    /// Peers whose write kept failing after every attempt.
    pub failed: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Computed trust per peer, including peers whose write failed.
    pub trust: Vec<(String, f64)>,
}

impl TrustReport {
    fn from_values(trust: Vec<(String, f64)>) -> Self {
        if trust.is_empty() {
            return Self::default();
        }
        let values = trust.iter().map(|(_, t)| *t);
        let min = values.clone().fold(f64::INFINITY, f64::min);
        let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.sum::<f64>() / trust.len() as f64;
        Self {
            updated: 0,
            failed: 0,
            min,
            max,
            mean,
            trust,
        }
    }
}

/// Batch job: snapshot the store, compute, write every peer back.
#[derive(Debug, Clone, Default)]
pub struct TrustPropagator {
    config: TrustConfig,
}

impl TrustPropagator {
    pub fn new(config: TrustConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    /// One propagation pass. Read failures are returned as errors; a failing
    /// peer write is retried and then counted in `failed` without stopping the
    /// remaining writes.
    pub async fn run(&self, store: &dyn TrustGraphStore) -> Result<TrustReport> {
        let peers = store.peers().await?;
        if peers.is_empty() {
            info!(event = "trust.skipped", "no peers; nothing to propagate");
            return Ok(TrustReport::default());
        }
        let links = store.links().await?;

        let mut report = TrustReport::from_values(compute_trust(&peers, &links, &self.config));
        for (peer_id, trust) in &report.trust {
            if self.write_with_retry(store, peer_id, *trust).await {
                report.updated += 1;
            } else {
                report.failed += 1;
            }
        }

        METRICS.inc_trust_passes();
        obs::emit_trust_propagated(
            report.updated,
            report.failed,
            report.min,
            report.max,
            report.mean,
        );
        Ok(report)
    }

    async fn write_with_retry(&self, store: &dyn TrustGraphStore, peer_id: &str, trust: f64) -> bool {
        let attempts = self.config.write_attempts.max(1);
        for attempt in 1..=attempts {
            match store.set_trust(peer_id, trust).await {
                Ok(()) => return true,
                Err(e) => warn!(
                    peer = %peer_id,
                    attempt,
                    attempts,
                    error = %e,
                    "trust write failed"
                ),
            }
        }
        false
    }
}

/// [`TrustPropagator::run`] with the default configuration.
pub async fn propagate_trust(store: &dyn TrustGraphStore) -> Result<TrustReport> {
    TrustPropagator::default().run(store).await
}
