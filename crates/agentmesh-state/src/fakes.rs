//! In-memory fakes for storage traits (testing and CLI use)
//!
//! Provides `MemoryModelRegistry`, `MemorySampleStore`, and `MemoryTrustGraph`
//! that satisfy the trait contracts without any external dependencies.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StorageError;
use crate::schema::{LabeledSample, LinkRecord, ModelDoc, PeerRecord};
use crate::storage_traits::*;

fn lock<T>(m: &Mutex<T>) -> StorageResult<MutexGuard<'_, T>> {
    m.lock()
        .map_err(|_| StorageError::Backend("in-memory store lock poisoned".to_string()))
}

// ---------------------------------------------------------------------------
// MemoryModelRegistry
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RegistryState {
    /// Documents in publish order.
    docs: Vec<ModelDoc>,
    /// Every activation, oldest first. The last entry is the active version.
    selections: Vec<String>,
}

impl RegistryState {
    fn find(&self, version: &str) -> StorageResult<&ModelDoc> {
        self.docs
            .iter()
            .find(|d| d.version == version)
            .ok_or_else(|| StorageError::ModelNotFound {
                version: version.to_string(),
            })
    }
}

/// In-memory append-only model registry.
#[derive(Debug, Default)]
pub struct MemoryModelRegistry {
    state: Mutex<RegistryState>,
}

impl MemoryModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelRegistry for MemoryModelRegistry {
    async fn publish(&self, doc: ModelDoc) -> StorageResult<()> {
        let mut state = lock(&self.state)?;
        if state.docs.iter().any(|d| d.version == doc.version) {
            return Err(StorageError::VersionExists {
                version: doc.version,
            });
        }
        debug!(version = %doc.version, "model published");
        state.selections.push(doc.version.clone());
        state.docs.push(doc);
        Ok(())
    }

    async fn active(&self) -> StorageResult<Option<ModelDoc>> {
        let state = lock(&self.state)?;
        match state.selections.last() {
            Some(version) => state.find(version).map(|d| Some(d.clone())),
            None => Ok(None),
        }
    }

    async fn get(&self, version: &str) -> StorageResult<ModelDoc> {
        let state = lock(&self.state)?;
        state.find(version).cloned()
    }

    async fn history(&self) -> StorageResult<Vec<ModelDoc>> {
        let state = lock(&self.state)?;
        Ok(state.docs.iter().rev().cloned().collect())
    }

    async fn select(&self, version: &str) -> StorageResult<ModelDoc> {
        let mut state = lock(&self.state)?;
        let doc = state.find(version)?.clone();
        state.selections.push(doc.version.clone());
        Ok(doc)
    }

    async fn rollback(&self) -> StorageResult<ModelDoc> {
        let mut state = lock(&self.state)?;
        let current = state
            .selections
            .last()
            .cloned()
            .ok_or(StorageError::NoPreviousVersion)?;
        let previous = state
            .selections
            .iter()
            .rev()
            .find(|v| **v != current)
            .cloned()
            .ok_or(StorageError::NoPreviousVersion)?;
        let doc = state.find(&previous)?.clone();
        debug!(from = %current, to = %previous, "model rolled back");
        state.selections.push(previous);
        Ok(doc)
    }
}

// ---------------------------------------------------------------------------
// MemorySampleStore
// ---------------------------------------------------------------------------

/// In-memory labeled sample store backed by a `Vec`.
#[derive(Debug, Default)]
pub struct MemorySampleStore {
    samples: Mutex<Vec<LabeledSample>>,
}

impl MemorySampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_samples(samples: Vec<LabeledSample>) -> Self {
        Self {
            samples: Mutex::new(samples),
        }
    }
}

#[async_trait]
impl SampleStore for MemorySampleStore {
    async fn labeled_samples(&self) -> StorageResult<Vec<LabeledSample>> {
        Ok(lock(&self.samples)?.clone())
    }

    async fn record(&self, sample: LabeledSample) -> StorageResult<()> {
        lock(&self.samples)?.push(sample);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryTrustGraph
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct GraphState {
    peers: Vec<PeerRecord>,
    links: Vec<LinkRecord>,
    /// Remaining injected write failures per peer id.
    failing_writes: HashMap<String, usize>,
    writes: usize,
}

/// In-memory peer graph. Supports injecting transient write failures so
/// retry behaviour can be exercised.
#[derive(Debug, Default)]
pub struct MemoryTrustGraph {
    state: Mutex<GraphState>,
}

impl MemoryTrustGraph {
    pub fn new(peers: Vec<PeerRecord>, links: Vec<LinkRecord>) -> Self {
        Self {
            state: Mutex::new(GraphState {
                peers,
                links,
                ..GraphState::default()
            }),
        }
    }

    /// Make the next `times` writes for `peer_id` fail with a backend error.
    pub fn fail_next_writes(&self, peer_id: &str, times: usize) -> StorageResult<()> {
        lock(&self.state)?
            .failing_writes
            .insert(peer_id.to_string(), times);
        Ok(())
    }

    /// Number of successful `set_trust` calls so far.
    pub fn write_count(&self) -> StorageResult<usize> {
        Ok(lock(&self.state)?.writes)
    }

    /// Current trust of `peer_id`.
    pub fn trust_of(&self, peer_id: &str) -> StorageResult<f64> {
        lock(&self.state)?
            .peers
            .iter()
            .find(|p| p.id == peer_id)
            .map(|p| p.trust)
            .ok_or_else(|| StorageError::PeerNotFound {
                peer_id: peer_id.to_string(),
            })
    }
}

#[async_trait]
impl TrustGraphStore for MemoryTrustGraph {
    async fn peers(&self) -> StorageResult<Vec<PeerRecord>> {
        Ok(lock(&self.state)?.peers.clone())
    }

    async fn links(&self) -> StorageResult<Vec<LinkRecord>> {
        Ok(lock(&self.state)?.links.clone())
    }

    async fn set_trust(&self, peer_id: &str, trust: f64) -> StorageResult<()> {
        let mut state = lock(&self.state)?;
        if let Some(remaining) = state.failing_writes.get_mut(peer_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StorageError::Backend(format!(
                    "injected write failure for {peer_id}"
                )));
            }
        }
        let peer = state
            .peers
            .iter_mut()
            .find(|p| p.id == peer_id)
            .ok_or_else(|| StorageError::PeerNotFound {
                peer_id: peer_id.to_string(),
            })?;
        peer.trust = trust;
        state.writes += 1;
        Ok(())
    }
}
