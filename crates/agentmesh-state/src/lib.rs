//! AgentMesh-State: storage boundary for the AgentMesh engine
//!
//! The engine owns no durable storage. This crate fixes the shapes of the
//! records the host persists and the async traits the engine reads and
//! writes them through.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: append-only model versions, labeled samples, and the peer graph.
//!
//! ## Key Components
//!
//! - `ModelDoc`: Immutable, versioned scoring-model snapshot
//! - `LabeledSample`: Scored answer with a human verdict
//! - `PeerRecord` / `LinkRecord`: Trust graph snapshot
//! - `ModelRegistry`, `SampleStore`, `TrustGraphStore`: Storage traits

mod error;
pub mod fakes;
mod schema;
pub mod storage_traits;

pub use error::StorageError;
pub use schema::{
    LabeledSample, LinkHealth, LinkRecord, ModelDoc, ModelMetrics, ModelThresholds, ModelWeights,
    PeerRecord, Subscores,
};
pub use storage_traits::{
    ContentDigest, ModelRegistry, SampleStore, StorageResult, TrustGraphStore,
};
