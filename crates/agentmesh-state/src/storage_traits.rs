//! Storage trait definitions for AgentMesh
//!
//! These traits define the boundaries to the host's durable storage:
//! - `ModelRegistry`: Append-only scoring-model versions (publish/select/rollback)
//! - `SampleStore`: Labeled session outcomes used by calibration
//! - `TrustGraphStore`: Peer/link snapshot and per-peer trust writes
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;
use crate::schema::{LabeledSample, LinkRecord, ModelDoc, PeerRecord};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// The inner field is private to guarantee the string is always valid
/// lowercase hex produced by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::Backend(format!("invalid digest: {s}")));
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl From<ContentDigest> for String {
    fn from(d: ContentDigest) -> Self {
        d.0
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ModelRegistry — Versioned Scoring Models
// ---------------------------------------------------------------------------

/// Append-only registry of scoring-model versions.
///
/// Semantics:
/// - `publish` appends a new document and makes it the active version.
///   Publishing an existing version fails with `VersionExists`.
/// - `select` makes any stored version active without touching documents.
/// - `rollback` reselects the version that was active before the current one.
/// - Documents are never mutated or deleted.
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Append a new model version and activate it.
    async fn publish(&self, doc: ModelDoc) -> StorageResult<()>;

    /// The currently active model, if any version was ever published.
    async fn active(&self) -> StorageResult<Option<ModelDoc>>;

    /// Retrieve a specific version. Returns `ModelNotFound` if absent.
    async fn get(&self, version: &str) -> StorageResult<ModelDoc>;

    /// All versions, newest first.
    async fn history(&self) -> StorageResult<Vec<ModelDoc>>;

    /// Make `version` the active model.
    async fn select(&self, version: &str) -> StorageResult<ModelDoc>;

    /// Reactivate the previously active version. Fails with
    /// `NoPreviousVersion` when there is none.
    async fn rollback(&self) -> StorageResult<ModelDoc>;
}

// ---------------------------------------------------------------------------
// SampleStore — Labeled Outcomes
// ---------------------------------------------------------------------------

/// Source of labeled session outcomes for calibration.
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// All labeled samples currently available, in insertion order.
    async fn labeled_samples(&self) -> StorageResult<Vec<LabeledSample>>;

    /// Record a newly labeled sample.
    async fn record(&self, sample: LabeledSample) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// TrustGraphStore — Peer Graph Snapshot
// ---------------------------------------------------------------------------

/// Accessors for the long-lived peer/link graph.
///
/// Guarantees:
/// - `peers` and `links` return a consistent snapshot for one pass.
/// - `set_trust` is idempotent: writing the same value twice is harmless,
///   so callers may retry individual writes.
#[async_trait]
pub trait TrustGraphStore: Send + Sync {
    async fn peers(&self) -> StorageResult<Vec<PeerRecord>>;

    async fn links(&self) -> StorageResult<Vec<LinkRecord>>;

    /// Overwrite one peer's trust value. Returns `PeerNotFound` if absent.
    async fn set_trust(&self, peer_id: &str, trust: f64) -> StorageResult<()>;
}
