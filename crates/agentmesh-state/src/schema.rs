//! Record shapes persisted by the surrounding product.
//!
//! The engine never owns durable storage; these types are the contract
//! between the engine and whatever document store the host wires in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage_traits::{ContentDigest, StorageResult};

// ---------------------------------------------------------------------------
// Scoring model
// ---------------------------------------------------------------------------

/// The four independent quality dimensions of a validation score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Subscores {
    pub citation: f64,
    pub context: f64,
    pub source: f64,
    pub relevance: f64,
}

impl Subscores {
    pub fn new(citation: f64, context: f64, source: f64, relevance: f64) -> Self {
        Self {
            citation,
            context,
            source,
            relevance,
        }
    }

    /// Dimensions in fixed order: citation, context, source, relevance.
    pub fn as_array(&self) -> [f64; 4] {
        [self.citation, self.context, self.source, self.relevance]
    }
}

/// Weights of the linear combination producing the final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelWeights {
    pub citation: f64,
    pub context: f64,
    pub source: f64,
    pub relevance: f64,
}

impl Default for ModelWeights {
    fn default() -> Self {
        Self {
            citation: 0.35,
            context: 0.20,
            source: 0.20,
            relevance: 0.25,
        }
    }
}

impl ModelWeights {
    pub fn from_array(values: [f64; 4]) -> Self {
        Self {
            citation: values[0],
            context: values[1],
            source: values[2],
            relevance: values[3],
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.citation, self.context, self.source, self.relevance]
    }

    /// Weights rescaled to be non-negative and sum to 1.
    ///
    /// Falls back to the defaults when the weights are degenerate (all zero,
    /// negative or non-finite), so the final score stays bounded.
    pub fn normalized(&self) -> Self {
        let clipped = self
            .as_array()
            .map(|w| if w.is_finite() { w.max(0.0) } else { 0.0 });
        let sum: f64 = clipped.iter().sum();
        if sum <= f64::EPSILON {
            return Self::default();
        }
        Self::from_array(clipped.map(|w| w / sum))
    }

    /// Weighted sum of `subscores` using the normalized weights.
    pub fn combine(&self, subscores: &Subscores) -> f64 {
        let w = self.normalized().as_array();
        let s = subscores.as_array();
        w.iter().zip(s.iter()).map(|(w, s)| w * s).sum()
    }
}

/// Pass threshold plus per-dimension floors used for feedback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelThresholds {
    /// Minimum final score for an answer to pass validation.
    pub pass: f64,
    pub citation_floor: f64,
    pub context_floor: f64,
    pub source_floor: f64,
    pub relevance_floor: f64,
}

impl Default for ModelThresholds {
    fn default() -> Self {
        Self {
            pass: 0.55,
            citation_floor: 0.5,
            context_floor: 0.5,
            source_floor: 0.5,
            relevance_floor: 0.5,
        }
    }
}

/// Quality of a calibrated model measured on its training samples.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub acc: f64,
    pub precision: f64,
    /// Undefined when the sample set holds no positive labels.
    pub recall: Option<f64>,
    pub samples: usize,
}

/// Immutable, versioned snapshot of the scoring model.
///
/// Calibration always produces a new document; existing versions are never
/// rewritten. `digest` covers `weights` and `thresholds` so a stored document
/// can be checked for tampering with [`ModelDoc::verify`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDoc {
    pub version: String,
    pub ts: DateTime<Utc>,
    pub weights: ModelWeights,
    pub thresholds: ModelThresholds,
    pub metrics: ModelMetrics,
    pub notes: String,
    pub digest: ContentDigest,
}

impl ModelDoc {
    /// Create a document with a freshly generated version string.
    pub fn new(
        weights: ModelWeights,
        thresholds: ModelThresholds,
        metrics: ModelMetrics,
        notes: impl Into<String>,
    ) -> StorageResult<Self> {
        let ts = Utc::now();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let version = format!("model-{}-{}", ts.format("%Y%m%dT%H%M%SZ"), &suffix[..8]);
        let digest = Self::compute_digest(&weights, &thresholds)?;
        Ok(Self {
            version,
            ts,
            weights,
            thresholds,
            metrics,
            notes: notes.into(),
            digest,
        })
    }

    fn compute_digest(
        weights: &ModelWeights,
        thresholds: &ModelThresholds,
    ) -> StorageResult<ContentDigest> {
        let bytes = serde_json::to_vec(&(weights, thresholds))?;
        Ok(ContentDigest::from_bytes(&bytes))
    }

    /// Re-derive the digest and compare it with the recorded one.
    pub fn verify(&self) -> StorageResult<()> {
        let computed = Self::compute_digest(&self.weights, &self.thresholds)?;
        if computed != self.digest {
            return Err(StorageError::DigestMismatch {
                expected: self.digest.to_string(),
                actual: computed.to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Labeled outcomes
// ---------------------------------------------------------------------------

fn default_confidence() -> f64 {
    1.0
}

/// A scored answer whose correctness was later confirmed or refuted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub id: String,
    pub subscores: Subscores,
    /// `true` when the answer was judged acceptable.
    pub label: bool,
    /// Labeler confidence in [0, 1].
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub session_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Trust graph
// ---------------------------------------------------------------------------

/// A participant in the trust graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub id: String,
    #[serde(default)]
    pub trust: f64,
}

/// Observed health of a link between two peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkHealth {
    Up,
    Degraded,
    Down,
}

impl LinkHealth {
    /// Down links are skipped for a propagation pass but stay in the store.
    pub fn is_live(self) -> bool {
        !matches!(self, Self::Down)
    }
}

/// Undirected link between peers `a` and `b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub a: String,
    pub b: String,
    pub health: LinkHealth,
}

impl LinkRecord {
    pub fn new(a: impl Into<String>, b: impl Into<String>, health: LinkHealth) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            health,
        }
    }
}
