//! Ephemeral results: `ValidationScore` and `ConsensusResult`.

use serde::{Deserialize, Serialize};

pub use agentmesh_state::Subscores;

use crate::domain::message::AgentMessage;

/// Multi-factor quality score of a candidate answer. Every field is in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationScore {
    #[serde(rename = "final")]
    pub final_score: f64,
    pub subscores: Subscores,
}

/// Outcome of validating a message trace under a strategy.
///
/// Rejection is a normal, explained outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusResult {
    pub accepted: bool,
    /// Present iff `accepted`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_message: Option<AgentMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Number of CRITIQUE messages in the trace.
    pub disagreements: usize,
}
