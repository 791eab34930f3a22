//! Injected content generation.
//!
//! Text generation and retrieval live outside the engine. Researcher and
//! synthesizer agents call a [`ContentSource`]; tests substitute a fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agents::AgentRole;
use crate::domain::Citation;

/// What an agent asks the external generator for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub role: AgentRole,
    pub session_id: String,
    pub goal: String,
    /// Session hints plus any feedback carried by the triggering message.
    pub hints: Vec<String>,
    /// Content of the triggering message.
    pub input: String,
    /// Evidence of the triggering message, if any.
    pub evidence: Vec<Citation>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub content: String,
    #[serde(default)]
    pub evidence: Vec<Citation>,
}

impl GeneratedContent {
    pub fn new(content: impl Into<String>, evidence: Vec<Citation>) -> Self {
        Self {
            content: content.into(),
            evidence,
        }
    }
}

/// External generator/retriever. Errors are infrastructure failures and are
/// surfaced to the mesh caller as `MeshError::Agent`.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> anyhow::Result<GeneratedContent>;
}
