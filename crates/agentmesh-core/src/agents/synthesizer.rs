use std::sync::Arc;

use async_trait::async_trait;

use crate::agents::source::{ContentSource, GenerationRequest};
use crate::agents::{Agent, AgentRole};
use crate::domain::{AgentMessage, ContextHandle, MeshError, MessageKind, Result};

/// Turns a FACT into a candidate HYPOTHESIS for the validator.
///
/// When the generator returns no evidence, the FACT's evidence is carried
/// forward so the validator can still score citations.
pub struct SynthesizerAgent {
    id: String,
    source: Arc<dyn ContentSource>,
    next: Vec<String>,
}

impl SynthesizerAgent {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self {
            id: "synthesizer".to_string(),
            source,
            next: vec!["validator".to_string()],
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_next(mut self, next: Vec<String>) -> Self {
        self.next = next;
        self
    }
}

#[async_trait]
impl Agent for SynthesizerAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> AgentRole {
        AgentRole::Synthesizer
    }

    async fn handle(&self, message: &AgentMessage, context: &ContextHandle) -> Result<AgentMessage> {
        if message.kind() != MessageKind::Fact {
            return Err(MeshError::InvalidMessage(format!(
                "{} cannot handle {} messages",
                self.id,
                message.kind()
            )));
        }

        let request = GenerationRequest {
            role: self.role(),
            session_id: context.session_id.clone(),
            goal: context.goal.clone(),
            hints: context.hints.clone(),
            input: message.content().to_string(),
            evidence: message.evidence().to_vec(),
        };
        let generated = self
            .source
            .generate(request)
            .await
            .map_err(|e| MeshError::Agent {
                agent: self.id.clone(),
                reason: e.to_string(),
            })?;

        let evidence = if generated.evidence.is_empty() {
            message.evidence().to_vec()
        } else {
            generated.evidence
        };
        Ok(AgentMessage::hypothesis(
            self.id.clone(),
            self.next.clone(),
            generated.content,
            evidence,
        ))
    }
}
