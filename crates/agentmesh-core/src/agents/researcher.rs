use std::sync::Arc;

use async_trait::async_trait;

use crate::agents::source::{ContentSource, GenerationRequest};
use crate::agents::{Agent, AgentRole};
use crate::domain::{AgentMessage, ContextHandle, MeshError, MessageKind, Result};

/// Turns a TASK (or a CRITIQUE of an earlier attempt) into a FACT.
pub struct ResearcherAgent {
    id: String,
    source: Arc<dyn ContentSource>,
    next: Vec<String>,
}

impl ResearcherAgent {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self {
            id: "researcher".to_string(),
            source,
            next: vec!["synthesizer".to_string()],
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Recipients of produced FACT messages.
    pub fn with_next(mut self, next: Vec<String>) -> Self {
        self.next = next;
        self
    }
}

#[async_trait]
impl Agent for ResearcherAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> AgentRole {
        AgentRole::Researcher
    }

    async fn handle(&self, message: &AgentMessage, context: &ContextHandle) -> Result<AgentMessage> {
        let context = match message.kind() {
            MessageKind::Task => context.clone(),
            MessageKind::Critique => {
                context.continue_with(ContextHandle::feedback_hints(message))
            }
            other => {
                return Err(MeshError::InvalidMessage(format!(
                    "{} cannot handle {other} messages",
                    self.id
                )))
            }
        };

        let request = GenerationRequest {
            role: self.role(),
            session_id: context.session_id,
            goal: context.goal,
            hints: context.hints,
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

        Ok(AgentMessage::fact(
            self.id.clone(),
            self.next.clone(),
            generated.content,
            generated.evidence,
        ))
    }
}
