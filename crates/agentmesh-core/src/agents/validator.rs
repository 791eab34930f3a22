use std::sync::Arc;

use async_trait::async_trait;

use crate::agents::{Agent, AgentRole};
use crate::domain::{AgentMessage, ContextHandle, MeshError, MessageKind, Result, ValidationScore};
use crate::scoring::{ScoreInput, ScoringModel};

const EMPTY_ANSWER_FEEDBACK: &str = "Validation failed (empty answer)\n\
     - empty content: provide an answer grounded in the cited sources";

/// The critic: scores a HYPOTHESIS (or FINAL) and either approves it as a
/// FINAL or sends a CRITIQUE back to the researcher.
///
/// An approved FINAL carries the input's content and evidence unchanged and
/// is addressed to nobody.
pub struct ValidatorAgent {
    id: String,
    model: Arc<ScoringModel>,
    critique_to: Vec<String>,
}

impl ValidatorAgent {
    pub fn new(model: Arc<ScoringModel>) -> Self {
        Self {
            id: "validator".to_string(),
            model,
            critique_to: vec!["researcher".to_string()],
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn model(&self) -> &ScoringModel {
        &self.model
    }

    /// Score `message` against the session and decide. Empty content never passes.
    pub fn evaluate(&self, message: &AgentMessage, context: &ContextHandle) -> (ValidationScore, bool) {
        let input = ScoreInput::new(message.content(), &context.goal, message.evidence())
            .with_hints(&context.hints);
        let score = self.model.score(&input);
        let passing = !message.content().trim().is_empty() && self.model.is_passing(&score);
        (score, passing)
    }
}

#[async_trait]
impl Agent for ValidatorAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> AgentRole {
        AgentRole::Critic
    }

    async fn handle(&self, message: &AgentMessage, context: &ContextHandle) -> Result<AgentMessage> {
        if !matches!(message.kind(), MessageKind::Hypothesis | MessageKind::Final) {
            return Err(MeshError::InvalidMessage(format!(
                "{} cannot handle {} messages",
                self.id,
                message.kind()
            )));
        }

        let (score, passing) = self.evaluate(message, context);
        tracing::debug!(
            agent = %self.id,
            score = score.final_score,
            passing,
            "validated candidate"
        );

        if passing {
            return Ok(AgentMessage::final_answer(
                self.id.clone(),
                Vec::new(),
                message.content(),
                message.evidence().to_vec(),
            ));
        }

        let feedback = if message.content().trim().is_empty() {
            EMPTY_ANSWER_FEEDBACK.to_string()
        } else {
            self.model.feedback(&score)
        };
        Ok(AgentMessage::critique(
            self.id.clone(),
            self.critique_to.clone(),
            feedback,
        ))
    }
}
