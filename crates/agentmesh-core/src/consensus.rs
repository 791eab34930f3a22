//! Consensus validation over a message trace.
//!
//! [`validate_consensus`] and [`has_consensus`] share one decision function,
//! so the boolean check always agrees with the explained result.

use serde::{Deserialize, Serialize};

use crate::domain::{AgentMessage, ConsensusResult, ConsensusStrategy, ContextHandle, MessageKind};
use crate::metrics::METRICS;
use crate::obs::{self, MeshSpan};

fn default_majority_threshold() -> f64 {
    0.5
}

fn default_critic_ids() -> Vec<String> {
    vec!["critic".to_string(), "validator".to_string()]
}

/// Tunables for the consensus strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Majority accepts when support / (support + critiques) is strictly
    /// greater than this.
    #[serde(default = "default_majority_threshold")]
    pub majority_threshold: f64,
    /// Senders whose messages count as critic verdicts.
    #[serde(default = "default_critic_ids")]
    pub critic_ids: Vec<String>,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            majority_threshold: default_majority_threshold(),
            critic_ids: default_critic_ids(),
        }
    }
}

struct Decision {
    accepted: bool,
    final_index: Option<usize>,
    reason: Option<String>,
}

impl Decision {
    fn accept(index: usize) -> Self {
        Self {
            accepted: true,
            final_index: Some(index),
            reason: None,
        }
    }

    fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            final_index: None,
            reason: Some(reason.into()),
        }
    }
}

fn count_kind(messages: &[AgentMessage], kind: MessageKind) -> usize {
    messages.iter().filter(|m| m.kind() == kind).count()
}

/// Judges traces under a [`ConsensusStrategy`].
#[derive(Debug, Clone, Default)]
pub struct ConsensusValidator {
    config: ConsensusConfig,
}

impl ConsensusValidator {
    pub fn new(config: ConsensusConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    fn decide(&self, messages: &[AgentMessage], strategy: ConsensusStrategy) -> Decision {
        if messages.is_empty() {
            return Decision::reject("empty trace: no messages to evaluate");
        }
        match strategy {
            ConsensusStrategy::Majority => self.decide_majority(messages),
            ConsensusStrategy::Critic => self.decide_critic(messages),
        }
    }

    fn decide_majority(&self, messages: &[AgentMessage]) -> Decision {
        let Some(final_index) = messages.iter().rposition(AgentMessage::is_final) else {
            return Decision::reject("no FINAL message in trace");
        };

        let support = messages
            .iter()
            .filter(|m| {
                matches!(
                    m.kind(),
                    MessageKind::Fact | MessageKind::Hypothesis | MessageKind::Final
                )
            })
            .count();
        let dissent = count_kind(messages, MessageKind::Critique);
        let ratio = support as f64 / (support + dissent) as f64;

        if ratio > self.config.majority_threshold {
            Decision::accept(final_index)
        } else {
            Decision::reject(format!(
                "majority not reached: {support} supporting vs {dissent} critique(s), \
                 agreement {ratio:.2} <= {:.2}",
                self.config.majority_threshold
            ))
        }
    }

    fn decide_critic(&self, messages: &[AgentMessage]) -> Decision {
        let is_critic = |m: &AgentMessage| self.config.critic_ids.iter().any(|id| *id == m.from);
        let Some(index) = messages.iter().rposition(is_critic) else {
            return Decision::reject("no critic verdict in trace");
        };

        let verdict = &messages[index];
        match verdict.kind() {
            MessageKind::Final => Decision::accept(index),
            MessageKind::Critique => {
                let summary = verdict.content().lines().next().unwrap_or("").trim();
                if summary.is_empty() {
                    Decision::reject(format!("critic {} rejected the answer", verdict.from))
                } else {
                    Decision::reject(format!(
                        "critic {} rejected the answer: {summary}",
                        verdict.from
                    ))
                }
            }
            other => Decision::reject(format!(
                "critic {} issued no verdict (last critic message is {other})",
                verdict.from
            )),
        }
    }

    /// Explained verdict for `messages`. `context` only tags the log event.
    pub fn validate(
        &self,
        messages: &[AgentMessage],
        strategy: ConsensusStrategy,
        context: &ContextHandle,
    ) -> ConsensusResult {
        let _span = MeshSpan::enter(&context.session_id);
        let decision = self.decide(messages, strategy);
        let disagreements = count_kind(messages, MessageKind::Critique);

        METRICS.record_consensus(decision.accepted);
        obs::emit_consensus_evaluated(
            &context.session_id,
            &strategy.to_string(),
            decision.accepted,
            disagreements,
        );

        ConsensusResult {
            accepted: decision.accepted,
            final_message: decision.final_index.map(|i| messages[i].clone()),
            reason: decision.reason,
            disagreements,
        }
    }

    pub fn has_consensus(&self, messages: &[AgentMessage], strategy: ConsensusStrategy) -> bool {
        self.decide(messages, strategy).accepted
    }
}

/// [`ConsensusValidator::validate`] with the default configuration.
pub fn validate_consensus(
    messages: &[AgentMessage],
    strategy: ConsensusStrategy,
    context: &ContextHandle,
) -> ConsensusResult {
    ConsensusValidator::default().validate(messages, strategy, context)
}

/// [`ConsensusValidator::has_consensus`] with the default configuration.
pub fn has_consensus(messages: &[AgentMessage], strategy: ConsensusStrategy) -> bool {
    ConsensusValidator::default().has_consensus(messages, strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ContextHandle {
        ContextHandle::new("u", "goal")
    }

    #[test]
    fn test_majority_threshold_is_configurable() {
        // 2 supporting vs 1 critique = 0.67
        let trace = vec![
            AgentMessage::fact("researcher", vec![], "f", vec![]),
            AgentMessage::critique("critic", vec![], "no"),
            AgentMessage::final_answer("validator", vec![], "ans", vec![]),
        ];
        let lenient = ConsensusValidator::default();
        assert!(lenient.has_consensus(&trace, ConsensusStrategy::Majority));

        let strict = ConsensusValidator::new(ConsensusConfig {
            majority_threshold: 0.7,
            ..ConsensusConfig::default()
        });
        let result = strict.validate(&trace, ConsensusStrategy::Majority, &ctx());
        assert!(!result.accepted);
        assert_eq!(result.disagreements, 1);
        assert!(result.reason.unwrap().contains("majority not reached"));
    }

    #[test]
    fn test_critic_without_verdict_is_rejected() {
        let trace = vec![AgentMessage::hypothesis(
            "synthesizer",
            vec!["critic".into()],
            "h",
            vec![],
        )];
        let result = validate_consensus(&trace, ConsensusStrategy::Critic, &ctx());
        assert!(!result.accepted);
        assert_eq!(result.reason.as_deref(), Some("no critic verdict in trace"));
    }

    #[test]
    fn test_custom_critic_ids() {
        let trace = vec![AgentMessage::final_answer("reviewer", vec![], "ok", vec![])];
        assert!(!has_consensus(&trace, ConsensusStrategy::Critic));
        let v = ConsensusValidator::new(ConsensusConfig {
            critic_ids: vec!["reviewer".into()],
            ..ConsensusConfig::default()
        });
        assert!(v.has_consensus(&trace, ConsensusStrategy::Critic));
    }
}
