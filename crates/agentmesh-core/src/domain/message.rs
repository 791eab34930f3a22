//! Message vocabulary: `MessageKind`, `Citation`, `MessageBody`, `AgentMessage`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::{MeshError, Result};

/// The five kinds of message exchanged between role agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    Task,
    Fact,
    Hypothesis,
    Critique,
    Final,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MessageKind::Task => "TASK",
            MessageKind::Fact => "FACT",
            MessageKind::Hypothesis => "HYPOTHESIS",
            MessageKind::Critique => "CRITIQUE",
            MessageKind::Final => "FINAL",
        };
        write!(f, "{s}")
    }
}

impl FromStr for MessageKind {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TASK" => Ok(MessageKind::Task),
            "FACT" => Ok(MessageKind::Fact),
            "HYPOTHESIS" => Ok(MessageKind::Hypothesis),
            "CRITIQUE" => Ok(MessageKind::Critique),
            "FINAL" => Ok(MessageKind::Final),
            other => Err(MeshError::InvalidMessage(format!(
                "unknown message type: {other}"
            ))),
        }
    }
}

/// A retrieved source backing a claim. Produced upstream, read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub doc_id: String,
    /// Relevance/quality in [0, 1].
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Citation {
    pub fn new(doc_id: impl Into<String>, score: f64) -> Self {
        Self {
            doc_id: doc_id.into(),
            score,
            snippet: None,
            url: None,
        }
    }
}

/// Kind-specific payload of a message.
///
/// The `serde(tag = "type")` discriminant is the wire `type` field, so an
/// unknown kind fails to parse instead of slipping through as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum MessageBody {
    Task {
        content: String,
    },
    Fact {
        content: String,
        #[serde(default)]
        evidence: Vec<Citation>,
    },
    Hypothesis {
        content: String,
        #[serde(default)]
        evidence: Vec<Citation>,
    },
    Critique {
        content: String,
    },
    Final {
        content: String,
        #[serde(default)]
        evidence: Vec<Citation>,
    },
}

/// A typed, addressed unit of exchange between role agents.
///
/// `to` is an ordered set of recipient ids. An empty `to` is legal: the
/// message is still logged by the bus, it is just delivered to nobody.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(flatten)]
    pub body: MessageBody,
}

fn dedup_recipients(to: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(to.len());
    for id in to {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

impl AgentMessage {
    pub fn new(from: impl Into<String>, to: Vec<String>, body: MessageBody) -> Self {
        Self {
            from: from.into(),
            to: dedup_recipients(to),
            body,
        }
    }

    pub fn task(from: impl Into<String>, to: Vec<String>, content: impl Into<String>) -> Self {
        Self::new(
            from,
            to,
            MessageBody::Task {
                content: content.into(),
            },
        )
    }

    pub fn fact(
        from: impl Into<String>,
        to: Vec<String>,
        content: impl Into<String>,
        evidence: Vec<Citation>,
    ) -> Self {
        Self::new(
            from,
            to,
            MessageBody::Fact {
                content: content.into(),
                evidence,
            },
        )
    }

    pub fn hypothesis(
        from: impl Into<String>,
        to: Vec<String>,
        content: impl Into<String>,
        evidence: Vec<Citation>,
    ) -> Self {
        Self::new(
            from,
            to,
            MessageBody::Hypothesis {
                content: content.into(),
                evidence,
            },
        )
    }

    pub fn critique(from: impl Into<String>, to: Vec<String>, content: impl Into<String>) -> Self {
        Self::new(
            from,
            to,
            MessageBody::Critique {
                content: content.into(),
            },
        )
    }

    pub fn final_answer(
        from: impl Into<String>,
        to: Vec<String>,
        content: impl Into<String>,
        evidence: Vec<Citation>,
    ) -> Self {
        Self::new(
            from,
            to,
            MessageBody::Final {
                content: content.into(),
                evidence,
            },
        )
    }

    /// Parse a wire-format message, rejecting unknown kinds and missing senders.
    pub fn from_json(raw: &str) -> Result<Self> {
        let message: AgentMessage =
            serde_json::from_str(raw).map_err(|e| MeshError::InvalidMessage(e.to_string()))?;
        message.validate()?;
        Ok(AgentMessage {
            to: dedup_recipients(message.to),
            ..message
        })
    }

    /// Structural checks: a sender is required and recipient ids must be non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.from.trim().is_empty() {
            return Err(MeshError::InvalidMessage(
                "message sender must not be empty".to_string(),
            ));
        }
        if self.to.iter().any(|id| id.trim().is_empty()) {
            return Err(MeshError::InvalidMessage(
                "recipient ids must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn kind(&self) -> MessageKind {
        match &self.body {
            MessageBody::Task { .. } => MessageKind::Task,
            MessageBody::Fact { .. } => MessageKind::Fact,
            MessageBody::Hypothesis { .. } => MessageKind::Hypothesis,
            MessageBody::Critique { .. } => MessageKind::Critique,
            MessageBody::Final { .. } => MessageKind::Final,
        }
    }

    pub fn content(&self) -> &str {
        match &self.body {
            MessageBody::Task { content }
            | MessageBody::Fact { content, .. }
            | MessageBody::Hypothesis { content, .. }
            | MessageBody::Critique { content }
            | MessageBody::Final { content, .. } => content,
        }
    }

    /// Supporting citations. Kinds that carry none yield an empty slice.
    pub fn evidence(&self) -> &[Citation] {
        match &self.body {
            MessageBody::Fact { evidence, .. }
            | MessageBody::Hypothesis { evidence, .. }
            | MessageBody::Final { evidence, .. } => evidence.as_slice(),
            MessageBody::Task { .. } | MessageBody::Critique { .. } => &[],
        }
    }

    pub fn is_final(&self) -> bool {
        self.kind() == MessageKind::Final
    }

    pub fn is_addressed_to(&self, agent_id: &str) -> bool {
        self.to.iter().any(|id| id == agent_id)
    }

    /// SHA-256 hex digest of the canonical JSON form.
    pub fn digest(&self) -> Result<String> {
        use sha2::Digest as _;
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(sha2::Sha256::digest(&bytes)))
    }
}
