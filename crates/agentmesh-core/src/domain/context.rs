//! Per-session task context handed to every agent hop.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::message::{AgentMessage, MessageKind};

/// Resource limits for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    pub tokens: u32,
    pub latency_ms: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            tokens: 4_000,
            latency_ms: 30_000,
        }
    }
}

/// Task parameters for one mesh invocation.
///
/// Created by the caller. `hints` may grow across continuation calls as
/// critique feedback accumulates; everything else is fixed for the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextHandle {
    pub user_id: String,
    pub session_id: String,
    pub goal: String,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub cluster_ids: Vec<String>,
    #[serde(default)]
    pub limits: Limits,
}

impl ContextHandle {
    /// Start a new session with a random session id.
    pub fn new(user_id: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: Uuid::new_v4().to_string(),
            goal: goal.into(),
            hints: Vec::new(),
            cluster_ids: Vec::new(),
            limits: Limits::default(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints = hints.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_clusters(mut self, cluster_ids: Vec<String>) -> Self {
        self.cluster_ids = cluster_ids;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Same session, with `hints` appended. Blank and already-present hints
    /// are skipped; existing order is preserved.
    pub fn continue_with<I, S>(&self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        for hint in hints {
            let hint: String = hint.into();
            let trimmed = hint.trim();
            if trimmed.is_empty() || next.hints.iter().any(|h| h == trimmed) {
                continue;
            }
            next.hints.push(trimmed.to_string());
        }
        next
    }

    /// Actionable clauses carried by a CRITIQUE, suitable for [`continue_with`].
    ///
    /// Feedback lines have the form `- <problem>: <action>`; the action part is
    /// returned. Non-critique messages yield nothing.
    ///
    /// [`continue_with`]: ContextHandle::continue_with
    pub fn feedback_hints(critique: &AgentMessage) -> Vec<String> {
        if critique.kind() != MessageKind::Critique {
            return Vec::new();
        }
        critique
            .content()
            .lines()
            .filter_map(|line| line.trim().strip_prefix("- "))
            .map(|clause| match clause.split_once(": ") {
                Some((_, action)) => action.trim().to_string(),
                None => clause.trim().to_string(),
            })
            .filter(|s| !s.is_empty())
            .collect()
    }
}
