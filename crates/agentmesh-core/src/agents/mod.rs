//! Role agents and the registry the router resolves addressees through.
//!
//! An agent consumes one message plus the session context and returns one
//! message. Agents never publish; the router does. Quality failures come back
//! as CRITIQUE messages, only structural problems as `Err`.

pub mod researcher;
pub mod source;
pub mod synthesizer;
pub mod validator;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{AgentMessage, ContextHandle, MeshError, Result};

pub use researcher::ResearcherAgent;
pub use source::{ContentSource, GeneratedContent, GenerationRequest};
pub use synthesizer::SynthesizerAgent;
pub use validator::ValidatorAgent;

/// The closed set of roles in a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Researcher,
    Synthesizer,
    Critic,
}

impl AgentRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentRole::Researcher => "researcher",
            AgentRole::Synthesizer => "synthesizer",
            AgentRole::Critic => "critic",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "researcher" => Ok(AgentRole::Researcher),
            "synthesizer" => Ok(AgentRole::Synthesizer),
            "critic" => Ok(AgentRole::Critic),
            other => Err(MeshError::UnknownAgent(other.to_string())),
        }
    }
}

#[async_trait]
pub trait Agent: Send + Sync {
    /// Identifier messages are addressed to.
    fn id(&self) -> &str;

    fn role(&self) -> AgentRole;

    async fn handle(&self, message: &AgentMessage, context: &ContextHandle) -> Result<AgentMessage>;
}

/// Agents keyed by id, also reachable by role name.
///
/// `resolve("critic")` finds the agent registered with id `critic` if there
/// is one, otherwise the first agent registered with the critic role.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    by_id: HashMap<String, Arc<dyn Agent>>,
    order: Vec<String>,
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.order)
            .finish()
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `agent`, replacing any agent with the same id.
    pub fn register(&mut self, agent: Arc<dyn Agent>) -> &mut Self {
        let id = agent.id().to_string();
        if self.by_id.insert(id.clone(), agent).is_none() {
            self.order.push(id);
        }
        self
    }

    pub fn with(mut self, agent: Arc<dyn Agent>) -> Self {
        self.register(agent);
        self
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Agent>> {
        if let Some(agent) = self.by_id.get(name) {
            return Some(Arc::clone(agent));
        }
        let role = name.parse::<AgentRole>().ok()?;
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .find(|agent| agent.role() == role)
            .map(Arc::clone)
    }

    /// Agents addressed by `to`, each at most once, in address order, plus
    /// the addresses that matched nothing.
    pub fn resolve_all(&self, to: &[String]) -> (Vec<Arc<dyn Agent>>, Vec<String>) {
        let mut agents: Vec<Arc<dyn Agent>> = Vec::new();
        let mut unknown = Vec::new();
        for name in to {
            match self.resolve(name) {
                Some(agent) => {
                    if !agents.iter().any(|a| a.id() == agent.id()) {
                        agents.push(agent);
                    }
                }
                None => unknown.push(name.clone()),
            }
        }
        (agents, unknown)
    }
}
