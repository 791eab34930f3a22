//! Routing policy for one mesh invocation.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error::{MeshError, Result};

/// How a message trace is judged by the consensus validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusStrategy {
    /// A FINAL message backed by a majority of contributing messages.
    Majority,
    /// The last critic verdict decides.
    Critic,
}

impl std::fmt::Display for ConsensusStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConsensusStrategy::Majority => "majority",
            ConsensusStrategy::Critic => "critic",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ConsensusStrategy {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "majority" => Ok(ConsensusStrategy::Majority),
            "critic" => Ok(ConsensusStrategy::Critic),
            other => Err(MeshError::InvalidConfig(format!(
                "unknown consensus strategy: {other}"
            ))),
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Hop and wall-clock budget for an exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePolicy {
    pub strategy: ConsensusStrategy,
    /// Maximum number of agent invocations across the whole run.
    pub max_hops: usize,
    /// Budget for the whole hop sequence, not per hop.
    #[serde(rename = "timeoutMs", with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            strategy: ConsensusStrategy::Critic,
            max_hops: 8,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Routing policy for one invocation: origin, candidate recipients, budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshRoute {
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub policy: RoutePolicy,
}

impl MeshRoute {
    pub fn new(from: impl Into<String>, to: Vec<String>) -> Self {
        Self {
            from: from.into(),
            to,
            policy: RoutePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RoutePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.policy.max_hops = max_hops;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.policy.timeout = timeout;
        self
    }

    pub fn with_strategy(mut self, strategy: ConsensusStrategy) -> Self {
        self.policy.strategy = strategy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(
            "Majority".parse::<ConsensusStrategy>().unwrap(),
            ConsensusStrategy::Majority
        );
        assert!(matches!(
            "quorum".parse::<ConsensusStrategy>(),
            Err(MeshError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_route_policy_serde_uses_millis() {
        let route = MeshRoute::new("user", vec!["researcher".into()])
            .with_timeout(Duration::from_millis(1500))
            .with_max_hops(3);
        let value = serde_json::to_value(&route).unwrap();
        assert_eq!(value["policy"]["timeoutMs"], 1500);
        assert_eq!(value["policy"]["maxHops"], 3);

        let back: MeshRoute = serde_json::from_value(value).unwrap();
        assert_eq!(back, route);
    }
}
