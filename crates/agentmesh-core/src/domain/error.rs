//! Domain-level error taxonomy for AgentMesh.
//!
//! Only structural failures live here. Low scores, critic rejections,
//! rejected consensus, hop limits and timeouts are ordinary return values.

use agentmesh_state::StorageError;

/// AgentMesh domain errors.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("insufficient labeled data: required {required}, available {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no agent registered for {0}")]
    UnknownAgent(String),

    #[error("agent {agent} failed: {reason}")]
    Agent { agent: String, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for AgentMesh domain operations.
pub type Result<T> = std::result::Result<T, MeshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_reports_counts() {
        let err = MeshError::InsufficientData {
            required: 50,
            available: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("50"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn test_storage_error_converts() {
        let err: MeshError = StorageError::NoPreviousVersion.into();
        assert!(err.to_string().contains("storage error"));
    }

    #[test]
    fn test_agent_error_display() {
        let err = MeshError::Agent {
            agent: "researcher".to_string(),
            reason: "upstream 503".to_string(),
        };
        assert!(err.to_string().contains("researcher"));
        assert!(err.to_string().contains("upstream 503"));
    }
}
