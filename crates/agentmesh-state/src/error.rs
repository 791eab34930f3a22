//! Error types for agentmesh-state

use thiserror::Error;

/// Errors produced by storage trait implementations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// No model document exists under the requested version
    #[error("model version not found: {version}")]
    ModelNotFound { version: String },

    /// Model documents are append-only; a version can only be published once
    #[error("model version already exists: {version}")]
    VersionExists { version: String },

    /// Rollback requested but there is nothing to roll back to
    #[error("no previous model version to roll back to")]
    NoPreviousVersion,

    /// Trust write targeted an unknown peer
    #[error("peer not found: {peer_id}")]
    PeerNotFound { peer_id: String },

    /// Stored document no longer matches its recorded digest
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// Backend-specific failure (connection loss, query error, ...)
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(format!("serialization failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::ModelNotFound {
            version: "v1".to_string(),
        };
        assert!(err.to_string().contains("model version not found"));
        assert!(err.to_string().contains("v1"));

        let err = StorageError::DigestMismatch {
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("def456"));
    }
}
