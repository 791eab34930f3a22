//! Structured observability hooks for mesh lifecycle events.
//!
//! This module provides:
//! - Session-scoped tracing spans via the `MeshSpan` RAII guard
//! - Emission functions for key events: mesh start/hop/finish, consensus,
//!   calibration, trust propagation, handler failure
//!
//! Events are emitted at `info!` level; handler failures at `warn!`.
//! Filtering follows `AGENTMESH_LOG` / `RUST_LOG` (see [`crate::telemetry`]).

use tracing::{info, warn};

/// RAII guard that enters a session-scoped span for synchronous work.
///
/// ```ignore
/// let _span = MeshSpan::enter("sess-12345");
/// // tracing calls in this scope carry session_id = "sess-12345"
/// ```
pub struct MeshSpan {
    _span: tracing::span::EnteredSpan,
}

impl MeshSpan {
    pub fn enter(session_id: &str) -> Self {
        Self {
            _span: mesh_span(session_id).entered(),
        }
    }
}

/// The session span itself, for instrumenting futures. An entered span
/// must not be held across `.await`.
pub fn mesh_span(session_id: &str) -> tracing::Span {
    tracing::info_span!("agentmesh.session", session_id = %session_id)
}

/// Emit event: a mesh run started from `entry_from`.
pub fn emit_mesh_started(session_id: &str, entry_from: &str, max_hops: usize) {
    info!(
        event = "mesh.started",
        session_id = %session_id,
        from = %entry_from,
        max_hops = max_hops,
    );
}

/// Emit event: one agent invocation produced a message.
pub fn emit_hop(session_id: &str, hop: usize, agent_id: &str, produced: &str) {
    info!(
        event = "mesh.hop",
        session_id = %session_id,
        hop = hop,
        agent = %agent_id,
        produced = %produced,
    );
}

/// Emit event: a mesh run ended.
pub fn emit_mesh_finished(session_id: &str, termination: &str, hops: usize, duration_ms: u64) {
    info!(
        event = "mesh.finished",
        session_id = %session_id,
        termination = %termination,
        hops = hops,
        duration_ms = duration_ms,
    );
}

pub fn emit_consensus_evaluated(
    session_id: &str,
    strategy: &str,
    accepted: bool,
    disagreements: usize,
) {
    info!(
        event = "consensus.evaluated",
        session_id = %session_id,
        strategy = %strategy,
        accepted = accepted,
        disagreements = disagreements,
    );
}

pub fn emit_model_calibrated(version: &str, acc: f64, samples: usize, epochs: usize) {
    info!(
        event = "model.calibrated",
        version = %version,
        acc = acc,
        samples = samples,
        epochs = epochs,
    );
}

pub fn emit_trust_propagated(updated: usize, failed: usize, min: f64, max: f64, mean: f64) {
    info!(
        event = "trust.propagated",
        updated = updated,
        failed = failed,
        min = min,
        max = max,
        mean = mean,
    );
}

/// Emit event: a bus handler failed or panicked (warning level).
pub fn emit_handler_failed(agent_id: &str, kind: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "bus.handler_failed",
        agent = %agent_id,
        kind = %kind,
        error = %error,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_span_create() {
        let _span = MeshSpan::enter("test-session");
        emit_hop("test-session", 1, "researcher", "FACT");
    }
}
