//! Global atomic counters for AgentMesh observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a CLI command).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters — no allocations, no locking.
pub struct Metrics {
    messages_published: AtomicU64,
    handler_failures: AtomicU64,
    mesh_runs: AtomicU64,
    hops: AtomicU64,
    consensus_accepted: AtomicU64,
    consensus_rejected: AtomicU64,
    trust_passes: AtomicU64,
    calibrations: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            messages_published: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
            mesh_runs: AtomicU64::new(0),
            hops: AtomicU64::new(0),
            consensus_accepted: AtomicU64::new(0),
            consensus_rejected: AtomicU64::new(0),
            trust_passes: AtomicU64::new(0),
            calibrations: AtomicU64::new(0),
        }
    }

    pub fn inc_messages_published(&self) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "messages_published", "counter incremented");
    }

    pub fn inc_handler_failures(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "handler_failures", "counter incremented");
    }

    pub fn inc_mesh_runs(&self) {
        self.mesh_runs.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "mesh_runs", "counter incremented");
    }

    pub fn inc_hops(&self) {
        self.hops.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "hops", "counter incremented");
    }

    /// Count one consensus decision.
    pub fn record_consensus(&self, accepted: bool) {
        if accepted {
            self.consensus_accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.consensus_rejected.fetch_add(1, Ordering::Relaxed);
        }
        tracing::trace!(metric = "consensus", accepted, "counter incremented");
    }

    pub fn inc_trust_passes(&self) {
        self.trust_passes.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "trust_passes", "counter incremented");
    }

    pub fn inc_calibrations(&self) {
        self.calibrations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "calibrations", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            messages_published = self.messages_published(),
            handler_failures = self.handler_failures(),
            mesh_runs = self.mesh_runs(),
            hops = self.hops(),
            consensus_accepted = self.consensus_accepted(),
            consensus_rejected = self.consensus_rejected(),
            trust_passes = self.trust_passes(),
            calibrations = self.calibrations(),
        );
    }

    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    pub fn handler_failures(&self) -> u64 {
        self.handler_failures.load(Ordering::Relaxed)
    }

    pub fn mesh_runs(&self) -> u64 {
        self.mesh_runs.load(Ordering::Relaxed)
    }

    pub fn hops(&self) -> u64 {
        self.hops.load(Ordering::Relaxed)
    }

    pub fn consensus_accepted(&self) -> u64 {
        self.consensus_accepted.load(Ordering::Relaxed)
    }

    pub fn consensus_rejected(&self) -> u64 {
        self.consensus_rejected.load(Ordering::Relaxed)
    }

    pub fn trust_passes(&self) -> u64 {
        self.trust_passes.load(Ordering::Relaxed)
    }

    pub fn calibrations(&self) -> u64 {
        self.calibrations.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.messages_published,
            &self.handler_failures,
            &self.mesh_runs,
            &self.hops,
            &self.consensus_accepted,
            &self.consensus_rejected,
            &self.trust_passes,
            &self.calibrations,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
