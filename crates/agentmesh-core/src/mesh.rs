//! Mesh router: drives hops between role agents until a terminal condition.
//!
//! The router is a work-list loop, not recursion. Every iteration takes the
//! oldest unprocessed message, invokes each agent it is addressed to, and
//! publishes and records what they produce. A run ends when
//!
//! - an agent produces a FINAL message,
//! - `max_hops` agent invocations have been made,
//! - the wall-clock budget for the whole run is spent, or
//! - no produced message is addressed to a registered agent.
//!
//! None of these is an error. Only structural failures (invalid entry,
//! agent error) come back as `Err`.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{warn, Instrument};

use crate::agents::AgentRegistry;
use crate::bus::MessageBus;
use crate::domain::{AgentMessage, ContextHandle, MeshRoute, Result};
use crate::metrics::METRICS;
use crate::obs;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Final,
    HopLimit,
    Timeout,
    Exhausted,
}

impl Termination {
    pub fn as_str(self) -> &'static str {
        match self {
            Termination::Final => "final",
            Termination::HopLimit => "hop_limit",
            Termination::Timeout => "timeout",
            Termination::Exhausted => "exhausted",
        }
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one mesh invocation.
///
/// `trace[0]` is the entry message; later entries are in production order.
/// `final_message` is the last message in the trace, FINAL or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshRun {
    pub trace: Vec<AgentMessage>,
    pub final_message: AgentMessage,
    pub termination: Termination,
    /// Agent invocations made.
    pub hops: usize,
}

impl MeshRun {
    pub fn entry(&self) -> Option<&AgentMessage> {
        self.trace.first()
    }

    pub fn reached_final(&self) -> bool {
        self.termination == Termination::Final
    }
}

pub struct MeshRouter {
    agents: AgentRegistry,
    bus: MessageBus,
}

impl MeshRouter {
    /// Router publishing on the process-wide bus.
    pub fn new(agents: AgentRegistry) -> Self {
        Self::with_bus(agents, MessageBus::global())
    }

    pub fn with_bus(agents: AgentRegistry, bus: MessageBus) -> Self {
        Self { agents, bus }
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Run one exchange starting from `entry`.
    ///
    /// An entry with no recipients is addressed to `route.to`. No lock is held
    /// while an agent runs; the bus is only touched to publish.
    pub async fn run(
        &self,
        entry: AgentMessage,
        route: &MeshRoute,
        context: &ContextHandle,
    ) -> Result<MeshRun> {
        entry.validate()?;
        let entry = if entry.to.is_empty() {
            AgentMessage::new(entry.from, route.to.clone(), entry.body)
        } else {
            entry
        };

        self.drive(entry, route, context)
            .instrument(obs::mesh_span(&context.session_id))
            .await
    }

    async fn drive(
        &self,
        entry: AgentMessage,
        route: &MeshRoute,
        context: &ContextHandle,
    ) -> Result<MeshRun> {
        let started = Instant::now();
        // An absurdly large timeout means no deadline.
        let deadline = started.checked_add(route.policy.timeout);
        METRICS.inc_mesh_runs();
        obs::emit_mesh_started(&context.session_id, &route.from, route.policy.max_hops);

        self.bus.publish(&entry);
        let mut trace = vec![entry.clone()];
        let mut last = entry.clone();
        let mut queue = VecDeque::from([entry]);
        let mut hops = 0usize;

        let termination = if last.is_final() {
            Termination::Final
        } else {
            'run: loop {
                let Some(message) = queue.pop_front() else {
                    break 'run Termination::Exhausted;
                };

                let (recipients, unknown) = self.agents.resolve_all(&message.to);
                for id in &unknown {
                    warn!(
                        session_id = %context.session_id,
                        recipient = %id,
                        kind = %message.kind(),
                        "no agent registered for recipient"
                    );
                }

                for agent in recipients {
                    if hops >= route.policy.max_hops {
                        break 'run Termination::HopLimit;
                    }
                    let remaining = deadline.map_or(Duration::MAX, |d| {
                        d.saturating_duration_since(Instant::now())
                    });
                    if remaining.is_zero() {
                        break 'run Termination::Timeout;
                    }

                    hops += 1;
                    METRICS.inc_hops();
                    let produced =
                        match tokio::time::timeout(remaining, agent.handle(&message, context))
                            .await
                        {
                            Ok(produced) => produced?,
                            Err(_) => break 'run Termination::Timeout,
                        };

                    obs::emit_hop(
                        &context.session_id,
                        hops,
                        agent.id(),
                        &produced.kind().to_string(),
                    );
                    self.bus.publish(&produced);
                    trace.push(produced.clone());
                    last = produced.clone();

                    if produced.is_final() {
                        break 'run Termination::Final;
                    }
                    queue.push_back(produced);
                }
            }
        };

        obs::emit_mesh_finished(
            &context.session_id,
            termination.as_str(),
            hops,
            started.elapsed().as_millis() as u64,
        );

        Ok(MeshRun {
            trace,
            final_message: last,
            termination,
            hops,
        })
    }
}

/// Run an exchange over `agents`, publishing on the process-wide bus.
pub async fn run_mesh(
    agents: &AgentRegistry,
    entry: AgentMessage,
    route: &MeshRoute,
    context: &ContextHandle,
) -> Result<MeshRun> {
    MeshRouter::new(agents.clone())
        .run(entry, route, context)
        .await
}
