//! In-process publish/subscribe with an append-only message log.
//!
//! `publish` is serialised: subscriber callbacks of two publishes never
//! interleave, and the log grows in publish order. The subscriber list is
//! snapshotted before delivery, so handlers may (un)subscribe freely while a
//! message is in flight without affecting that delivery.
//!
//! A handler may publish on the same bus. The nested message is logged at
//! once and delivered after the current delivery loop finishes, so callbacks
//! stay serialised. Other threads wait until the dispatching thread is done.

use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, RwLock, Weak};
use std::thread::{self, ThreadId};

use tracing::debug;

use crate::domain::{AgentMessage, MessageKind};
use crate::metrics::METRICS;
use crate::obs;

/// Callback invoked for each message addressed to the subscribed id.
pub type Handler = Arc<dyn Fn(&AgentMessage) -> anyhow::Result<()> + Send + Sync>;

type SubscriptionId = u64;

#[derive(Default)]
struct BusState {
    subscribers: HashMap<String, Vec<(SubscriptionId, Handler)>>,
    log: Vec<AgentMessage>,
    next_id: SubscriptionId,
    /// Thread currently running handlers, if any.
    dispatching: Option<ThreadId>,
    /// Messages published from inside a handler, awaiting delivery.
    pending: VecDeque<AgentMessage>,
}

#[derive(Default)]
struct BusShared {
    state: Mutex<BusState>,
    idle: Condvar,
}

impl BusShared {
    // A handler panic is caught before it can poison anything, so a poisoned
    // lock only means a panic inside the bus itself; the state is still a
    // valid list of subscribers and messages.
    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn deliveries(&self, state: &BusState, message: &AgentMessage) -> Vec<(String, Handler)> {
        message
            .to
            .iter()
            .flat_map(|id| {
                state
                    .subscribers
                    .get(id)
                    .into_iter()
                    .flatten()
                    .map(move |(_, h)| (id.clone(), Arc::clone(h)))
            })
            .collect()
    }
}

/// Releases the dispatch slot even if delivery unwinds.
struct DispatchGuard<'a> {
    shared: &'a BusShared,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.shared.state();
        state.dispatching = None;
        state.pending.clear();
        drop(state);
        self.shared.idle.notify_all();
    }
}

/// Cloneable handle to a message bus. Clones share subscribers and log.
#[derive(Clone, Default)]
pub struct MessageBus {
    shared: Arc<BusShared>,
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state();
        f.debug_struct("MessageBus")
            .field("subscribed_ids", &state.subscribers.len())
            .field("log_len", &state.log.len())
            .finish()
    }
}

/// Returned by [`MessageBus::subscribe`]; removes exactly one handler.
///
/// Dropping the value leaves the handler registered.
#[derive(Debug)]
pub struct Subscription {
    bus: Weak<BusShared>,
    agent_id: String,
    id: SubscriptionId,
}

impl Subscription {
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Remove the handler. Returns `false` if the bus is gone or was reset.
    pub fn unsubscribe(self) -> bool {
        let Some(shared) = self.bus.upgrade() else {
            return false;
        };
        let mut state = shared.state();
        let Some(handlers) = state.subscribers.get_mut(&self.agent_id) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(id, _)| *id != self.id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            state.subscribers.remove(&self.agent_id);
        }
        removed
    }
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `agent_id`. Handlers for one id run in
    /// registration order.
    pub fn subscribe<F>(&self, agent_id: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&AgentMessage) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let agent_id = agent_id.into();
        let handler: Handler = Arc::new(handler);
        let mut state = self.shared.state();
        let id = state.next_id;
        state.next_id += 1;
        state
            .subscribers
            .entry(agent_id.clone())
            .or_default()
            .push((id, handler));
        Subscription {
            bus: Arc::downgrade(&self.shared),
            agent_id,
            id,
        }
    }

    /// Log `message` and deliver it to every handler subscribed under each
    /// id in `message.to`. Returns the number of handler invocations.
    ///
    /// Never fails: a handler that errors or panics is logged and counted,
    /// and delivery continues with the next handler. Called from inside a
    /// handler, the message is queued behind the current delivery and `0`
    /// is returned.
    pub fn publish(&self, message: &AgentMessage) -> usize {
        let me = thread::current().id();
        let mut state = self.shared.state();
        if state.dispatching == Some(me) {
            state.log.push(message.clone());
            state.pending.push_back(message.clone());
            drop(state);
            METRICS.inc_messages_published();
            debug!(
                event = "bus.queued",
                kind = %message.kind(),
                from = %message.from,
                "published from inside a handler; delivery deferred"
            );
            return 0;
        }

        let mut state = self
            .shared
            .idle
            .wait_while(state, |s| s.dispatching.is_some())
            .unwrap_or_else(|e| e.into_inner());
        state.dispatching = Some(me);
        state.log.push(message.clone());
        let deliveries = self.shared.deliveries(&state, message);
        drop(state);
        let _guard = DispatchGuard {
            shared: &self.shared,
        };
        METRICS.inc_messages_published();

        let delivered = deliveries.len();
        self.deliver(message, deliveries);

        loop {
            let mut state = self.shared.state();
            let Some(queued) = state.pending.pop_front() else {
                break;
            };
            let deliveries = self.shared.deliveries(&state, &queued);
            drop(state);
            self.deliver(&queued, deliveries);
        }
        delivered
    }

    fn deliver(&self, message: &AgentMessage, deliveries: Vec<(String, Handler)>) {
        let kind = message.kind().to_string();
        for (agent_id, handler) in &deliveries {
            match catch_unwind(AssertUnwindSafe(|| handler(message))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    METRICS.inc_handler_failures();
                    obs::emit_handler_failed(agent_id, &kind, &e);
                }
                Err(panic) => {
                    METRICS.inc_handler_failures();
                    let reason = panic_message(panic.as_ref());
                    obs::emit_handler_failed(agent_id, &kind, &reason);
                }
            }
        }

        debug!(
            event = "bus.published",
            kind = %kind,
            from = %message.from,
            recipients = message.to.len(),
            delivered = deliveries.len(),
        );
    }

    /// Snapshot of every message published since the last clear.
    pub fn get_log(&self) -> Vec<AgentMessage> {
        self.shared.state().log.clone()
    }

    pub fn messages_by_type(&self, kind: MessageKind) -> Vec<AgentMessage> {
        self.shared
            .state()
            .log
            .iter()
            .filter(|m| m.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn messages_from(&self, agent_id: &str) -> Vec<AgentMessage> {
        self.shared
            .state()
            .log
            .iter()
            .filter(|m| m.from == agent_id)
            .cloned()
            .collect()
    }

    pub fn log_len(&self) -> usize {
        self.shared.state().log.len()
    }

    /// Empty the log; subscriptions are kept.
    pub fn clear_log(&self) {
        self.shared.state().log.clear();
    }

    pub fn subscriber_count(&self, agent_id: &str) -> usize {
        self.shared
            .state()
            .subscribers
            .get(agent_id)
            .map_or(0, Vec::len)
    }

    /// True when both handles refer to the same underlying bus.
    pub fn same_bus(&self, other: &MessageBus) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// The process-wide bus.
    pub fn global() -> MessageBus {
        global_slot()
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the process-wide bus with a fresh one and return it.
    ///
    /// Handles obtained earlier keep pointing at the old bus; their
    /// subscriptions and log are not carried over.
    pub fn reset_global() -> MessageBus {
        let fresh = MessageBus::new();
        *global_slot().write().unwrap_or_else(|e| e.into_inner()) = fresh.clone();
        fresh
    }
}

fn global_slot() -> &'static RwLock<MessageBus> {
    static GLOBAL: OnceLock<RwLock<MessageBus>> = OnceLock::new();
    GLOBAL.get_or_init(|| RwLock::new(MessageBus::new()))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}
