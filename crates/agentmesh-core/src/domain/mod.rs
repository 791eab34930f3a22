//! Domain models for AgentMesh.
//!
//! Canonical definitions for the core entities:
//! - `AgentMessage`: Typed, addressed unit of exchange between agents
//! - `ContextHandle`: Per-session goal, hints and limits
//! - `MeshRoute`: Hop/time budget and consensus strategy for one run
//! - `ValidationScore` / `ConsensusResult`: Per-invocation outcomes

pub mod context;
pub mod error;
pub mod message;
pub mod outcome;
pub mod route;

// Re-export main types and errors
pub use context::{ContextHandle, Limits};
pub use error::{MeshError, Result};
pub use message::{AgentMessage, Citation, MessageBody, MessageKind};
pub use outcome::{ConsensusResult, Subscores, ValidationScore};
pub use route::{ConsensusStrategy, MeshRoute, RoutePolicy};
