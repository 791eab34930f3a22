//! AgentMesh Core Library
//!
//! Multi-agent consensus and trust propagation: role agents exchange typed
//! messages over a bus, a validator scores candidate answers, a consensus
//! check judges the resulting trace, calibration refines the scoring model,
//! and a separate batch job propagates trust across the peer graph.

pub mod agents;
pub mod bus;
pub mod calibration;
pub mod config;
pub mod consensus;
pub mod domain;
pub mod mesh;
pub mod metrics;
pub mod obs;
pub mod scoring;
pub mod telemetry;
pub mod trust;

pub use domain::{
    AgentMessage, Citation, ConsensusResult, ConsensusStrategy, ContextHandle, Limits, MeshError,
    MeshRoute, MessageBody, MessageKind, Result, RoutePolicy, Subscores, ValidationScore,
};

pub use agents::{
    Agent, AgentRegistry, AgentRole, ContentSource, GeneratedContent, GenerationRequest,
    ResearcherAgent, SynthesizerAgent, ValidatorAgent,
};

pub use bus::{MessageBus, Subscription};

pub use scoring::{
    get_validation_feedback, is_validation_passing, score_validation, ScoreInput, ScoringModel,
    DEFAULT_PASS_THRESHOLD,
};

pub use consensus::{has_consensus, validate_consensus, ConsensusConfig, ConsensusValidator};

pub use mesh::{run_mesh, MeshRouter, MeshRun, Termination};

pub use calibration::{
    calibrate_model, get_uncertainty_score, is_uncertain, recalibrate,
    suggest_samples_for_labeling, CalibrationOptions, CalibrationOutcome, ScoredSample,
    UncertaintyBand,
};

pub use trust::{compute_trust, propagate_trust, TrustConfig, TrustPropagator, TrustReport};

pub use config::EngineConfig;

pub use agentmesh_state::{
    LabeledSample, LinkHealth, LinkRecord, ModelDoc, ModelMetrics, ModelRegistry,
    ModelThresholds, ModelWeights, PeerRecord, SampleStore, TrustGraphStore,
};

pub use metrics::METRICS;
pub use obs::{
    emit_consensus_evaluated, emit_handler_failed, emit_hop, emit_mesh_finished,
    emit_mesh_started, emit_model_calibrated, emit_trust_propagated, MeshSpan,
};
pub use telemetry::init_tracing;

/// AgentMesh version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
