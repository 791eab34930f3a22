//! Log setup for the `agentmesh` binary and for hosts embedding the engine.
//!
//! Mesh runs, consensus checks, calibrations and trust passes all report
//! through `tracing`; nothing is printed until a subscriber is installed.
//! The first [`init_tracing`] call in a process wins.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "AGENTMESH_LOG";

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the process subscriber. `level` applies only when neither
/// `AGENTMESH_LOG` nor `RUST_LOG` holds a valid filter; `json` switches the
/// output to one JSON object per event, tagged with the mesh span fields.
pub fn init_tracing(json: bool, level: Level) {
    let json_layer = json.then(|| fmt::layer().with_target(false).json());
    let text_layer = (!json).then(|| fmt::layer().with_target(false));

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .ok();
}
