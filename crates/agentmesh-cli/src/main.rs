//! AgentMesh CLI
//!
//! The `agentmesh` command drives the engine's batch entry points over JSON
//! files and prints JSON to stdout.
//!
//! ## Commands
//!
//! - `score`: Score a candidate answer and explain the verdict
//! - `consensus`: Judge a message trace under a consensus strategy
//! - `trust`: Propagate trust over a peer graph snapshot
//! - `calibrate`: Refine the scoring model from labeled samples
//! - `suggest`: Pick the most uncertain samples for labeling and flag those
//!   inside the configured uncertainty band

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use agentmesh_core::{
    get_uncertainty_score, recalibrate, suggest_samples_for_labeling, AgentMessage, Citation,
    ConsensusResult, ConsensusStrategy, ConsensusValidator, ContextHandle, EngineConfig,
    LabeledSample, LinkRecord, ModelDoc, ModelRegistry, PeerRecord, ScoreInput, ScoredSample,
    TrustPropagator, TrustReport, ValidationScore, METRICS,
};
use agentmesh_state::fakes::{MemoryModelRegistry, MemorySampleStore, MemoryTrustGraph};

#[derive(Parser)]
#[command(name = "agentmesh")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-agent consensus and trust propagation", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Engine configuration file (TOML)
    #[arg(long, global = true, env = "AGENTMESH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a candidate answer
    Score {
        /// Answer file: {"text", "query", "citations", "hints"}
        answer: PathBuf,
    },

    /// Judge a message trace
    Consensus {
        /// Trace file: JSON array of agent messages
        trace: PathBuf,

        /// Consensus strategy (majority or critic)
        #[arg(short, long, default_value = "critic")]
        strategy: ConsensusStrategy,

        /// Session id used to tag log events
        #[arg(long)]
        session: Option<String>,
    },

    /// Propagate trust over a peer graph
    Trust {
        /// Graph file: {"peers": [...], "links": [...]}
        graph: PathBuf,
    },

    /// Calibrate the scoring model from labeled samples
    Calibrate {
        /// Labeled samples file: JSON array
        samples: PathBuf,

        /// Model document to start from (defaults when omitted)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Notes recorded on the new model version
        #[arg(short, long, default_value = "cli calibration")]
        notes: String,
    },

    /// Suggest samples for labeling, flagged against the `[active_learning]` band
    Suggest {
        /// Scored samples file: JSON array of {"id", "score", "confidence"}
        samples: PathBuf,

        /// Maximum number of suggestions
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Decision threshold (defaults to the configured pass threshold)
        #[arg(short, long)]
        threshold: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    agentmesh_core::init_tracing(cli.json, level);

    let config = load_config(cli.config.as_deref())?;

    let output = match cli.command {
        Commands::Score { answer } => to_json(&cmd_score(&config, &answer)?),
        Commands::Consensus {
            trace,
            strategy,
            session,
        } => to_json(&cmd_consensus(&config, &trace, strategy, session)?),
        Commands::Trust { graph } => to_json(&cmd_trust(&config, &graph).await?),
        Commands::Calibrate {
            samples,
            model,
            notes,
        } => to_json(&cmd_calibrate(&config, &samples, model.as_deref(), &notes).await?),
        Commands::Suggest {
            samples,
            limit,
            threshold,
        } => to_json(&cmd_suggest(&config, &samples, limit, threshold)?),
    }?;

    println!("{output}");
    METRICS.flush();
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let config = EngineConfig::from_path(path)
                .with_context(|| format!("Failed to load config: {:?}", path))?;
            info!(path = ?path, "loaded engine config");
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output")
}

// ---------------------------------------------------------------------------
// score
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AnswerFile {
    text: String,
    #[serde(default)]
    query: String,
    #[serde(default)]
    citations: Vec<Citation>,
    #[serde(default)]
    hints: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreReport {
    score: ValidationScore,
    passed: bool,
    feedback: String,
}

fn cmd_score(config: &EngineConfig, path: &Path) -> Result<ScoreReport> {
    let answer: AnswerFile = read_json_file(path)?;
    let model = config.scoring;
    let input =
        ScoreInput::new(&answer.text, &answer.query, &answer.citations).with_hints(&answer.hints);
    let score = model.score(&input);
    Ok(ScoreReport {
        passed: model.is_passing(&score),
        feedback: model.feedback(&score),
        score,
    })
}

// ---------------------------------------------------------------------------
// consensus
// ---------------------------------------------------------------------------

fn cmd_consensus(
    config: &EngineConfig,
    path: &Path,
    strategy: ConsensusStrategy,
    session: Option<String>,
) -> Result<ConsensusResult> {
    let raw: Vec<serde_json::Value> = read_json_file(path)?;
    let trace = raw
        .iter()
        .enumerate()
        .map(|(i, value)| {
            AgentMessage::from_json(&value.to_string())
                .with_context(|| format!("Invalid message at index {i} in {:?}", path))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut context = ContextHandle::new("cli", "consensus check");
    if let Some(session) = session {
        context = context.with_session(session);
    }
    let validator = ConsensusValidator::new(config.consensus.clone());
    Ok(validator.validate(&trace, strategy, &context))
}

// ---------------------------------------------------------------------------
// trust
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphFile {
    peers: Vec<PeerRecord>,
    #[serde(default)]
    links: Vec<LinkRecord>,
}

async fn cmd_trust(config: &EngineConfig, path: &Path) -> Result<TrustReport> {
    let graph: GraphFile = read_json_file(path)?;
    let store = MemoryTrustGraph::new(graph.peers, graph.links);
    TrustPropagator::new(config.trust.clone())
        .run(&store)
        .await
        .context("Trust propagation failed")
}

// ---------------------------------------------------------------------------
// calibrate
// ---------------------------------------------------------------------------

async fn cmd_calibrate(
    config: &EngineConfig,
    samples: &Path,
    model: Option<&Path>,
    notes: &str,
) -> Result<ModelDoc> {
    let labeled: Vec<LabeledSample> = read_json_file(samples)?;
    let registry = MemoryModelRegistry::new();
    if let Some(model) = model {
        let doc: ModelDoc = read_json_file(model)?;
        doc.verify()
            .with_context(|| format!("Model document failed verification: {:?}", model))?;
        registry.publish(doc).await?;
    }
    let store = MemorySampleStore::with_samples(labeled);
    recalibrate(&registry, &store, &config.calibration, notes)
        .await
        .context("Calibration failed")
}

// ---------------------------------------------------------------------------
// suggest
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Suggestion {
    #[serde(flatten)]
    sample: ScoredSample,
    uncertainty: f64,
    /// Inside the configured uncertainty band or below its confidence floor.
    in_band: bool,
}

fn cmd_suggest(
    config: &EngineConfig,
    path: &Path,
    limit: usize,
    threshold: Option<f64>,
) -> Result<Vec<Suggestion>> {
    let samples: Vec<ScoredSample> = read_json_file(path)?;
    let threshold = threshold.unwrap_or(config.scoring.thresholds.pass);
    let band = config.active_learning;
    Ok(suggest_samples_for_labeling(&samples, limit, threshold)
        .into_iter()
        .map(|sample| Suggestion {
            uncertainty: get_uncertainty_score(sample.score, threshold),
            in_band: band.is_uncertain(sample.score, sample.confidence),
            sample,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmesh_core::{LinkHealth, Subscores, UncertaintyBand};
    use serde_json::json;

    fn write_json(dir: &tempfile::TempDir, name: &str, value: serde_json::Value) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "agentmesh",
            "--json",
            "consensus",
            "trace.json",
            "--strategy",
            "majority",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Consensus { strategy, .. } => {
                assert_eq!(strategy, ConsensusStrategy::Majority)
            }
            _ => panic!("expected consensus"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_strategy() {
        assert!(Cli::try_parse_from(["agentmesh", "consensus", "t.json", "-s", "vote"]).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.toml");
        std::fs::write(&path, "[trust]\ndamping = 0.9\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.trust.damping, 0.9);

        std::fs::write(&path, "[trust]\ndamping = 2.0\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
        assert_eq!(load_config(None).unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_cmd_score_reports_feedback() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(
            &dir,
            "answer.json",
            json!({ "text": "Rust has ownership.", "query": "rust ownership" }),
        );
        let report = cmd_score(&EngineConfig::default(), &path).unwrap();
        assert!(!report.passed);
        assert_eq!(report.score.subscores.citation, 0.0);
        assert!(report.feedback.contains("insufficient citations"));
    }

    #[test]
    fn test_cmd_consensus_critic_accepts_final() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(
            &dir,
            "trace.json",
            json!([
                { "type": "FACT", "content": "f", "from": "researcher", "to": ["synthesizer"] },
                { "type": "FINAL", "content": "answer", "from": "validator" }
            ]),
        );
        let result = cmd_consensus(
            &EngineConfig::default(),
            &path,
            ConsensusStrategy::Critic,
            Some("s-1".into()),
        )
        .unwrap();
        assert!(result.accepted);
        assert_eq!(result.final_message.unwrap().content(), "answer");
    }

    #[test]
    fn test_cmd_consensus_reports_bad_message_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(
            &dir,
            "trace.json",
            json!([
                { "type": "FACT", "content": "f", "from": "researcher" },
                { "type": "VOTE", "content": "?", "from": "x" }
            ]),
        );
        let err = cmd_consensus(
            &EngineConfig::default(),
            &path,
            ConsensusStrategy::Majority,
            None,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("index 1"));
    }

    #[tokio::test]
    async fn test_cmd_trust_triangle() {
        let dir = tempfile::tempdir().unwrap();
        let peers: Vec<PeerRecord> = ["a", "b", "c"]
            .iter()
            .map(|id| PeerRecord {
                id: id.to_string(),
                trust: 0.0,
            })
            .collect();
        let links = vec![
            LinkRecord::new("a", "b", LinkHealth::Up),
            LinkRecord::new("b", "c", LinkHealth::Up),
            LinkRecord::new("c", "a", LinkHealth::Up),
        ];
        let path = write_json(
            &dir,
            "graph.json",
            json!({ "peers": peers, "links": links }),
        );
        let report = cmd_trust(&EngineConfig::default(), &path).await.unwrap();
        assert_eq!(report.updated, 3);
        assert!(report.trust.iter().all(|(_, t)| (t - 0.3333).abs() < 1e-9));
    }

    #[tokio::test]
    async fn test_cmd_calibrate_too_few_samples() {
        let dir = tempfile::tempdir().unwrap();
        let samples: Vec<LabeledSample> = (0..3)
            .map(|i| LabeledSample {
                id: format!("s{i}"),
                subscores: Subscores::new(0.9, 0.9, 0.9, 0.9),
                label: true,
                confidence: 1.0,
                session_id: None,
            })
            .collect();
        let path = write_json(&dir, "samples.json", json!(samples));
        let err = cmd_calibrate(&EngineConfig::default(), &path, None, "n")
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("Calibration failed"));
    }

    #[test]
    fn test_cmd_suggest_orders_by_uncertainty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(
            &dir,
            "scored.json",
            json!([
                { "id": "far", "score": 1.0 },
                { "id": "near", "score": 0.5 },
                { "id": "mid", "score": 0.75 }
            ]),
        );
        let picked = cmd_suggest(&EngineConfig::default(), &path, 2, Some(0.5)).unwrap();
        let ids: Vec<&str> = picked.iter().map(|s| s.sample.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert_eq!(picked[0].uncertainty, 1.0);
    }

    #[test]
    fn test_cmd_suggest_flags_with_configured_band() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(
            &dir,
            "scored.json",
            json!([
                { "id": "edge", "score": 0.5, "confidence": 0.9 },
                { "id": "sure", "score": 0.75, "confidence": 0.9 },
                { "id": "shaky", "score": 1.0, "confidence": 0.75 }
            ]),
        );

        let flags = |config: &EngineConfig| -> Vec<(String, bool)> {
            cmd_suggest(config, &path, 3, Some(0.5))
                .unwrap()
                .into_iter()
                .map(|s| (s.sample.id, s.in_band))
                .collect()
        };

        let defaults = flags(&EngineConfig::default());
        assert_eq!(
            defaults,
            vec![
                ("edge".to_string(), true),
                ("sure".to_string(), false),
                ("shaky".to_string(), false),
            ]
        );

        let mut config = EngineConfig::default();
        config.active_learning = UncertaintyBand {
            low: 0.7,
            high: 0.8,
            min_confidence: 0.8,
        };
        let custom = flags(&config);
        assert_eq!(
            custom,
            vec![
                ("edge".to_string(), false),
                ("sure".to_string(), true),
                ("shaky".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_read_json_file_missing() {
        let err = read_json_file::<Vec<ScoredSample>>(Path::new("/no/such/file.json")).unwrap_err();
        assert!(format!("{err}").contains("Failed to read JSON file"));
    }
}
