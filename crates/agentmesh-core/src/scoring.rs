//! Multi-factor validation scoring.
//!
//! Scores a candidate answer along four dimensions and combines them with the
//! weights of a [`ScoringModel`]:
//!
//! | subscore    | measures                                                    |
//! |-------------|-------------------------------------------------------------|
//! | `citation`  | how many citations back the answer, and how good they are   |
//! | `context`   | overlap between the answer and the session hints            |
//! | `source`    | mean citation quality                                       |
//! | `relevance` | overlap between the answer and the goal                     |
//!
//! Every subscore and the final score stay in `[0, 1]` for any input,
//! including empty strings, empty lists and non-finite citation scores.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use agentmesh_state::{ModelDoc, ModelThresholds, ModelWeights};

use crate::domain::{Citation, Subscores, ValidationScore};

/// Pass threshold used when the caller does not supply one.
pub const DEFAULT_PASS_THRESHOLD: f64 = 0.55;

/// Context subscore when the session carries no usable hints.
pub const NEUTRAL_CONTEXT: f64 = 0.5;

/// Citations of full quality needed to saturate the citation subscore.
const CITATION_SATURATION: f64 = 3.0;

/// Share of a citation's contribution earned by its mere presence.
const CITATION_PRESENCE: f64 = 0.25;

pub const CLAUSE_CITATIONS: &str =
    "insufficient citations: strengthen citations with additional high-quality sources";
pub const CLAUSE_CONTEXT: &str = "poor context alignment: improve alignment with the session hints";
pub const CLAUSE_SOURCE: &str = "low source quality: prefer more authoritative sources";
pub const CLAUSE_RELEVANCE: &str = "weak relevance: address the terms of the goal directly";
const CLAUSE_OVERALL: &str = "overall score below threshold: revise the answer and resubmit";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Everything the scorer looks at for one candidate answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreInput<'a> {
    pub text: &'a str,
    pub query: &'a str,
    pub citations: &'a [Citation],
    pub context_hints: &'a [String],
}

impl<'a> ScoreInput<'a> {
    pub fn new(text: &'a str, query: &'a str, citations: &'a [Citation]) -> Self {
        Self {
            text,
            query,
            citations,
            context_hints: &[],
        }
    }

    pub fn with_hints(mut self, hints: &'a [String]) -> Self {
        self.context_hints = hints;
        self
    }
}

// ---------------------------------------------------------------------------
// Tokenisation and subscores
// ---------------------------------------------------------------------------

fn token_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").ok()).as_ref()
}

/// Lowercased word tokens of `text`, deduplicated.
fn tokens(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    match token_re() {
        Some(re) => re.find_iter(&lower).map(|m| m.as_str().to_string()).collect(),
        None => lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Fraction of `wanted` tokens present in `have`. `None` when `wanted` is empty.
fn overlap(wanted: &HashSet<String>, have: &HashSet<String>) -> Option<f64> {
    if wanted.is_empty() {
        return None;
    }
    let hit = wanted.iter().filter(|t| have.contains(*t)).count();
    Some(hit as f64 / wanted.len() as f64)
}

/// Zero iff there are no citations; non-decreasing in count and in each score.
pub fn citation_subscore(citations: &[Citation]) -> f64 {
    let total: f64 = citations
        .iter()
        .map(|c| CITATION_PRESENCE + (1.0 - CITATION_PRESENCE) * clamp01(c.score))
        .sum();
    clamp01(total / CITATION_SATURATION)
}

pub fn source_subscore(citations: &[Citation]) -> f64 {
    if citations.is_empty() {
        return 0.0;
    }
    let sum: f64 = citations.iter().map(|c| clamp01(c.score)).sum();
    clamp01(sum / citations.len() as f64)
}

fn context_subscore(text_tokens: &HashSet<String>, hints: &[String]) -> f64 {
    let hint_tokens: HashSet<String> = hints.iter().flat_map(|h| tokens(h)).collect();
    overlap(&hint_tokens, text_tokens).map_or(NEUTRAL_CONTEXT, clamp01)
}

fn relevance_subscore(text_tokens: &HashSet<String>, query: &str) -> f64 {
    overlap(&tokens(query), text_tokens).map_or(0.0, clamp01)
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Weights and thresholds in effect for a validation.
///
/// Read-only during a run; recalibration publishes a new `ModelDoc` rather
/// than mutating the model a validator holds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoringModel {
    #[serde(default)]
    pub weights: ModelWeights,
    #[serde(default)]
    pub thresholds: ModelThresholds,
}

impl ScoringModel {
    pub fn new(weights: ModelWeights, thresholds: ModelThresholds) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    pub fn from_doc(doc: &ModelDoc) -> Self {
        Self::new(doc.weights, doc.thresholds)
    }

    pub fn pass_threshold(&self) -> f64 {
        self.thresholds.pass
    }

    pub fn score(&self, input: &ScoreInput<'_>) -> ValidationScore {
        let text_tokens = tokens(input.text);
        let subscores = Subscores::new(
            citation_subscore(input.citations),
            context_subscore(&text_tokens, input.context_hints),
            source_subscore(input.citations),
            relevance_subscore(&text_tokens, input.query),
        );
        self.combine(subscores)
    }

    /// Final score for precomputed subscores.
    pub fn combine(&self, subscores: Subscores) -> ValidationScore {
        ValidationScore {
            final_score: clamp01(self.weights.combine(&subscores)),
            subscores,
        }
    }

    pub fn is_passing(&self, score: &ValidationScore) -> bool {
        is_validation_passing(score, self.thresholds.pass)
    }

    /// Human-readable verdict.
    ///
    /// A failing verdict starts with `Validation failed` and lists one
    /// `- <problem>: <action>` line per subscore below its floor.
    pub fn feedback(&self, score: &ValidationScore) -> String {
        if self.is_passing(score) {
            return format!(
                "Validation passed (score {:.2} >= threshold {:.2})",
                score.final_score, self.thresholds.pass
            );
        }

        let t = &self.thresholds;
        let s = &score.subscores;
        let mut clauses: Vec<&str> = [
            (s.citation < t.citation_floor, CLAUSE_CITATIONS),
            (s.context < t.context_floor, CLAUSE_CONTEXT),
            (s.source < t.source_floor, CLAUSE_SOURCE),
            (s.relevance < t.relevance_floor, CLAUSE_RELEVANCE),
        ]
        .into_iter()
        .filter_map(|(failed, clause)| failed.then_some(clause))
        .collect();
        if clauses.is_empty() {
            clauses.push(CLAUSE_OVERALL);
        }

        let mut text = format!(
            "Validation failed (score {:.2} below threshold {:.2})",
            score.final_score, t.pass
        );
        for clause in clauses {
            text.push_str("\n- ");
            text.push_str(clause);
        }
        text
    }
}

// ---------------------------------------------------------------------------
// Free functions over the default model
// ---------------------------------------------------------------------------

pub fn score_validation(input: &ScoreInput<'_>) -> ValidationScore {
    ScoringModel::default().score(input)
}

/// `score.final >= threshold`.
pub fn is_validation_passing(score: &ValidationScore, threshold: f64) -> bool {
    score.final_score >= threshold
}

pub fn get_validation_feedback(score: &ValidationScore) -> String {
    ScoringModel::default().feedback(score)
}
