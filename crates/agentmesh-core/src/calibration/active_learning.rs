//! Pick the samples a human should label next.
//!
//! A sample is uncertain when its score sits inside the band around the pass
//! threshold, or when the confidence attached to it is low.

use serde::{Deserialize, Serialize};

/// Score band around the decision boundary plus a confidence floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UncertaintyBand {
    pub low: f64,
    pub high: f64,
    pub min_confidence: f64,
}

impl Default for UncertaintyBand {
    fn default() -> Self {
        Self {
            low: 0.45,
            high: 0.60,
            min_confidence: 0.7,
        }
    }
}

impl UncertaintyBand {
    pub fn contains(&self, score: f64) -> bool {
        score >= self.low && score <= self.high
    }

    pub fn is_uncertain(&self, score: f64, confidence: f64) -> bool {
        self.contains(score) || confidence < self.min_confidence
    }
}

/// A scored, not yet labeled answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSample {
    pub id: String,
    pub score: f64,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

/// [`UncertaintyBand::is_uncertain`] with the default band.
pub fn is_uncertain(score: f64, confidence: f64) -> bool {
    UncertaintyBand::default().is_uncertain(score, confidence)
}

/// `1 - |score - threshold|`, clamped to `[0, 1]`. Closer to the boundary is
/// more uncertain.
pub fn get_uncertainty_score(score: f64, threshold: f64) -> f64 {
    let u = 1.0 - (score - threshold).abs();
    if u.is_nan() {
        0.0
    } else {
        u.clamp(0.0, 1.0)
    }
}

/// The `limit` most uncertain samples, most uncertain first. Ties keep input
/// order.
pub fn suggest_samples_for_labeling(
    samples: &[ScoredSample],
    limit: usize,
    threshold: f64,
) -> Vec<ScoredSample> {
    let mut ranked: Vec<(f64, &ScoredSample)> = samples
        .iter()
        .map(|s| (get_uncertainty_score(s.score, threshold), s))
        .collect();
    // sort_by is stable
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(limit);
    ranked.into_iter().map(|(_, s)| s.clone()).collect()
}
