//! Scoring-model calibration from labeled outcomes.
//!
//! [`calibrate_model`] is pure: it refines weights and the pass threshold
//! against a sample set and reports the resulting metrics. [`recalibrate`]
//! wires it to the storage traits and publishes a new `ModelDoc`; existing
//! versions are never modified.

pub mod active_learning;

use serde::{Deserialize, Serialize};

use agentmesh_state::{
    LabeledSample, ModelDoc, ModelMetrics, ModelRegistry, ModelThresholds, ModelWeights,
    SampleStore,
};

use crate::domain::{MeshError, Result};
use crate::metrics::METRICS;
use crate::obs;
use crate::scoring::ScoringModel;

pub use active_learning::{
    get_uncertainty_score, is_uncertain, suggest_samples_for_labeling, ScoredSample,
    UncertaintyBand,
};

/// Steepness of the logistic surrogate used for the weight gradient.
const LOGISTIC_GAIN: f64 = 10.0;

/// Pass thresholds tried by the grid search, in hundredths.
const THRESHOLD_GRID: std::ops::RangeInclusive<u32> = 30..=80;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationOptions {
    /// Stop early once training accuracy reaches this.
    pub target_acc: f64,
    pub epochs: usize,
    pub min_samples: usize,
    pub learning_rate: f64,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self {
            target_acc: 0.85,
            epochs: 10,
            min_samples: 50,
            learning_rate: 0.1,
        }
    }
}

/// Calibrated parameters, ready to be wrapped in a `ModelDoc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub weights: ModelWeights,
    pub thresholds: ModelThresholds,
    pub metrics: ModelMetrics,
    /// Refinement passes actually run.
    pub epochs_run: usize,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn sample_weight(sample: &LabeledSample) -> f64 {
    if sample.confidence.is_finite() {
        sample.confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Accuracy, precision and recall of `weights` at `threshold`.
pub fn evaluate(weights: &ModelWeights, threshold: f64, samples: &[LabeledSample]) -> ModelMetrics {
    let (mut tp, mut fp, mut tn, mut fneg) = (0usize, 0usize, 0usize, 0usize);
    for sample in samples {
        let predicted = weights.combine(&sample.subscores) >= threshold;
        match (predicted, sample.label) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, false) => tn += 1,
            (false, true) => fneg += 1,
        }
    }

    let n = samples.len();
    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    ModelMetrics {
        acc: ratio(tp + tn, n),
        precision: ratio(tp, tp + fp),
        recall: (tp + fneg > 0).then(|| ratio(tp, tp + fneg)),
        samples: n,
    }
}

/// Threshold on the grid with the best accuracy; ties go to the candidate
/// closest to `previous`.
fn best_threshold(weights: &ModelWeights, samples: &[LabeledSample], previous: f64) -> f64 {
    let mut best = previous;
    let mut best_acc = evaluate(weights, previous, samples).acc;
    for step in THRESHOLD_GRID {
        let candidate = f64::from(step) / 100.0;
        let acc = evaluate(weights, candidate, samples).acc;
        let closer = (candidate - previous).abs() < (best - previous).abs();
        if acc > best_acc || (acc == best_acc && closer) {
            best = candidate;
            best_acc = acc;
        }
    }
    best
}

/// One confidence-weighted logistic-gradient step, renormalised.
fn gradient_step(
    weights: &ModelWeights,
    threshold: f64,
    samples: &[LabeledSample],
    learning_rate: f64,
) -> ModelWeights {
    let mut grad = [0.0f64; 4];
    let mut total_weight = 0.0;
    for sample in samples {
        let w = sample_weight(sample);
        if w == 0.0 {
            continue;
        }
        let predicted = sigmoid(LOGISTIC_GAIN * (weights.combine(&sample.subscores) - threshold));
        let target = if sample.label { 1.0 } else { 0.0 };
        let err = (predicted - target) * w;
        for (g, s) in grad.iter_mut().zip(sample.subscores.as_array()) {
            *g += err * s;
        }
        total_weight += w;
    }
    if total_weight == 0.0 {
        return *weights;
    }

    let current = weights.as_array();
    let mut next = [0.0f64; 4];
    for i in 0..4 {
        next[i] = current[i] - learning_rate * grad[i] / total_weight;
    }
    ModelWeights::from_array(next).normalized()
}

/// Refine `base` against `samples`.
///
/// Each epoch takes one gradient step on the weights and then re-picks the
/// pass threshold. The best parameters seen (by accuracy) are returned;
/// iteration stops early once `target_acc` is reached.
pub fn calibrate_model(
    base: &ScoringModel,
    samples: &[LabeledSample],
    opts: &CalibrationOptions,
) -> Result<CalibrationOutcome> {
    if samples.len() < opts.min_samples {
        return Err(MeshError::InsufficientData {
            required: opts.min_samples,
            available: samples.len(),
        });
    }

    let mut weights = base.weights.normalized();
    let mut threshold = base.thresholds.pass;
    let mut best_weights = weights;
    let mut best_threshold_seen = threshold;
    let mut best_metrics = evaluate(&weights, threshold, samples);
    let mut epochs_run = 0;

    for _ in 0..opts.epochs {
        if best_metrics.acc >= opts.target_acc {
            break;
        }
        epochs_run += 1;
        weights = gradient_step(&weights, threshold, samples, opts.learning_rate);
        threshold = best_threshold(&weights, samples, threshold);

        let metrics = evaluate(&weights, threshold, samples);
        if metrics.acc > best_metrics.acc {
            best_weights = weights;
            best_threshold_seen = threshold;
            best_metrics = metrics;
        }
    }

    tracing::debug!(
        epochs_run,
        acc = best_metrics.acc,
        threshold = best_threshold_seen,
        "calibration finished"
    );

    Ok(CalibrationOutcome {
        weights: best_weights,
        thresholds: ModelThresholds {
            pass: best_threshold_seen,
            ..base.thresholds
        },
        metrics: best_metrics,
        epochs_run,
    })
}

/// Calibrate the active model (or the defaults) against every labeled sample
/// in `samples`, and publish the result as a new version.
///
/// Nothing is published when calibration fails.
pub async fn recalibrate(
    registry: &dyn ModelRegistry,
    samples: &dyn SampleStore,
    opts: &CalibrationOptions,
    notes: &str,
) -> Result<ModelDoc> {
    let base = registry
        .active()
        .await?
        .map(|doc| ScoringModel::from_doc(&doc))
        .unwrap_or_default();
    let labeled = samples.labeled_samples().await?;

    let outcome = calibrate_model(&base, &labeled, opts)?;
    let doc = ModelDoc::new(outcome.weights, outcome.thresholds, outcome.metrics, notes)?;
    registry.publish(doc.clone()).await?;

    METRICS.inc_calibrations();
    obs::emit_model_calibrated(
        &doc.version,
        doc.metrics.acc,
        doc.metrics.samples,
        outcome.epochs_run,
    );
    Ok(doc)
}
