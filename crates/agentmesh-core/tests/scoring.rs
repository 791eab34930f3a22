use agentmesh_core::{
    get_validation_feedback, is_validation_passing, score_validation, Citation, ModelThresholds,
    ModelWeights, ScoreInput, ScoringModel, Subscores, ValidationScore, DEFAULT_PASS_THRESHOLD,
};

fn cites(scores: &[f64]) -> Vec<Citation> {
    scores
        .iter()
        .enumerate()
        .map(|(i, s)| Citation::new(format!("doc-{i}"), *s))
        .collect()
}

fn in_unit(v: f64) -> bool {
    (0.0..=1.0).contains(&v)
}

#[test]
fn citation_subscore_is_zero_without_citations() {
    let score = score_validation(&ScoreInput::new("x", "q", &[]));
    assert_eq!(score.subscores.citation, 0.0);
    assert_eq!(score.subscores.source, 0.0);
}

#[test]
fn citation_subscore_is_positive_with_any_citation() {
    let c = cites(&[0.0]);
    let score = score_validation(&ScoreInput::new("x", "q", &c));
    assert!(score.subscores.citation > 0.0);
}

#[test]
fn three_good_citations_beat_one() {
    let one = cites(&[0.9]);
    let three = cites(&[0.9, 0.9, 0.9]);
    let a = score_validation(&ScoreInput::new("x", "q", &one)).subscores.citation;
    let b = score_validation(&ScoreInput::new("x", "q", &three)).subscores.citation;
    assert!(a < b, "{a} should be < {b}");
}

#[test]
fn citation_subscore_monotone_in_count_and_quality() {
    let mut previous = 0.0;
    for n in 0..8 {
        let c = cites(&vec![0.6; n]);
        let s = score_validation(&ScoreInput::new("x", "q", &c)).subscores.citation;
        assert!(s >= previous);
        previous = s;
    }

    let mut previous = 0.0;
    for step in 0..=10 {
        let c = cites(&[step as f64 / 10.0, 0.5]);
        let s = score_validation(&ScoreInput::new("x", "q", &c)).subscores.citation;
        assert!(s >= previous);
        previous = s;
    }
}

#[test]
fn relevance_exceeds_half_when_all_query_terms_present() {
    let score = score_validation(&ScoreInput::new(
        "Tides are caused by the Moon's gravity",
        "moon gravity tides",
        &[],
    ));
    assert!(score.subscores.relevance > 0.5);
}

#[test]
fn context_exceeds_half_when_all_hints_present_and_is_neutral_without_hints() {
    let hints = vec!["orbital".to_string(), "Mechanics".to_string()];
    let with = score_validation(
        &ScoreInput::new("orbital mechanics explained", "q", &[]).with_hints(&hints),
    );
    assert!(with.subscores.context > 0.5);

    let without = score_validation(&ScoreInput::new("orbital mechanics explained", "q", &[]));
    assert!(without.subscores.context > 0.0);
    assert!(without.subscores.context < 1.0);
}

#[test]
fn every_score_is_bounded_for_degenerate_inputs() {
    let hints = vec![String::new(), "   ".to_string()];
    let weird = cites(&[f64::NAN, -1.0, 7.0]);
    let inputs = [
        ScoreInput::new("", "", &[]),
        ScoreInput::new("", "", &weird),
        ScoreInput::new("!!!", "???", &weird).with_hints(&hints),
    ];
    for input in &inputs {
        let s = score_validation(input);
        assert!(in_unit(s.final_score));
        assert!(s.subscores.as_array().into_iter().all(in_unit));
    }

    let skewed = ScoringModel::new(
        ModelWeights {
            citation: f64::INFINITY,
            context: -2.0,
            source: 0.0,
            relevance: 0.0,
        },
        ModelThresholds::default(),
    );
    assert!(in_unit(skewed.score(&inputs[1]).final_score));
}

#[test]
fn is_validation_passing_is_final_at_least_threshold() {
    let at = ValidationScore {
        final_score: DEFAULT_PASS_THRESHOLD,
        subscores: Subscores::default(),
    };
    let below = ValidationScore {
        final_score: 0.5499,
        subscores: Subscores::default(),
    };
    assert!(is_validation_passing(&at, DEFAULT_PASS_THRESHOLD));
    assert!(!is_validation_passing(&below, DEFAULT_PASS_THRESHOLD));
    assert!(is_validation_passing(&below, 0.5));
}

#[test]
fn feedback_lists_each_failing_dimension_once() {
    let score = ValidationScore {
        final_score: 0.1,
        subscores: Subscores::new(0.0, 0.2, 0.9, 0.1),
    };
    let text = get_validation_feedback(&score);
    assert!(text.contains("Validation failed"));
    assert_eq!(text.matches("insufficient citations").count(), 1);
    assert_eq!(text.matches("strengthen citations").count(), 1);
    assert_eq!(text.matches("poor context alignment").count(), 1);
    assert_eq!(text.matches("improve alignment").count(), 1);
    assert_eq!(text.matches("weak relevance").count(), 1);
    assert!(!text.contains("low source quality"));
}

#[test]
fn feedback_on_passing_score_says_passed() {
    let score = ValidationScore {
        final_score: 0.9,
        subscores: Subscores::new(0.9, 0.9, 0.9, 0.9),
    };
    let text = get_validation_feedback(&score);
    assert!(text.contains("passed"));
    assert!(!text.contains("failed"));
}

#[test]
fn well_supported_answer_passes_default_model() {
    let c = cites(&[0.9, 0.85, 0.8]);
    let hints = vec!["gravity".to_string()];
    let score = score_validation(
        &ScoreInput::new("The moon's gravity drives ocean tides", "why ocean tides", &c)
            .with_hints(&hints),
    );
    assert!(ScoringModel::default().is_passing(&score), "{score:?}");
}
