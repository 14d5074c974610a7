// Verdict Calibration
// Maps the unbounded discrepancy score onto a bounded percentage, a
// confidence tier, and a verdict string. Both tables were tuned
// empirically against commercial detectors and are reproduced verbatim
// as wire contracts; do not re-derive them.

use crate::models::{Confidence, RawMetrics, ScoreResult, Verdict};

use super::DetectError;

/// Minimum analyzable length in words.
pub const MIN_WORDS: usize = 30;

const NEUTRAL_VERDICT_TEXT: &str = "Unclear - analysis error";

/// Percentage likelihood that the text is machine-generated.
/// Monotonic non-decreasing step function of the score; comparisons are
/// strict, so a score of exactly 0 falls in the `> -0.05` bucket.
pub fn ai_likelihood_percent(score: f64) -> i32 {
    if score > 1.5 {
        100
    } else if score > 1.0 {
        98
    } else if score > 0.7 {
        95
    } else if score > 0.5 {
        92
    } else if score > 0.3 {
        88
    } else if score > 0.15 {
        82
    } else if score > 0.05 {
        75
    } else if score > 0.0 {
        68
    } else if score > -0.05 {
        55
    } else if score > -0.15 {
        42
    } else if score > -0.3 {
        32
    } else if score > -0.5 {
        22
    } else if score > -0.7 {
        12
    } else if score > -1.0 {
        5
    } else if score > -1.5 {
        2
    } else {
        0
    }
}

/// Six-tier verdict text and confidence, evaluated on the same score as
/// the percentage table but independently of it.
pub fn verdict_for_score(score: f64) -> (&'static str, Confidence) {
    if score > 0.7 {
        ("Likely AI-generated or heavily AI-assisted", Confidence::High)
    } else if score > 0.3 {
        ("Likely AI-generated or heavily AI-assisted", Confidence::High)
    } else if score > 0.05 {
        ("Likely AI-generated or heavily AI-assisted", Confidence::Medium)
    } else if score > -0.15 {
        ("Mixed human and AI content", Confidence::Medium)
    } else if score > -0.5 {
        ("Primarily human-written", Confidence::Medium)
    } else {
        ("Primarily human-written", Confidence::High)
    }
}

/// Build the final verdict for a scored text.
pub fn calibrate(result: ScoreResult, word_count: usize) -> Result<Verdict, DetectError> {
    if word_count < MIN_WORDS {
        return Err(DetectError::InsufficientInput {
            words: word_count,
            min: MIN_WORDS,
        });
    }

    let ai_likelihood = ai_likelihood_percent(result.score);
    let (verdict, confidence) = verdict_for_score(result.score);

    Ok(Verdict {
        ai_likelihood,
        human_likelihood: 100 - ai_likelihood,
        confidence,
        verdict: verdict.to_string(),
        score: result.score,
        raw_metrics: RawMetrics {
            diff: result.diff,
            std: result.std,
            error: None,
            total_chunks: None,
        },
    })
}

/// Defined fallback verdict for analysis failures past input validation:
/// 50/50, low confidence, and an error marker in the raw metrics.
pub fn neutral_verdict(reason: &str, total_chunks: Option<usize>) -> Verdict {
    Verdict {
        ai_likelihood: 50,
        human_likelihood: 50,
        confidence: Confidence::Low,
        verdict: NEUTRAL_VERDICT_TEXT.to_string(),
        score: 0.0,
        raw_metrics: RawMetrics {
            diff: 0.0,
            std: 1.0,
            error: Some(reason.to_string()),
            total_chunks,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_table_breakpoints() {
        let cases = [
            (1.6, 100),
            (1.2, 98),
            (0.8, 95),
            (0.6, 92),
            (0.4, 88),
            (0.2, 82),
            (0.1, 75),
            (0.01, 68),
            (-0.01, 55),
            (-0.1, 42),
            (-0.2, 32),
            (-0.4, 22),
            (-0.6, 12),
            (-0.8, 5),
            (-1.2, 2),
            (-2.0, 0),
        ];
        for (score, expected) in cases {
            assert_eq!(ai_likelihood_percent(score), expected, "score {}", score);
        }
    }

    #[test]
    fn test_score_zero_falls_in_the_55_bucket() {
        // 0 > 0 is false: exact zero is "barely AI", not "slight AI lean".
        assert_eq!(ai_likelihood_percent(0.0), 55);
    }

    #[test]
    fn test_percentage_is_monotonic_non_decreasing() {
        let mut score = -2.0;
        let mut prev = ai_likelihood_percent(score);
        while score < 2.0 {
            score += 0.01;
            let current = ai_likelihood_percent(score);
            assert!(current >= prev, "regression at score {}", score);
            prev = current;
        }
    }

    #[test]
    fn test_complement_invariant() {
        for i in -200..=200 {
            let score = i as f64 / 100.0;
            let verdict = calibrate(
                ScoreResult { score, diff: 0.0, std: 1.0 },
                100,
            )
            .unwrap();
            assert_eq!(verdict.ai_likelihood + verdict.human_likelihood, 100);
        }
    }

    #[test]
    fn test_verdict_tiers() {
        assert_eq!(
            verdict_for_score(0.8),
            ("Likely AI-generated or heavily AI-assisted", Confidence::High)
        );
        assert_eq!(
            verdict_for_score(0.4),
            ("Likely AI-generated or heavily AI-assisted", Confidence::High)
        );
        assert_eq!(
            verdict_for_score(0.1),
            ("Likely AI-generated or heavily AI-assisted", Confidence::Medium)
        );
        assert_eq!(
            verdict_for_score(0.0),
            ("Mixed human and AI content", Confidence::Medium)
        );
        assert_eq!(
            verdict_for_score(-0.3),
            ("Primarily human-written", Confidence::Medium)
        );
        assert_eq!(
            verdict_for_score(-0.6),
            ("Primarily human-written", Confidence::High)
        );
    }

    #[test]
    fn test_concrete_scenarios() {
        let high_ai = calibrate(ScoreResult { score: 0.8, diff: 0.2, std: 0.25 }, 100).unwrap();
        assert_eq!(high_ai.ai_likelihood, 95);
        assert_eq!(high_ai.confidence, Confidence::High);
        assert_eq!(high_ai.verdict, "Likely AI-generated or heavily AI-assisted");

        let human = calibrate(ScoreResult { score: -0.6, diff: -0.3, std: 0.5 }, 100).unwrap();
        assert_eq!(human.ai_likelihood, 12);
        assert_eq!(human.confidence, Confidence::High);
        assert_eq!(human.verdict, "Primarily human-written");

        let zero = calibrate(ScoreResult { score: 0.0, diff: 0.0, std: 1.0 }, 100).unwrap();
        assert_eq!(zero.ai_likelihood, 55);
    }

    #[test]
    fn test_too_short_text_is_rejected() {
        let err = calibrate(ScoreResult::NEUTRAL, 29).unwrap_err();
        assert!(matches!(err, DetectError::InsufficientInput { words: 29, min: 30 }));
        assert!(calibrate(ScoreResult::NEUTRAL, 30).is_ok());
    }

    #[test]
    fn test_neutral_verdict_shape() {
        let verdict = neutral_verdict("All text chunks failed analysis", Some(3));
        assert_eq!(verdict.ai_likelihood, 50);
        assert_eq!(verdict.human_likelihood, 50);
        assert_eq!(verdict.confidence, Confidence::Low);
        assert_eq!(verdict.verdict, "Unclear - analysis error");
        assert_eq!(verdict.score, 0.0);
        assert_eq!(verdict.raw_metrics.total_chunks, Some(3));
        assert!(verdict.raw_metrics.error.is_some());
    }
}
