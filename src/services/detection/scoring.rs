// Discrepancy Score Calculation
// Reduces one original likelihood and N perturbed likelihoods to the
// z-score statistic driving classification.

use crate::models::ScoreResult;

/// Additive floor guarding against zero variance in the perturbed set.
const STD_FLOOR: f64 = 1e-10;

/// `score = (original - mean(perturbed)) / (std(perturbed) + 1e-10)`.
///
/// Higher score means the likelihood barely drops under perturbation,
/// which this detector reads as more likely machine-generated. An empty
/// perturbed set (too-short text) yields the defined neutral result.
pub fn discrepancy_score(original_ll: f64, perturbed_lls: &[f64]) -> ScoreResult {
    if perturbed_lls.is_empty() {
        return ScoreResult::NEUTRAL;
    }

    let n = perturbed_lls.len() as f64;
    let mean = perturbed_lls.iter().sum::<f64>() / n;
    // Population variance, matching the statistic's definition.
    let variance = perturbed_lls.iter().map(|ll| (ll - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();

    let diff = original_ll - mean;
    ScoreResult {
        score: diff / (std + STD_FLOOR),
        diff,
        std,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_perturbations_yield_neutral() {
        let result = discrepancy_score(-3.2, &[]);
        assert_eq!(result, ScoreResult::NEUTRAL);
    }

    #[test]
    fn test_known_statistics() {
        // mean = -3.0, population std = 0.5
        let perturbed = [-2.5, -3.5, -2.5, -3.5];
        let result = discrepancy_score(-2.0, &perturbed);
        assert!((result.diff - 1.0).abs() < 1e-12);
        assert!((result.std - 0.5).abs() < 1e-12);
        assert!((result.score - 1.0 / (0.5 + 1e-10)).abs() < 1e-9);
    }

    #[test]
    fn test_zero_variance_does_not_divide_by_zero() {
        let perturbed = [-3.0; 20];
        let result = discrepancy_score(-2.0, &perturbed);
        assert!(result.score.is_finite());
        assert_eq!(result.std, 0.0);
        assert!(result.score > 0.0);
    }

    #[test]
    fn test_polarity() {
        let perturbed = [-3.5, -3.0, -2.5];
        // Original above the perturbed mean: AI-leaning positive score.
        assert!(discrepancy_score(-2.0, &perturbed).score > 0.0);
        // Original below the perturbed mean: human-leaning negative score.
        assert!(discrepancy_score(-4.0, &perturbed).score < 0.0);
    }
}
