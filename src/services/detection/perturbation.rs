// Perturbation Sampling
// Generates minimally-altered variants of a text by dropping single
// interior words. Each perturbation reseeds its own RNG so results are
// reproducible per index and independent of request interleaving.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const MIN_PERTURBATIONS: usize = 15;
pub const MAX_PERTURBATIONS: usize = 30;
/// At or below this word count the text is too short to perturb; the
/// caller falls back to the neutral score.
const MIN_WORDS_TO_PERTURB: usize = 10;
/// Word-drop needs enough words that removing an interior one leaves a
/// sensible sentence.
const MIN_WORDS_FOR_DROP: usize = 5;

/// One perturbed variant, tagged with the seed that produced it.
#[derive(Debug, Clone)]
pub struct Perturbation {
    pub text: String,
    pub seed: u64,
}

/// Number of perturbations for a text of `word_count` words:
/// `clamp(word_count / 4, 15, 30)`, or 0 when the text is too short.
pub fn perturbation_count(word_count: usize) -> usize {
    if word_count <= MIN_WORDS_TO_PERTURB {
        return 0;
    }
    (word_count / 4).clamp(MIN_PERTURBATIONS, MAX_PERTURBATIONS)
}

/// Sample the perturbation set for `words`, in generation order.
///
/// Deterministic: identical `(words, seed_base)` always yields the
/// identical sequence. Perturbation `i` uses its own RNG seeded with
/// `seed_base + i`; no process-wide random state is touched.
pub fn sample_perturbations(words: &[String], seed_base: u64) -> Vec<Perturbation> {
    let count = perturbation_count(words.len());
    let mut out = Vec::with_capacity(count);

    for i in 0..count {
        let seed = seed_base.wrapping_add(i as u64);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut perturbed: Vec<&str> = words.iter().map(String::as_str).collect();
        if perturbed.len() > MIN_WORDS_FOR_DROP {
            // Interior index only; the first and last words stay anchored.
            let idx = rng.random_range(1..perturbed.len() - 1);
            perturbed.remove(idx);
        }

        out.push(Perturbation {
            text: perturbed.join(" "),
            seed,
        });
    }

    out
}

/// Strategy seam for perturbation generation. Word-drop is the default;
/// richer generative strategies plug in behind the same contract.
pub trait PerturbationSampler: Send + Sync {
    fn sample(&self, words: &[String], seed_base: u64) -> Vec<Perturbation>;
}

/// Default sampler: one interior word dropped per perturbation.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordDropSampler;

impl PerturbationSampler for WordDropSampler {
    fn sample(&self, words: &[String], seed_base: u64) -> Vec<Perturbation> {
        sample_perturbations(words, seed_base)
    }
}
