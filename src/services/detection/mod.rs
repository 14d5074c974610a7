// Detection pipeline: likelihood estimation, perturbation sampling,
// discrepancy scoring, chunk handling, and score calibration.

pub mod analyzer;
pub mod calibration;
pub mod chunking;
pub mod likelihood;
pub mod perturbation;
pub mod scoring;

pub use analyzer::{PerturbationDetector, DETECTION_METHOD};
pub use calibration::MIN_WORDS;
pub use perturbation::{PerturbationSampler, WordDropSampler};

use crate::models::Verdict;
use crate::services::oracle::OracleError;

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// The only error callers of a detector see for valid requests:
    /// the input is too short to score meaningfully.
    #[error("Text too short. Please provide at least {min} words.")]
    InsufficientInput { words: usize, min: usize },

    /// The tokenizer produced no tokens. Internal to the pipeline; the
    /// analyzer converts it into a neutral verdict.
    #[error("tokenized input is empty")]
    EmptyInput,

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("{0}")]
    Internal(String),
}

/// Common surface for text detectors. The one implementation here is
/// [`PerturbationDetector`]; the trait keeps the serving layer decoupled
/// from the scoring strategy.
pub trait Detector: Send + Sync {
    fn method(&self) -> &'static str;

    fn detect(&self, text: &str) -> Result<Verdict, DetectError>;
}
