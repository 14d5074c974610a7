// DetectGPT Data Models
// Response schemas mirror the original detection service wire format

use serde::{Deserialize, Serialize};

// ============ Document ============

/// A piece of text under analysis, with its derived word list.
/// Built once per request and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    words: Vec<String>,
}

impl Document {
    pub fn new(text: &str) -> Self {
        let text = text.trim().to_string();
        let words = text.split_whitespace().map(str::to_string).collect();
        Self { text, words }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

// ============ Scoring ============

/// Normalized perturbation-discrepancy statistic for one text or chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: f64,
    pub diff: f64,
    pub std: f64,
}

impl ScoreResult {
    /// Defined neutral result for texts too short to perturb, and for
    /// the all-chunks-failed sentinel.
    pub const NEUTRAL: Self = Self {
        score: 0.0,
        diff: 0.0,
        std: 1.0,
    };
}

/// Outcome of scoring one chunk of a long document.
/// Failures are recorded and skipped, never propagated.
#[derive(Debug, Clone)]
pub enum ChunkOutcome {
    Scored(ScoreResult),
    Failed { error: String },
}

// ============ Verdict ============

/// Confidence tier. Serialized exactly as the original service emits it:
/// the fallback tier is lowercase "low" on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    #[serde(rename = "low")]
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "High"),
            Confidence::Medium => write!(f, "Medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawMetrics {
    pub diff: f64,
    pub std: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
}

/// Final classification for one analyzed text.
/// Invariant: `ai_likelihood + human_likelihood == 100`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub ai_likelihood: i32,
    pub human_likelihood: i32,
    pub confidence: Confidence,
    pub verdict: String,
    pub score: f64,
    pub raw_metrics: RawMetrics,
}

// ============ Detection Response ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    pub ai_likelihood: i32,
    pub human_likelihood: i32,
    pub confidence: Confidence,
    pub verdict: String,
    pub score: f64,
    pub raw_metrics: RawMetrics,
    pub method: String,
    pub request_id: String,
}

impl DetectResponse {
    pub fn from_verdict(verdict: Verdict, method: &str, request_id: String) -> Self {
        Self {
            ai_likelihood: verdict.ai_likelihood,
            human_likelihood: verdict.human_likelihood,
            confidence: verdict.confidence,
            verdict: verdict.verdict,
            score: verdict.score,
            raw_metrics: verdict.raw_metrics,
            method: method.to_string(),
            request_id,
        }
    }
}

// ============ Batch Detection ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchErrorMarker {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_words: Option<usize>,
}

/// One entry of a batch response: either a full verdict or an error
/// marker for that item. Per-item failures never abort the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchItemOutcome {
    Verdict(Verdict),
    Error(BatchErrorMarker),
}
