// Perturbation-Discrepancy Analyzer
// Orchestrates the scoring pipeline: windowed likelihood, perturbation
// sampling, discrepancy scoring, chunk aggregation, and calibration.
// Once input validation passes, failures never escape this boundary;
// they degrade to the neutral verdict.

use crate::models::{BatchErrorMarker, BatchItemOutcome, ChunkOutcome, DetectResponse, Document, ScoreResult, Verdict};
use crate::services::config_store::DetectorConfig;
use crate::services::oracle::LikelihoodOracle;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use super::calibration::{calibrate, neutral_verdict, MIN_WORDS};
use super::chunking::{aggregate_chunk_scores, split_words};
use super::likelihood::estimate_log_likelihood;
use super::perturbation::{PerturbationSampler, WordDropSampler};
use super::scoring::discrepancy_score;
use super::{DetectError, Detector};

pub const DETECTION_METHOD: &str = "DetectGPT (GPT-2 Perplexity)";

/// DetectGPT-style statistical detector over a shared likelihood oracle.
///
/// The oracle is the only long-lived shared resource; everything else is
/// per-request and the detector itself is cheap to clone.
#[derive(Clone)]
pub struct PerturbationDetector {
    oracle: Arc<dyn LikelihoodOracle>,
    sampler: Arc<dyn PerturbationSampler>,
    config: DetectorConfig,
}

impl PerturbationDetector {
    pub fn new(oracle: Arc<dyn LikelihoodOracle>, config: DetectorConfig) -> Self {
        Self {
            oracle,
            sampler: Arc::new(WordDropSampler),
            config,
        }
    }

    /// Swap in an alternate perturbation strategy.
    pub fn with_sampler(mut self, sampler: Arc<dyn PerturbationSampler>) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Oracle identity, for the serving layer's health reporting.
    pub fn oracle(&self) -> &dyn LikelihoodOracle {
        self.oracle.as_ref()
    }

    /// Score one text (or one chunk) through the full pipeline.
    ///
    /// Texts of 10 words or fewer produce no perturbations and come back
    /// with the neutral score.
    pub fn score_text(&self, text: &str) -> Result<ScoreResult, DetectError> {
        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();

        let original_ll = estimate_log_likelihood(self.oracle.as_ref(), text, self.config.stride)?;

        let perturbations = self.sampler.sample(&words, self.config.perturbation_seed);
        let mut perturbed_lls = Vec::with_capacity(perturbations.len());
        for perturbation in &perturbations {
            let ll =
                estimate_log_likelihood(self.oracle.as_ref(), &perturbation.text, self.config.stride)?;
            perturbed_lls.push(ll);
        }

        Ok(discrepancy_score(original_ll, &perturbed_lls))
    }

    /// Synchronous analysis; long documents score their chunks one after
    /// another. The async [`analyze`](Self::analyze) path parallelizes
    /// chunks and adds the request timeout.
    pub fn detect_blocking(&self, text: &str) -> Result<Verdict, DetectError> {
        let document = Document::new(text);
        let word_count = document.word_count();
        self.validate(word_count)?;

        if word_count > self.config.max_words_per_chunk {
            let chunks = split_words(document.words(), self.config.max_words_per_chunk);
            let outcomes: Vec<ChunkOutcome> = chunks
                .iter()
                .enumerate()
                .map(|(idx, chunk)| self.score_chunk(idx, chunks.len(), chunk))
                .collect();
            self.chunked_verdict(&outcomes, word_count)
        } else {
            self.single_verdict(self.score_text(document.text()), word_count)
        }
    }

    /// Analyze one text under the request timeout. Timeout behaves like a
    /// full aggregation failure and yields the neutral verdict.
    pub async fn analyze(&self, text: &str) -> Result<Verdict, DetectError> {
        let started = Instant::now();
        let timeout = Duration::from_secs(self.config.timeout_secs.max(1));

        let result = match tokio::time::timeout(timeout, self.analyze_inner(text)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout_secs = self.config.timeout_secs,
                    "analysis timed out; returning neutral verdict"
                );
                Ok(neutral_verdict("analysis timed out", None))
            }
        };

        if let Ok(verdict) = &result {
            info!(
                score = verdict.score,
                ai_likelihood = verdict.ai_likelihood,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "analysis complete"
            );
        }
        result
    }

    /// Analyze a batch; per-item failures become error markers and never
    /// abort the remaining items. Dropping the returned future stops
    /// launching work for items not yet started.
    pub async fn analyze_batch(&self, texts: &[String]) -> Vec<BatchItemOutcome> {
        let mut results = Vec::with_capacity(texts.len());
        for (idx, text) in texts.iter().enumerate() {
            match self.analyze(text).await {
                Ok(verdict) => results.push(BatchItemOutcome::Verdict(verdict)),
                Err(e) => {
                    warn!("batch item {} rejected: {}", idx, e);
                    let min_words = match &e {
                        DetectError::InsufficientInput { min, .. } => Some(*min),
                        _ => None,
                    };
                    results.push(BatchItemOutcome::Error(BatchErrorMarker {
                        error: e.to_string(),
                        min_words,
                    }));
                }
            }
        }
        results
    }

    /// Wrap a verdict in the response shape the serving layer forwards.
    pub fn response(&self, verdict: Verdict) -> DetectResponse {
        DetectResponse::from_verdict(verdict, DETECTION_METHOD, Uuid::new_v4().to_string())
    }

    async fn analyze_inner(&self, text: &str) -> Result<Verdict, DetectError> {
        let document = Document::new(text);
        let word_count = document.word_count();
        self.validate(word_count)?;

        if word_count > self.config.max_words_per_chunk {
            let chunks = split_words(document.words(), self.config.max_words_per_chunk);
            let outcomes = self.score_chunks_parallel(chunks).await;
            self.chunked_verdict(&outcomes, word_count)
        } else {
            let this = self.clone();
            let text = document.text().to_string();
            let scored = match tokio::task::spawn_blocking(move || this.score_text(&text)).await {
                Ok(scored) => scored,
                Err(e) => Err(DetectError::Internal(format!("scoring task failed: {}", e))),
            };
            self.single_verdict(scored, word_count)
        }
    }

    /// Score chunks on blocking tasks with bounded concurrency. Results
    /// are re-sorted by chunk index before aggregation so the statistic
    /// never depends on execution order.
    async fn score_chunks_parallel(&self, chunks: Vec<String>) -> Vec<ChunkOutcome> {
        let total = chunks.len();
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_chunks.max(1)));
        let mut join_set: JoinSet<(usize, ChunkOutcome)> = JoinSet::new();

        for (idx, chunk) in chunks.into_iter().enumerate() {
            let this = self.clone();
            let semaphore = semaphore.clone();

            join_set.spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            idx,
                            ChunkOutcome::Failed {
                                error: "semaphore closed".to_string(),
                            },
                        )
                    }
                };

                let outcome = tokio::task::spawn_blocking(move || this.score_chunk(idx, total, &chunk))
                    .await
                    .unwrap_or_else(|e| ChunkOutcome::Failed {
                        error: format!("chunk task failed: {}", e),
                    });

                (idx, outcome)
            });
        }

        let mut indexed: Vec<(usize, ChunkOutcome)> = Vec::with_capacity(total);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(pair) => indexed.push(pair),
                Err(e) => warn!("chunk task panicked: {}", e),
            }
        }

        indexed.sort_by_key(|(idx, _)| *idx);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }

    fn score_chunk(&self, idx: usize, total: usize, chunk: &str) -> ChunkOutcome {
        match self.score_text(chunk) {
            Ok(result) => ChunkOutcome::Scored(result),
            Err(e) => {
                warn!("error analyzing chunk {}/{}: {}", idx + 1, total, e);
                ChunkOutcome::Failed { error: e.to_string() }
            }
        }
    }

    fn validate(&self, word_count: usize) -> Result<(), DetectError> {
        if word_count < MIN_WORDS {
            return Err(DetectError::InsufficientInput {
                words: word_count,
                min: MIN_WORDS,
            });
        }
        Ok(())
    }

    fn chunked_verdict(
        &self,
        outcomes: &[ChunkOutcome],
        word_count: usize,
    ) -> Result<Verdict, DetectError> {
        let agg = aggregate_chunk_scores(outcomes);
        if agg.all_failed() {
            warn!("all {} chunks failed to analyze; returning neutral verdict", agg.total);
            return Ok(neutral_verdict("All text chunks failed analysis", Some(agg.total)));
        }

        info!("analyzed {}/{} chunks successfully", agg.succeeded, agg.total);
        calibrate(agg.result, word_count)
    }

    fn single_verdict(
        &self,
        scored: Result<ScoreResult, DetectError>,
        word_count: usize,
    ) -> Result<Verdict, DetectError> {
        match scored {
            Ok(result) => calibrate(result, word_count),
            Err(e) => {
                warn!("error in single text analysis: {}; returning neutral verdict", e);
                Ok(neutral_verdict(&e.to_string(), None))
            }
        }
    }
}

impl Detector for PerturbationDetector {
    fn method(&self) -> &'static str {
        DETECTION_METHOD
    }

    fn detect(&self, text: &str) -> Result<Verdict, DetectError> {
        self.detect_blocking(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Confidence;
    use crate::services::oracle::OracleError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic fake model: the loss of a window is a hash of its
    /// token ids, so different texts get different likelihoods and
    /// identical texts always score identically.
    struct HashOracle {
        fail: bool,
        calls: AtomicUsize,
    }

    impl HashOracle {
        fn ok() -> Self {
            Self { fail: false, calls: AtomicUsize::new(0) }
        }

        fn failing() -> Self {
            Self { fail: true, calls: AtomicUsize::new(0) }
        }
    }

    impl LikelihoodOracle for HashOracle {
        fn encode(&self, text: &str) -> Result<Vec<u32>, OracleError> {
            Ok(text
                .split_whitespace()
                .map(|w| w.bytes().fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32)))
                .collect())
        }

        fn score_window(&self, token_ids: &[u32], unmasked_start: usize) -> Result<f64, OracleError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.fail {
                return Err(OracleError::ApiError {
                    status: 500,
                    message: "model unavailable".to_string(),
                });
            }
            let mix = token_ids[unmasked_start..]
                .iter()
                .fold(11u64, |acc, &id| acc.wrapping_mul(6364136223846793005).wrapping_add(id as u64));
            Ok(2.0 + (mix % 1000) as f64 / 1000.0)
        }

        fn max_context_len(&self) -> usize {
            1024
        }

        fn model_id(&self) -> &str {
            "mock-gpt2"
        }

        fn device(&self) -> &str {
            "cpu"
        }
    }

    fn detector(oracle: HashOracle) -> PerturbationDetector {
        PerturbationDetector::new(Arc::new(oracle), DetectorConfig::default())
    }

    fn text_of(words: usize) -> String {
        (0..words).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_29_words_rejected_30_accepted() {
        let det = detector(HashOracle::ok());

        let err = det.detect_blocking(&text_of(29)).unwrap_err();
        assert!(matches!(err, DetectError::InsufficientInput { words: 29, min: 30 }));

        let verdict = det.detect_blocking(&text_of(30)).unwrap();
        assert_eq!(verdict.ai_likelihood + verdict.human_likelihood, 100);
    }

    #[test]
    fn test_empty_text_rejected() {
        let det = detector(HashOracle::ok());
        let err = det.detect_blocking("").unwrap_err();
        assert!(matches!(err, DetectError::InsufficientInput { words: 0, .. }));
    }

    #[test]
    fn test_deterministic_score() {
        let text = text_of(120);
        let a = detector(HashOracle::ok()).detect_blocking(&text).unwrap();
        let b = detector(HashOracle::ok()).detect_blocking(&text).unwrap();
        assert_eq!(a.score.to_bits(), b.score.to_bits());
        assert_eq!(a.ai_likelihood, b.ai_likelihood);
    }

    #[test]
    fn test_single_path_failure_degrades_to_neutral() {
        let det = detector(HashOracle::failing());
        let verdict = det.detect_blocking(&text_of(100)).unwrap();
        assert_eq!(verdict.ai_likelihood, 50);
        assert_eq!(verdict.human_likelihood, 50);
        assert_eq!(verdict.confidence, Confidence::Low);
        assert_eq!(verdict.verdict, "Unclear - analysis error");
        assert_eq!(verdict.score, 0.0);
        assert!(verdict.raw_metrics.error.is_some());
    }

    #[test]
    fn test_long_document_all_chunks_fail_neutral_fallback() {
        let det = detector(HashOracle::failing());
        let verdict = det.detect_blocking(&text_of(1300)).unwrap();
        assert_eq!(verdict.ai_likelihood, 50);
        assert_eq!(verdict.confidence, Confidence::Low);
        assert_eq!(verdict.verdict, "Unclear - analysis error");
        assert_eq!(verdict.raw_metrics.total_chunks, Some(3));
    }

    #[test]
    fn test_long_document_reports_aggregate_metrics() {
        let det = detector(HashOracle::ok());
        let verdict = det.detect_blocking(&text_of(700)).unwrap();
        // Chunked path: diff/std are not meaningful and report 0.0 / 1.0.
        assert_eq!(verdict.raw_metrics.diff, 0.0);
        assert_eq!(verdict.raw_metrics.std, 1.0);
    }

    #[tokio::test]
    async fn test_async_analyze_matches_blocking() {
        let text = text_of(150);
        let det = detector(HashOracle::ok());
        let blocking = det.detect_blocking(&text).unwrap();
        let asynced = det.analyze(&text).await.unwrap();
        assert_eq!(blocking.score.to_bits(), asynced.score.to_bits());
    }

    #[tokio::test]
    async fn test_async_chunked_analyze_is_order_stable() {
        // 1300 words → 3 chunks scored in parallel; score must equal the
        // sequential path regardless of completion order.
        let text = text_of(1300);
        let det = detector(HashOracle::ok());
        let sequential = det.detect_blocking(&text).unwrap();
        let parallel = det.analyze(&text).await.unwrap();
        assert_eq!(sequential.score.to_bits(), parallel.score.to_bits());
    }

    #[tokio::test]
    async fn test_batch_isolates_per_item_failures() {
        let det = detector(HashOracle::ok());
        let texts = vec![text_of(5), text_of(60)];
        let results = det.analyze_batch(&texts).await;
        assert_eq!(results.len(), 2);
        assert!(matches!(&results[0], BatchItemOutcome::Error(marker) if marker.min_words == Some(30)));
        assert!(matches!(&results[1], BatchItemOutcome::Verdict(_)));
    }

    #[test]
    fn test_response_carries_method_and_request_id() {
        let det = detector(HashOracle::ok());
        let verdict = det.detect_blocking(&text_of(40)).unwrap();
        let response = det.response(verdict);
        assert_eq!(response.method, DETECTION_METHOD);
        assert!(!response.request_id.is_empty());
    }
}
