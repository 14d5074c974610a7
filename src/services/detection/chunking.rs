// Chunk Splitting and Aggregation
// Long documents are scored as independent word-bounded chunks; failed
// chunks are skipped and the survivors' scores averaged.

use crate::models::{ChunkOutcome, ScoreResult};

/// Partition `words` into contiguous, non-overlapping chunk texts of at
/// most `max_words_per_chunk` words each. The final chunk may be shorter.
pub fn split_words(words: &[String], max_words_per_chunk: usize) -> Vec<String> {
    words
        .chunks(max_words_per_chunk.max(1))
        .map(|chunk| chunk.join(" "))
        .collect()
}

/// Aggregate over the ordered chunk outcomes of one document.
#[derive(Debug, Clone, Copy)]
pub struct ChunkAggregate {
    pub result: ScoreResult,
    pub succeeded: usize,
    pub total: usize,
}

impl ChunkAggregate {
    pub fn all_failed(&self) -> bool {
        self.succeeded == 0
    }
}

/// Unweighted mean of the successful chunks' scores. `diff` and `std`
/// are not meaningful across chunks and are reported as 0.0 / 1.0. When
/// every chunk failed the sentinel neutral result is returned and the
/// caller degrades to the neutral verdict.
pub fn aggregate_chunk_scores(outcomes: &[ChunkOutcome]) -> ChunkAggregate {
    let scores: Vec<f64> = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            ChunkOutcome::Scored(result) => Some(result.score),
            ChunkOutcome::Failed { .. } => None,
        })
        .collect();

    let result = if scores.is_empty() {
        ScoreResult::NEUTRAL
    } else {
        ScoreResult {
            score: scores.iter().sum::<f64>() / scores.len() as f64,
            diff: 0.0,
            std: 1.0,
        }
    };

    ChunkAggregate {
        result,
        succeeded: scores.len(),
        total: outcomes.len(),
    }
}
