// Windowed Log-Likelihood Estimation
// Slides a fixed-stride window over the tokenized text so documents
// longer than the oracle's context length get a single scalar likelihood.

use crate::services::oracle::LikelihoodOracle;
use tracing::debug;

use super::DetectError;

/// Estimate the log-likelihood of `text` under the oracle.
///
/// Each window masks the tokens carried over from the previous window,
/// so overlapping context is never counted twice. The boundary protocol
/// is exact: the first window starts at 0 and the loop terminates the
/// first time a window's end reaches the sequence length.
pub fn estimate_log_likelihood(
    oracle: &dyn LikelihoodOracle,
    text: &str,
    stride: usize,
) -> Result<f64, DetectError> {
    let token_ids = oracle.encode(text)?;
    let seq_len = token_ids.len();
    if seq_len == 0 {
        return Err(DetectError::EmptyInput);
    }

    let max_len = oracle.max_context_len();
    // A stride above the window length would leave gaps between windows.
    let stride = stride.clamp(1, max_len);

    let mut losses = Vec::new();
    let mut prev_end = 0usize;
    let mut begin = 0usize;

    loop {
        let end = (begin + max_len).min(seq_len);
        // New tokens in this window; everything before them is context only.
        let trg_len = end - prev_end;
        let window = &token_ids[begin..end];
        let unmasked_start = window.len() - trg_len;

        let loss = oracle.score_window(window, unmasked_start)?;
        losses.push(loss);

        prev_end = end;
        if end == seq_len {
            break;
        }
        begin += stride;
    }

    let mean_loss = losses.iter().sum::<f64>() / losses.len() as f64;
    debug!(
        tokens = seq_len,
        windows = losses.len(),
        mean_loss,
        "windowed likelihood computed"
    );

    Ok(-mean_loss)
}
