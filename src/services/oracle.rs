// Likelihood Oracle Interface
// The pretrained scoring model is an external capability; this module
// defines the seam and a thin client for a remote scoring service.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

const ORACLE_DEFAULT_URL: &str = "http://127.0.0.1:8001";
const ORACLE_REQUEST_TIMEOUT_SECS: u64 = 80;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("oracle error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("missing field in oracle response")]
    MissingContent,
    #[error("oracle returned a non-finite loss")]
    InvalidLoss,
}

/// Opaque autoregressive scoring model, loaded once per process and
/// shared read-only across requests.
///
/// `score_window` returns the loss over the window with every token
/// before `unmasked_start` excluded from the loss target, so overlapping
/// windows never double-count tokens.
pub trait LikelihoodOracle: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<u32>, OracleError>;
    fn score_window(&self, token_ids: &[u32], unmasked_start: usize) -> Result<f64, OracleError>;
    /// Maximum window length `score_window` accepts (GPT-2: 1024).
    fn max_context_len(&self) -> usize;
    /// Model identity, surfaced by the serving layer's health endpoint.
    fn model_id(&self) -> &str;
    fn device(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct EncodeRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncodeResponse {
    token_ids: Vec<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreWindowRequest<'a> {
    token_ids: &'a [u32],
    unmasked_start: usize,
}

#[derive(Debug, Deserialize)]
struct ScoreWindowResponse {
    loss: f64,
}

/// Client for a scoring service hosting the language model.
pub struct RemoteOracle {
    client: reqwest::blocking::Client,
    base_url: String,
    model_id: String,
    device: String,
    max_context_len: usize,
}

impl RemoteOracle {
    pub fn new(model_id: &str, device: &str, max_context_len: usize) -> Result<Self, OracleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(ORACLE_REQUEST_TIMEOUT_SECS))
            .build()?;

        let base_url =
            env::var("DETECTGPT_ORACLE_URL").unwrap_or_else(|_| ORACLE_DEFAULT_URL.to_string());

        Ok(Self {
            client,
            base_url,
            model_id: model_id.to_string(),
            device: device.to_string(),
            max_context_len,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R, OracleError> {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().unwrap_or_default();
            return Err(OracleError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json()?)
    }
}

impl LikelihoodOracle for RemoteOracle {
    fn encode(&self, text: &str) -> Result<Vec<u32>, OracleError> {
        let resp: EncodeResponse = self.post("/encode", &EncodeRequest { text })?;
        Ok(resp.token_ids)
    }

    fn score_window(&self, token_ids: &[u32], unmasked_start: usize) -> Result<f64, OracleError> {
        let resp: ScoreWindowResponse = self.post(
            "/score",
            &ScoreWindowRequest {
                token_ids,
                unmasked_start,
            },
        )?;
        if !resp.loss.is_finite() {
            return Err(OracleError::InvalidLoss);
        }
        Ok(resp.loss)
    }

    fn max_context_len(&self) -> usize {
        self.max_context_len
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn device(&self) -> &str {
        &self.device
    }
}
