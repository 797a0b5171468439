//! Provider Adapters
//!
//! One streaming contract for every AI backend: an adapter turns a plan
//! request into a [`RawChunkStream`] of ordered text fragments plus
//! end/error signaling. The transducer, extractor and merger are written
//! once against that contract and reused across backends.

mod gemini;
mod ollama;
mod openai_compat;

pub use gemini::*;
pub use ollama::*;
pub use openai_compat::*;

use async_trait::async_trait;

use crate::error::PlanError;
use crate::streaming::RawChunkStream;

/// A single planning or recommendation request sent to a backend.
///
/// Prompt construction is the caller's concern; adapters only carry the
/// text through their wire format.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub prompt: String,
    /// Optional system-level instructions, where the backend supports them.
    pub instructions: Option<String>,
}

impl PlanRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            instructions: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

/// Streaming contract implemented by every backend adapter.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable provider identifier, used in error messages and logs.
    fn id(&self) -> &str;

    /// Open a streaming response for the request. The returned stream
    /// yields text fragments in order; transport failures surface as
    /// stream errors.
    async fn open_stream(&self, request: &PlanRequest) -> Result<RawChunkStream, PlanError>;
}

/// Classify a reqwest send failure the way callers want to branch on it.
pub(crate) fn map_send_error(e: reqwest::Error) -> PlanError {
    if e.is_timeout() {
        return PlanError::TimeoutError(format!("Request timed out: {e}"));
    }
    if e.is_connect() {
        return PlanError::ConnectionError(format!("Connection error: {e}"));
    }
    PlanError::HttpError(format!("Failed to send request: {e}"))
}

/// Turn a non-success response into an error carrying status and body.
pub(crate) async fn error_for_status(
    provider_id: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, PlanError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    Err(PlanError::HttpError(format!(
        "{provider_id}: HTTP {status}: {text}"
    )))
}

/// Streaming requests get a connect timeout only: a whole-request timeout
/// would cut off long generations mid-stream. Stall detection is the
/// caller's responsibility.
pub(crate) fn build_http_client(
    connect_timeout: std::time::Duration,
) -> Result<reqwest::Client, PlanError> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| PlanError::HttpError(format!("Failed to build HTTP client: {e}")))
}
