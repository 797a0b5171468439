//! Gemini streaming adapter
//!
//! Uses `streamGenerateContent?alt=sse`: each SSE event carries a JSON body
//! whose text lives in `candidates[].content.parts[].text`.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::PlanError;
use crate::providers::{PlanRequest, ProviderAdapter, error_for_status, map_send_error};
use crate::streaming::RawChunkStream;

/// Gemini configuration parameters
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key for authentication (securely stored)
    pub api_key: SecretString,
    /// Base URL for the Gemini API
    pub base_url: String,
    /// Model to use
    pub model: String,
    /// Connect timeout in seconds
    pub connect_timeout: u64,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field(
                "api_key_present",
                &(!self.api_key.expose_secret().is_empty()),
            )
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: SecretString::from(String::new()),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            connect_timeout: 30,
        }
    }
}

impl GeminiConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Gemini stream chunk structure
#[derive(Debug, Deserialize)]
struct GeminiStreamChunk {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

impl GeminiStreamChunk {
    fn text(&self) -> String {
        let mut out = String::new();
        for candidate in self.candidates.iter().flatten() {
            let parts = candidate.content.as_ref().and_then(|c| c.parts.as_ref());
            for part in parts.into_iter().flatten() {
                if let Some(text) = &part.text {
                    out.push_str(text);
                }
            }
        }
        out
    }
}

pub struct GeminiAdapter {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiAdapter {
    pub fn new(config: GeminiConfig) -> Result<Self, PlanError> {
        let client = crate::providers::build_http_client(std::time::Duration::from_secs(
            config.connect_timeout,
        ))?;
        Ok(Self { config, client })
    }

    fn request_body(request: &PlanRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
        });
        if let Some(instructions) = &request.instructions {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": instructions }],
            });
        }
        body
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> &str {
        "gemini"
    }

    async fn open_stream(&self, request: &PlanRequest) -> Result<RawChunkStream, PlanError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url, self.config.model
        );
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.config.api_key.expose_secret())
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(map_send_error)?;
        let response = error_for_status(self.id(), response).await?;

        let mut events = response.bytes_stream().eventsource();
        let out = async_stream::stream! {
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(ev) => ev,
                    Err(e) => {
                        yield Err(PlanError::StreamError(format!("SSE stream error (gemini): {e}")));
                        return;
                    }
                };
                let data = event.data.trim();
                if data.is_empty() {
                    continue;
                }
                let chunk: GeminiStreamChunk = match serde_json::from_str(data) {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(PlanError::ParseError(format!(
                            "Failed to parse Gemini SSE JSON: {e}"
                        )));
                        return;
                    }
                };
                let text = chunk.text();
                if !text.is_empty() {
                    yield Ok(text);
                }
            }
        };
        Ok(Box::pin(out))
    }
}
