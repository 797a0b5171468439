//! OpenAI-compatible streaming adapter
//!
//! Covers every backend speaking the `/chat/completions` SSE dialect:
//! GitHub Copilot, LM Studio, vLLM, llama.cpp server and friends. Content
//! deltas live in `choices[0].delta.content`; `data: [DONE]` closes the
//! stream.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::PlanError;
use crate::providers::{PlanRequest, ProviderAdapter, error_for_status, map_send_error};
use crate::streaming::RawChunkStream;

/// Configuration for an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiCompatConfig {
    /// Provider id used in errors/logs (e.g. "copilot", "local-api").
    pub provider_id: String,
    /// API key for authentication (securely stored; may be empty for
    /// unauthenticated local endpoints)
    pub api_key: SecretString,
    /// Base URL up to and including the API root, e.g.
    /// `https://api.githubcopilot.com` or `http://localhost:8000/v1`
    pub base_url: String,
    /// Model to use
    pub model: String,
    /// Connect timeout in seconds
    pub connect_timeout: u64,
}

impl std::fmt::Debug for OpenAiCompatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatConfig")
            .field("provider_id", &self.provider_id)
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

impl OpenAiCompatConfig {
    pub fn new<S: Into<String>>(provider_id: S, api_key: S) -> Self {
        Self {
            provider_id: provider_id.into(),
            api_key: SecretString::from(api_key.into()),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            connect_timeout: 30,
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

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    choices: Option<Vec<ChunkChoice>>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

impl ChatCompletionChunk {
    fn text(&self) -> Option<&str> {
        self.choices
            .as_ref()?
            .first()?
            .delta
            .as_ref()?
            .content
            .as_deref()
    }
}

pub struct OpenAiCompatAdapter {
    config: OpenAiCompatConfig,
    client: reqwest::Client,
}

impl OpenAiCompatAdapter {
    pub fn new(config: OpenAiCompatConfig) -> Result<Self, PlanError> {
        let client = crate::providers::build_http_client(std::time::Duration::from_secs(
            config.connect_timeout,
        ))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatAdapter {
    fn id(&self) -> &str {
        &self.config.provider_id
    }

    async fn open_stream(&self, request: &PlanRequest) -> Result<RawChunkStream, PlanError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let mut messages = Vec::new();
        if let Some(instructions) = &request.instructions {
            messages.push(serde_json::json!({ "role": "system", "content": instructions }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": request.prompt }));

        let mut builder = self.client.post(&url).json(&serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": true,
        }));
        if !self.config.api_key.expose_secret().is_empty() {
            builder = builder.bearer_auth(self.config.api_key.expose_secret());
        }

        let response = builder.send().await.map_err(map_send_error)?;
        let response = error_for_status(self.id(), response).await?;

        let provider_id = self.config.provider_id.clone();
        let mut events = response.bytes_stream().eventsource();
        let out = async_stream::stream! {
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(ev) => ev,
                    Err(e) => {
                        yield Err(PlanError::StreamError(format!(
                            "SSE stream error ({provider_id}): {e}"
                        )));
                        return;
                    }
                };
                let data = event.data.trim();
                if data.is_empty() {
                    continue;
                }
                if data == "[DONE]" {
                    return;
                }
                let chunk: ChatCompletionChunk = match serde_json::from_str(data) {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(PlanError::ParseError(format!(
                            "Failed to parse SSE JSON ({provider_id}): {e}"
                        )));
                        return;
                    }
                };
                if let Some(text) = chunk.text()
                    && !text.is_empty()
                {
                    yield Ok(text.to_string());
                }
            }
        };
        Ok(Box::pin(out))
    }
}
