//! Ollama streaming adapter
//!
//! Ollama streams newline-delimited JSON from `/api/chat`; content deltas
//! live in `message.content` and `done: true` closes the stream. The byte
//! stream is routed through line-delimited framing for consistent UTF-8
//! handling.

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use serde::Deserialize;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

use crate::error::PlanError;
use crate::providers::{PlanRequest, ProviderAdapter, error_for_status, map_send_error};
use crate::streaming::RawChunkStream;

/// Ollama configuration parameters. No API key: Ollama is a local daemon.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    /// Connect timeout in seconds
    pub connect_timeout: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            connect_timeout: 30,
        }
    }
}

impl OllamaConfig {
    pub fn new() -> Self {
        Self::default()
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

/// Ollama stream chunk structure
#[derive(Debug, Deserialize)]
struct OllamaStreamChunk {
    message: Option<OllamaMessage>,
    done: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: Option<String>,
}

pub struct OllamaAdapter {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaAdapter {
    pub fn new(config: OllamaConfig) -> Result<Self, PlanError> {
        let client = crate::providers::build_http_client(std::time::Duration::from_secs(
            config.connect_timeout,
        ))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn id(&self) -> &str {
        "ollama"
    }

    async fn open_stream(&self, request: &PlanRequest) -> Result<RawChunkStream, PlanError> {
        let url = format!("{}/api/chat", self.config.base_url);

        let mut messages = Vec::new();
        if let Some(instructions) = &request.instructions {
            messages.push(serde_json::json!({ "role": "system", "content": instructions }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": request.prompt }));

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "model": self.config.model,
                "messages": messages,
                "stream": true,
            }))
            .send()
            .await
            .map_err(map_send_error)?;
        let response = error_for_status(self.id(), response).await?;

        let byte_stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::other(format!("Stream error: {e}")));
        let reader = StreamReader::new(byte_stream);
        let mut lines = FramedRead::new(reader, LinesCodec::new());

        let out = async_stream::stream! {
            while let Some(line) = lines.next().await {
                let line = match line {
                    Ok(l) => l,
                    Err(e) => {
                        yield Err(PlanError::StreamError(format!("JSON line error (ollama): {e}")));
                        return;
                    }
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let chunk: OllamaStreamChunk = match serde_json::from_str(trimmed) {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(PlanError::ParseError(format!(
                            "Failed to parse Ollama JSON: {e}"
                        )));
                        return;
                    }
                };
                if let Some(content) = chunk.message.as_ref().and_then(|m| m.content.as_ref())
                    && !content.is_empty()
                {
                    yield Ok(content.clone());
                }
                if chunk.done == Some(true) {
                    return;
                }
            }
        };
        Ok(Box::pin(out))
    }
}
