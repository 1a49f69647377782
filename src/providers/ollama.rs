//! Ollama provider implementation for pocketchat
//!
//! Streams replies from a local or remote Ollama server. With `stream: true`
//! Ollama answers `/api/chat` with one JSON object per line; the last object
//! carries `"done": true`.

use super::base::{decode_text_stream, LineOutcome, Provider, TextStream};
use crate::config::OllamaConfig;
use crate::error::{PocketchatError, Result};
use crate::history::Message;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ollama API provider
///
/// # Examples
///
/// ```
/// use pocketchat::config::OllamaConfig;
/// use pocketchat::providers::OllamaProvider;
/// use std::time::Duration;
///
/// let config = OllamaConfig {
///     host: "http://localhost:11434".to_string(),
///     model: "llama3.2:latest".to_string(),
/// };
/// let provider = OllamaProvider::new(config, Duration::from_secs(120)).unwrap();
/// assert_eq!(provider.model(), "llama3.2:latest");
/// ```
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

/// Request structure for Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

/// Message structure for Ollama API
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
}

/// One line of a streamed Ollama chat response
#[derive(Debug, Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaProvider {
    /// Create a new Ollama provider instance
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: OllamaConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pocketchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                PocketchatError::Provider(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!(
            "Initialized Ollama provider: host={}, model={}",
            config.host,
            config.model
        );

        Ok(Self { client, config })
    }

    /// Get the configured Ollama host
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Get the configured model name
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .filter(|m| !m.content.is_empty())
            .map(|m| OllamaMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect()
    }
}

fn chunk_outcome(line: &str) -> Result<LineOutcome> {
    let chunk: OllamaChunk = serde_json::from_str(line).map_err(|e| {
        PocketchatError::Stream(format!("Failed to parse Ollama chunk: {}", e))
    })?;

    if let Some(error) = chunk.error {
        return Err(PocketchatError::Stream(error).into());
    }

    let text = chunk.message.map(|m| m.content).unwrap_or_default();
    match (text.is_empty(), chunk.done) {
        (false, _) => Ok(LineOutcome::Text(text)),
        (true, true) => Ok(LineOutcome::Done),
        (true, false) => Ok(LineOutcome::Skip),
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn stream_chat(
        &self,
        conversation_id: &str,
        messages: &[Message],
    ) -> Result<TextStream> {
        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));
        let request = OllamaRequest {
            model: self.config.model.clone(),
            messages: self.convert_messages(messages),
            stream: true,
        };

        tracing::debug!(
            conversation_id,
            "Sending Ollama request: {} messages",
            request.messages.len()
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Ollama request failed: {}", e);
                PocketchatError::Provider(format!("Ollama request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Ollama returned error {}: {}", status, error_text);
            return Err(PocketchatError::Provider(format!(
                "Ollama returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        Ok(decode_text_stream(response.bytes_stream(), chunk_outcome))
    }
}
