//! Chat API client for the line-oriented data stream protocol
//!
//! The chat endpoint answers a POST of `{ "id", "messages" }` with a body in
//! which every line is `<type>:<json>`:
//!
//! | type | payload | meaning |
//! |------|---------|---------|
//! | `0`  | string  | text delta |
//! | `3`  | string  | error message |
//! | `d`  | object  | finish of the whole message |
//! | other | any    | data, tool, step and annotation parts (ignored) |

use super::base::{decode_text_stream, LineOutcome, Provider, TextStream};
use crate::config::DataStreamConfig;
use crate::error::{PocketchatError, Result};
use crate::history::Message;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// One decoded line of a data stream response
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPart {
    /// Text to append to the assistant message
    Text(String),
    /// The server reported a failure
    Error(String),
    /// The message is complete
    Finish {
        /// Reason reported by the model (`stop`, `length`, ...)
        reason: Option<String>,
    },
    /// A part type that carries no text
    Other(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinishPayload {
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    id: &'a str,
    messages: &'a [Message],
}

/// Parse one line of a data stream response
///
/// # Errors
///
/// Returns `PocketchatError::Stream` if the line has no type prefix or a
/// text/error payload is not a JSON string
///
/// # Examples
///
/// ```
/// use pocketchat::providers::data_stream::{parse_stream_line, StreamPart};
///
/// let part = parse_stream_line(r#"0:"Hello""#).unwrap();
/// assert_eq!(part, StreamPart::Text("Hello".to_string()));
/// ```
pub fn parse_stream_line(line: &str) -> Result<StreamPart> {
    let (code, payload) = line.split_once(':').ok_or_else(|| {
        PocketchatError::Stream(format!("Malformed stream line: {}", line))
    })?;

    let part = match code {
        "0" => StreamPart::Text(parse_string_payload(code, payload)?),
        "3" => StreamPart::Error(parse_string_payload(code, payload)?),
        "d" => {
            let finish: FinishPayload = serde_json::from_str(payload).unwrap_or(FinishPayload {
                finish_reason: None,
            });
            StreamPart::Finish {
                reason: finish.finish_reason,
            }
        }
        other => StreamPart::Other(other.to_string()),
    };
    Ok(part)
}

fn parse_string_payload(code: &str, payload: &str) -> Result<String> {
    serde_json::from_str::<String>(payload).map_err(|e| {
        PocketchatError::Stream(format!("Invalid payload for part {}: {}", code, e)).into()
    })
}

fn line_outcome(line: &str) -> Result<LineOutcome> {
    match parse_stream_line(line)? {
        StreamPart::Text(text) => Ok(LineOutcome::Text(text)),
        StreamPart::Error(message) => Err(PocketchatError::Stream(message).into()),
        StreamPart::Finish { reason } => {
            tracing::debug!(?reason, "Data stream finished");
            Ok(LineOutcome::Done)
        }
        StreamPart::Other(code) => {
            tracing::trace!(code = %code, "Ignoring stream part");
            Ok(LineOutcome::Skip)
        }
    }
}

/// Streams replies from a chat API speaking the data stream protocol
///
/// # Examples
///
/// ```
/// use pocketchat::config::DataStreamConfig;
/// use pocketchat::providers::DataStreamProvider;
/// use std::time::Duration;
///
/// let provider = DataStreamProvider::new(DataStreamConfig::default(), Duration::from_secs(30));
/// assert!(provider.is_ok());
/// ```
pub struct DataStreamProvider {
    client: Client,
    endpoint: Url,
}

impl DataStreamProvider {
    /// Create a provider for the endpoint described by `config`
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint URL is invalid or the HTTP client cannot
    /// be built
    pub fn new(config: DataStreamConfig, timeout: Duration) -> Result<Self> {
        let endpoint = config.endpoint()?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pocketchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                PocketchatError::Provider(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!("Initialized data stream provider: endpoint={}", endpoint);
        Ok(Self { client, endpoint })
    }

    /// The resolved chat endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Provider for DataStreamProvider {
    fn name(&self) -> &str {
        "data_stream"
    }

    async fn stream_chat(
        &self,
        conversation_id: &str,
        messages: &[Message],
    ) -> Result<TextStream> {
        tracing::debug!(
            conversation_id,
            "Sending chat request: {} messages to {}",
            messages.len(),
            self.endpoint
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&ChatRequest {
                id: conversation_id,
                messages,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Chat request failed: {}", e);
                PocketchatError::Provider(format!("Chat request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Chat endpoint returned error {}: {}", status, error_text);
            return Err(PocketchatError::Provider(format!(
                "Chat endpoint returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        Ok(decode_text_stream(response.bytes_stream(), line_outcome))
    }
}
