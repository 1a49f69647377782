//! Streaming chat client
//!
//! [`ChatClient`] holds the live message sequence of one conversation, the
//! draft input and the error slot, and drives a [`Provider`] to produce
//! assistant replies.

use crate::error::{PocketchatError, Result};
use crate::history::Message;
use crate::providers::Provider;
use futures::StreamExt;
use std::sync::Arc;

/// Result of [`ChatClient::stage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staged {
    /// The draft was appended as a new user message
    Appended,
    /// The last message is an unanswered user message and will be answered
    Pending,
}

/// Live state of one conversation's chat
pub struct ChatClient {
    provider: Arc<dyn Provider>,
    conversation_id: String,
    messages: Vec<Message>,
    input: String,
    error: Option<String>,
}

impl ChatClient {
    /// Create a client for `conversation_id` starting from `initial_messages`
    pub fn new(
        provider: Arc<dyn Provider>,
        conversation_id: impl Into<String>,
        initial_messages: Vec<Message>,
    ) -> Self {
        Self {
            provider,
            conversation_id: conversation_id.into(),
            messages: initial_messages,
            input: String::new(),
            error: None,
        }
    }

    /// Conversation this client talks about
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Name of the provider producing replies
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Live message sequence
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current draft text
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replace the draft text
    pub fn handle_input_change(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Text of the last failed reply, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Forget the last failure
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Whether the last message still waits for an assistant reply
    pub fn is_generating(&self) -> bool {
        self.messages.last().map(Message::is_user).unwrap_or(false)
    }

    /// Prepare the message sequence for a reply
    ///
    /// A non-blank draft becomes a new user message and the draft is cleared.
    /// With a blank draft, an unanswered trailing user message is reused.
    ///
    /// # Errors
    ///
    /// Returns `PocketchatError::NothingToSubmit` if there is neither a draft
    /// nor a pending user message
    pub fn stage(&mut self) -> Result<Staged> {
        let draft = self.input.trim();
        if !draft.is_empty() {
            let message = Message::user(draft);
            self.messages.push(message);
            self.input.clear();
            return Ok(Staged::Appended);
        }

        if self.is_generating() {
            return Ok(Staged::Pending);
        }

        Err(PocketchatError::NothingToSubmit.into())
    }

    /// Stream the assistant reply to the current sequence
    ///
    /// The reply is appended as an assistant message that grows with each
    /// delta; `on_delta` sees every delta as it arrives. The finished message
    /// is returned once the stream completes.
    ///
    /// # Errors
    ///
    /// Returns the provider or stream error. The partial assistant message is
    /// removed and the error text is kept in the error slot. An empty reply
    /// counts as a stream error.
    pub async fn stream_reply<F>(&mut self, mut on_delta: F) -> Result<Message>
    where
        F: FnMut(&str) + Send,
    {
        self.error = None;
        let provider = Arc::clone(&self.provider);

        let started = provider
            .stream_chat(&self.conversation_id, &self.messages)
            .await;
        let mut stream = match started {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail(e)),
        };

        self.messages.push(Message::assistant(String::new()));
        let index = self.messages.len() - 1;

        while let Some(item) = stream.next().await {
            match item {
                Ok(delta) => {
                    self.messages[index].content.push_str(&delta);
                    on_delta(&delta);
                }
                Err(e) => {
                    self.messages.truncate(index);
                    return Err(self.fail(e));
                }
            }
        }

        if self.messages[index].content.is_empty() {
            self.messages.truncate(index);
            let e = PocketchatError::Stream("The model returned an empty reply".to_string());
            return Err(self.fail(e.into()));
        }

        let reply = self.messages[index].clone();
        tracing::debug!(
            conversation_id = %self.conversation_id,
            chars = reply.content.chars().count(),
            "Assistant reply complete"
        );
        Ok(reply)
    }

    /// Stage the draft and stream the reply
    ///
    /// # Errors
    ///
    /// Returns the error of [`ChatClient::stage`] or [`ChatClient::stream_reply`]
    pub async fn submit<F>(&mut self, on_delta: F) -> Result<Message>
    where
        F: FnMut(&str) + Send,
    {
        self.stage()?;
        self.stream_reply(on_delta).await
    }

    fn fail(&mut self, error: anyhow::Error) -> anyhow::Error {
        tracing::warn!(conversation_id = %self.conversation_id, "Chat request failed: {:#}", error);
        self.error = Some(error.to_string());
        error
    }
}
