//! Per-conversation message logs

use crate::error::Result;
use crate::storage::{messages_key, KeyValueStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the person using the app
    User,
    /// Produced by the model
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry in a conversation's message log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Identifier unique within the conversation
    pub id: String,
    /// Author of the message
    pub role: Role,
    /// Plain-text (markdown) body
    pub content: String,
    /// Creation time; absent on records written by older clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Creates a new user message with a random id
    ///
    /// # Examples
    ///
    /// ```
    /// use pocketchat::history::{Message, Role};
    ///
    /// let msg = Message::user("Hello, assistant!");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Creates a new assistant message with a random id
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Creates a message with an explicit id
    pub fn with_id(id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            created_at: Some(Utc::now()),
        }
    }

    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().simple().to_string(), role, content)
    }

    /// Whether the message was written by the user
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Reads and rewrites whole message logs in a [`KeyValueStore`]
///
/// The log is never appended to in place: every save serializes the full
/// sequence and replaces the stored value.
#[derive(Clone)]
pub struct MessageLog {
    store: Arc<dyn KeyValueStore>,
}

impl MessageLog {
    /// Create a log accessor over `store`
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the messages of `conversation_id`
    ///
    /// Returns an empty sequence when nothing is stored. Read and parse
    /// failures are logged and also yield an empty sequence.
    pub async fn load(&self, conversation_id: &str) -> Vec<Message> {
        match self.try_load(conversation_id).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::error!(conversation_id, "Failed to load chat messages: {:#}", e);
                Vec::new()
            }
        }
    }

    /// Load the messages of `conversation_id`, reporting failures
    ///
    /// Returns an empty sequence when no log exists for the id.
    pub async fn try_load(&self, conversation_id: &str) -> Result<Vec<Message>> {
        match self.store.get(&messages_key(conversation_id)).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Whether a log record exists for `conversation_id`
    pub async fn exists(&self, conversation_id: &str) -> Result<bool> {
        Ok(self.store.get(&messages_key(conversation_id)).await?.is_some())
    }

    /// Replace the stored log of `conversation_id` with `messages`
    pub async fn save(&self, conversation_id: &str, messages: &[Message]) -> Result<()> {
        let json = serde_json::to_string(messages)?;
        self.store.set(&messages_key(conversation_id), &json).await?;
        tracing::debug!(conversation_id, count = messages.len(), "Saved message log");
        Ok(())
    }

    /// Delete the stored log of `conversation_id`
    pub async fn remove(&self, conversation_id: &str) -> Result<()> {
        self.store.remove(&messages_key(conversation_id)).await
    }
}
