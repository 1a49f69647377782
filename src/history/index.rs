//! The chat history index: the directory of all conversations
//!
//! [`ChatHistory`] owns the in-memory list of [`ConversationSummary`] values
//! and keeps the copy stored under [`HISTORY_KEY`] in step with it. The
//! in-memory list is the source of truth for rendering. Every mutation rewrites
//! the full persisted list right away, and a failed write is logged and
//! otherwise ignored.

use super::messages::{Message, MessageLog, Role};
use super::summary::ConversationSummary;
use crate::error::Result;
use crate::storage::{conversation_id_from_messages_key, KeyValueStore, HISTORY_KEY};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

/// Current time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Summaries and logs that have lost their counterpart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrphanReport {
    /// Conversation ids listed in the index with no stored message log
    pub summaries_without_log: Vec<String>,
    /// Conversation ids with a stored message log but no index entry
    pub logs_without_summary: Vec<String>,
}

impl OrphanReport {
    /// Whether both stores agree
    pub fn is_clean(&self) -> bool {
        self.summaries_without_log.is_empty() && self.logs_without_summary.is_empty()
    }
}

/// Owned, persisted list of conversation summaries
///
/// # Examples
///
/// ```
/// use pocketchat::history::ChatHistory;
/// use pocketchat::storage::MemoryStore;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let mut history = ChatHistory::new(Arc::new(MemoryStore::new()));
/// history.load().await;
/// history.create("1", "Explain recursion simply").await;
/// assert_eq!(history.summaries()[0].title, "Explain recursion simply");
/// # });
/// ```
pub struct ChatHistory {
    store: Arc<dyn KeyValueStore>,
    log: MessageLog,
    summaries: Vec<ConversationSummary>,
    // Set when the last load could not read the stored index
    unreadable: bool,
}

impl ChatHistory {
    /// Create an empty history backed by `store`
    ///
    /// Nothing is read until [`ChatHistory::load`] is called.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let log = MessageLog::new(Arc::clone(&store));
        Self {
            store,
            log,
            summaries: Vec::new(),
            unreadable: false,
        }
    }

    /// Message log accessor sharing this history's store
    pub fn message_log(&self) -> &MessageLog {
        &self.log
    }

    /// Summaries in display order
    pub fn summaries(&self) -> &[ConversationSummary] {
        &self.summaries
    }

    /// Summary of `conversation_id`, if listed
    pub fn get(&self, conversation_id: &str) -> Option<&ConversationSummary> {
        self.summaries.iter().find(|s| s.id == conversation_id)
    }

    /// Whether `conversation_id` is listed
    pub fn contains(&self, conversation_id: &str) -> bool {
        self.get(conversation_id).is_some()
    }

    /// Number of listed conversations
    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    /// Whether no conversations are listed
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    /// Replace the in-memory list with the stored one, newest first
    ///
    /// An absent record yields an empty list. Read or parse failures are
    /// logged and leave the current in-memory list untouched; until a later
    /// load succeeds, mutations change only the in-memory list and the stored
    /// record is not overwritten.
    pub async fn load(&mut self) {
        match self.read_stored().await {
            Ok(Some(mut summaries)) => {
                summaries.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
                tracing::debug!(count = summaries.len(), "Loaded chat history");
                self.summaries = summaries;
                self.unreadable = false;
            }
            Ok(None) => {
                tracing::debug!("No chat history stored yet");
                self.summaries.clear();
                self.unreadable = false;
            }
            Err(e) => {
                tracing::error!("Failed to load chat history: {:#}", e);
                self.unreadable = true;
            }
        }
    }

    async fn read_stored(&self) -> Result<Option<Vec<ConversationSummary>>> {
        match self.store.get(HISTORY_KEY).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Start a conversation from its first user message
    ///
    /// Writes the initial message log, then prepends the new summary and
    /// rewrites the index. The two writes are independent: a failure of either
    /// is logged and the other still happens.
    pub async fn create(
        &mut self,
        conversation_id: &str,
        initial_user_message: &str,
    ) -> ConversationSummary {
        let now = now_millis();
        let first_message = Message::with_id(
            format!("user-{}", now),
            Role::User,
            initial_user_message,
        );

        if let Err(e) = self.log.save(conversation_id, &[first_message]).await {
            tracing::error!(conversation_id, "Failed to create new chat: {:#}", e);
        }

        let summary = ConversationSummary::new(conversation_id, initial_user_message, now);
        self.summaries.insert(0, summary.clone());
        self.persist().await;

        tracing::info!(conversation_id, "Created conversation");
        summary
    }

    /// Refresh title and preview from the first user/assistant exchange
    ///
    /// Call only when the conversation holds exactly these two messages; later
    /// exchanges never change the summary. The entry keeps its position in the
    /// list. Returns `false` when the id is not listed.
    pub async fn update_after_first_exchange(
        &mut self,
        conversation_id: &str,
        user_message: &str,
        assistant_message: &str,
    ) -> bool {
        let Some(summary) = self.summaries.iter_mut().find(|s| s.id == conversation_id) else {
            tracing::debug!(conversation_id, "No summary to update");
            return false;
        };

        summary.apply_first_exchange(user_message, assistant_message, now_millis());
        self.persist().await;
        true
    }

    /// Remove `conversation_id` from the index
    ///
    /// The conversation's message log is left in the store. Returns whether an
    /// entry was removed.
    pub async fn delete(&mut self, conversation_id: &str) -> bool {
        let before = self.summaries.len();
        self.summaries.retain(|s| s.id != conversation_id);
        let removed = self.summaries.len() != before;

        if removed {
            self.persist().await;
            tracing::info!(conversation_id, "Deleted conversation from history");
        }
        removed
    }

    async fn persist(&self) {
        if self.unreadable {
            tracing::warn!("Stored chat history could not be read, not overwriting it");
            return;
        }
        let result = match serde_json::to_string(&self.summaries) {
            Ok(json) => self.store.set(HISTORY_KEY, &json).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::error!("Failed to save chat history: {:#}", e);
        }
    }

    /// Compare the index against the message logs in the store
    pub async fn find_orphans(&self) -> Result<OrphanReport> {
        let keys = self.store.keys().await?;
        let logged: HashSet<&str> = keys
            .iter()
            .filter_map(|k| conversation_id_from_messages_key(k))
            .collect();
        let listed: HashSet<&str> = self.summaries.iter().map(|s| s.id.as_str()).collect();

        let summaries_without_log = self
            .summaries
            .iter()
            .filter(|s| !logged.contains(s.id.as_str()))
            .map(|s| s.id.clone())
            .collect();

        let mut logs_without_summary: Vec<String> = logged
            .difference(&listed)
            .map(|id| id.to_string())
            .collect();
        logs_without_summary.sort();

        Ok(OrphanReport {
            summaries_without_log,
            logs_without_summary,
        })
    }

    /// Delete the message logs listed in `report.logs_without_summary`
    ///
    /// Ids that gained a summary since the report was taken are skipped.
    /// Returns the number of logs removed.
    pub async fn prune_orphan_logs(&self, report: &OrphanReport) -> Result<usize> {
        let mut removed = 0;
        for id in &report.logs_without_summary {
            if self.contains(id) {
                continue;
            }
            self.log.remove(id).await?;
            self.store.remove(&crate::storage::submitted_key(id)).await?;
            removed += 1;
        }
        Ok(removed)
    }
}
