//! Conversation session: one open conversation bound to its stored log
//!
//! A session loads the message log when opened, drives a [`ChatClient`],
//! rewrites the log after every change to the message sequence and updates
//! the conversation's summary after its first exchange.

use super::client::{ChatClient, Staged};
use crate::error::Result;
use crate::history::{ChatHistory, Message, MessageLog, Role};
use crate::providers::Provider;
use crate::storage::{submitted_key, KeyValueStore};
use std::fmt;
use std::sync::Arc;

/// Where a session is in its request cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No request in flight
    Idle,
    /// The first reply of the conversation is streaming
    AwaitingFirstResponse,
    /// A later reply is streaming
    Generating,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::AwaitingFirstResponse => write!(f, "awaiting first response"),
            SessionState::Generating => write!(f, "generating"),
        }
    }
}

/// Callback told about every [`SessionState`] change
pub type StateObserver = Box<dyn FnMut(SessionState) + Send>;

/// An open conversation
///
/// # Examples
///
/// ```
/// use pocketchat::chat::ConversationSession;
/// use pocketchat::config::ProviderConfig;
/// use pocketchat::providers::create_provider;
/// use pocketchat::storage::{KeyValueStore, MemoryStore};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
/// let provider = create_provider(&ProviderConfig::default(), None)?;
/// let session = ConversationSession::open("1700000000000", store, provider).await;
/// assert!(session.messages().is_empty());
/// # Ok(())
/// # }
/// ```
pub struct ConversationSession {
    conversation_id: String,
    store: Arc<dyn KeyValueStore>,
    log: MessageLog,
    client: ChatClient,
    state: SessionState,
    observer: Option<StateObserver>,
}

impl ConversationSession {
    /// Open `conversation_id`, loading its stored messages
    ///
    /// A missing or unreadable log opens as an empty conversation.
    pub async fn open(
        conversation_id: impl Into<String>,
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn Provider>,
    ) -> Self {
        let conversation_id = conversation_id.into();
        let log = MessageLog::new(Arc::clone(&store));
        let messages = log.load(&conversation_id).await;

        tracing::info!(
            conversation_id = %conversation_id,
            messages = messages.len(),
            "Opened conversation"
        );

        let client = ChatClient::new(provider, conversation_id.clone(), messages);
        Self {
            conversation_id,
            store,
            log,
            client,
            state: SessionState::Idle,
            observer: None,
        }
    }

    /// Report state changes to `observer`
    ///
    /// Replaces any observer set before.
    pub fn on_state_change<F>(&mut self, observer: F)
    where
        F: FnMut(SessionState) + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
    }

    /// Id of the open conversation
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Current request state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Live message sequence
    pub fn messages(&self) -> &[Message] {
        self.client.messages()
    }

    /// Text of the last failed reply, if any
    pub fn error(&self) -> Option<&str> {
        self.client.error()
    }

    /// The underlying chat client
    pub fn client(&self) -> &ChatClient {
        &self.client
    }

    /// Mutable access to the underlying chat client
    pub fn client_mut(&mut self) -> &mut ChatClient {
        &mut self.client
    }

    /// Send `text` and stream the reply
    ///
    /// The new user message is persisted before the request starts. A blank
    /// `text` answers a pending user message instead.
    ///
    /// # Errors
    ///
    /// Returns `NothingToSubmit` when there is nothing to answer, or the
    /// provider/stream error of the reply
    pub async fn send<F>(
        &mut self,
        history: &mut ChatHistory,
        text: &str,
        on_delta: F,
    ) -> Result<Message>
    where
        F: FnMut(&str) + Send,
    {
        self.client.handle_input_change(text);
        if self.client.stage()? == Staged::Appended {
            self.persist().await;
        }
        self.exchange(history, on_delta).await
    }

    /// Answer the pending user message left by the landing screen
    ///
    /// Runs once per pending message: the message id is recorded under the
    /// conversation's submitted key before the request starts, and later
    /// opens that find the same id skip the submission. A failed reply clears
    /// the record so the next open submits the message again. Returns `None`
    /// when nothing was submitted.
    ///
    /// # Errors
    ///
    /// Returns the provider/stream error of the reply
    pub async fn bootstrap<F>(
        &mut self,
        history: &mut ChatHistory,
        on_delta: F,
    ) -> Result<Option<Message>>
    where
        F: FnMut(&str) + Send,
    {
        let pending_id = match self.messages().last() {
            Some(last) if last.role == Role::User => last.id.clone(),
            _ => return Ok(None),
        };

        let gate = submitted_key(&self.conversation_id);
        match self.store.get(&gate).await {
            Ok(Some(submitted)) if submitted == pending_id => {
                tracing::debug!(
                    conversation_id = %self.conversation_id,
                    message_id = %pending_id,
                    "Pending message already submitted, skipping"
                );
                return Ok(None);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(
                    conversation_id = %self.conversation_id,
                    "Failed to read submission marker: {:#}",
                    e
                );
            }
        }

        if let Err(e) = self.store.set(&gate, &pending_id).await {
            tracing::error!(
                conversation_id = %self.conversation_id,
                "Failed to record submission marker: {:#}",
                e
            );
        }

        tracing::info!(
            conversation_id = %self.conversation_id,
            message_id = %pending_id,
            "Submitting pending message"
        );
        let result = self.exchange(history, on_delta).await;
        if result.is_err() {
            if let Err(e) = self.store.remove(&gate).await {
                tracing::error!(
                    conversation_id = %self.conversation_id,
                    "Failed to clear submission marker: {:#}",
                    e
                );
            }
        }
        result.map(Some)
    }

    async fn exchange<F>(&mut self, history: &mut ChatHistory, on_delta: F) -> Result<Message>
    where
        F: FnMut(&str) + Send,
    {
        let first_exchange = !self
            .client
            .messages()
            .iter()
            .any(|m| m.role == Role::Assistant);
        self.set_state(if first_exchange {
            SessionState::AwaitingFirstResponse
        } else {
            SessionState::Generating
        });

        let result = self.client.stream_reply(on_delta).await;
        self.set_state(SessionState::Idle);
        let reply = result?;

        self.persist().await;

        if let [user, assistant] = self.client.messages() {
            history
                .update_after_first_exchange(
                    &self.conversation_id,
                    &user.content,
                    &assistant.content,
                )
                .await;
        }

        Ok(reply)
    }

    fn set_state(&mut self, state: SessionState) {
        tracing::debug!(conversation_id = %self.conversation_id, %state, "Session state");
        self.state = state;
        if let Some(observer) = self.observer.as_mut() {
            observer(state);
        }
    }

    async fn persist(&self) {
        if let Err(e) = self
            .log
            .save(&self.conversation_id, self.client.messages())
            .await
        {
            tracing::error!(
                conversation_id = %self.conversation_id,
                "Failed to save messages: {:#}",
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::test_utils::ScriptedProvider;
    use std::sync::Mutex;

    async fn seeded(prompt: &str) -> (Arc<dyn KeyValueStore>, ChatHistory) {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut history = ChatHistory::new(Arc::clone(&store));
        history.load().await;
        history.create("100", prompt).await;
        (store, history)
    }

    #[tokio::test]
    async fn test_open_loads_stored_log() {
        let (store, _history) = seeded("Hello").await;
        let session =
            ConversationSession::open("100", store, Arc::new(ScriptedProvider::new())).await;
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].content, "Hello");
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_bootstrap_answers_pending_message_and_updates_summary() {
        let (store, mut history) = seeded("Tell me a joke").await;
        let provider = Arc::new(ScriptedProvider::new().with_reply(&["Why did ", "the chicken..."]));
        let mut session = ConversationSession::open("100", Arc::clone(&store), provider).await;

        let reply = session.bootstrap(&mut history, |_| {}).await.unwrap();

        assert_eq!(reply.unwrap().content, "Why did the chicken...");
        assert_eq!(session.state(), SessionState::Idle);

        let stored = history.message_log().load("100").await;
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].role, Role::Assistant);

        let summary = history.get("100").unwrap();
        assert_eq!(summary.title, "Tell me a joke");
        assert_eq!(summary.preview, "Why did the chicken...");
    }

    fn record_states(session: &mut ConversationSession) -> Arc<Mutex<Vec<SessionState>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.on_state_change(move |state| sink.lock().unwrap().push(state));
        seen
    }

    #[tokio::test]
    async fn test_bootstrap_runs_once_per_pending_message() {
        let (store, mut history) = seeded("Hi").await;

        let provider = Arc::new(ScriptedProvider::new().with_reply(&["Hello"]));
        let mut first = ConversationSession::open("100", Arc::clone(&store), provider).await;
        assert!(first.bootstrap(&mut history, |_| {}).await.unwrap().is_some());

        // Same pending message, as if the reply was never saved
        let log = history.message_log().clone();
        log.save("100", &first.messages()[..1]).await.unwrap();

        let provider = Arc::new(ScriptedProvider::new().with_reply(&["unused"]));
        let mut second =
            ConversationSession::open("100", Arc::clone(&store), provider.clone()).await;
        assert!(second.bootstrap(&mut history, |_| {}).await.unwrap().is_none());
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_bootstrap_is_retried_on_next_open() {
        let (store, mut history) = seeded("Explain recursion simply").await;

        let failing = Arc::new(ScriptedProvider::new().with_failure(&[], "offline"));
        let mut first = ConversationSession::open("100", Arc::clone(&store), failing).await;
        assert!(first.bootstrap(&mut history, |_| {}).await.is_err());
        assert_eq!(first.error(), Some("Stream error: offline"));
        assert!(store.get(&submitted_key("100")).await.unwrap().is_none());

        let provider = Arc::new(ScriptedProvider::new().with_reply(&["A function calling itself."]));
        let mut second = ConversationSession::open("100", Arc::clone(&store), provider).await;
        let reply = second.bootstrap(&mut history, |_| {}).await.unwrap();

        assert_eq!(reply.unwrap().content, "A function calling itself.");
        let roles: Vec<Role> = second.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        let summary = history.get("100").unwrap();
        assert_eq!(summary.title, "Explain recursion simply");
        assert_eq!(summary.preview, "A function calling itself.");
    }

    #[tokio::test]
    async fn test_first_exchange_reports_awaiting_first_response() {
        let (store, mut history) = seeded("Hi").await;
        let provider = Arc::new(ScriptedProvider::new().with_reply(&["Hello"]));
        let mut session = ConversationSession::open("100", store, provider).await;
        let seen = record_states(&mut session);

        session.bootstrap(&mut history, |_| {}).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![SessionState::AwaitingFirstResponse, SessionState::Idle]
        );
    }

    #[tokio::test]
    async fn test_later_exchange_reports_generating() {
        let (store, mut history) = seeded("Hi").await;
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_reply(&["Hello"])
                .with_failure(&[], "offline"),
        );
        let mut session = ConversationSession::open("100", store, provider).await;
        session.bootstrap(&mut history, |_| {}).await.unwrap();
        let seen = record_states(&mut session);

        assert!(session.send(&mut history, "More?", |_| {}).await.is_err());

        assert_eq!(
            *seen.lock().unwrap(),
            vec![SessionState::Generating, SessionState::Idle]
        );
    }

    #[tokio::test]
    async fn test_bootstrap_skips_answered_conversation() {
        let (store, mut history) = seeded("Hi").await;
        let log = history.message_log().clone();
        log.save(
            "100",
            &[
                Message::with_id("user-1", Role::User, "Hi"),
                Message::with_id("a-1", Role::Assistant, "Hello"),
            ],
        )
        .await
        .unwrap();

        let provider = Arc::new(ScriptedProvider::new());
        let mut session = ConversationSession::open("100", store, provider.clone()).await;
        assert!(session.bootstrap(&mut history, |_| {}).await.unwrap().is_none());
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_later_exchange_leaves_summary_alone() {
        let (store, mut history) = seeded("First question").await;
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_reply(&["First answer"])
                .with_reply(&["Second answer"]),
        );
        let mut session = ConversationSession::open("100", store, provider).await;
        session.bootstrap(&mut history, |_| {}).await.unwrap();
        let after_first = history.get("100").unwrap().clone();

        let reply = session
            .send(&mut history, "Second question", |_| {})
            .await
            .unwrap();

        assert_eq!(reply.content, "Second answer");
        assert_eq!(session.messages().len(), 4);
        assert_eq!(history.get("100").unwrap(), &after_first);
        assert_eq!(history.message_log().load("100").await.len(), 4);
    }

    #[tokio::test]
    async fn test_failed_send_keeps_user_message_only() {
        let (store, mut history) = seeded("Hi").await;
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_reply(&["Hello"])
                .with_failure(&["par"], "server exploded"),
        );
        let mut session = ConversationSession::open("100", store, provider).await;
        session.bootstrap(&mut history, |_| {}).await.unwrap();

        let result = session.send(&mut history, "And then?", |_| {}).await;

        assert!(result.is_err());
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.error(), Some("Stream error: server exploded"));
        let stored = history.message_log().load("100").await;
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[2].content, "And then?");
    }

    #[tokio::test]
    async fn test_send_blank_without_pending_message() {
        let (store, mut history) = seeded("Hi").await;
        let provider = Arc::new(ScriptedProvider::new().with_reply(&["Hello"]));
        let mut session = ConversationSession::open("100", store, provider).await;
        session.bootstrap(&mut history, |_| {}).await.unwrap();

        assert!(session.send(&mut history, "   ", |_| {}).await.is_err());
        assert_eq!(session.messages().len(), 2);
    }
}
