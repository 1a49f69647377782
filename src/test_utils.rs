//! Test utilities for pocketchat
//!
//! This module provides temporary directory helpers, a store whose every
//! operation fails, and a provider that replays scripted replies.

use crate::error::{PocketchatError, Result};
use crate::history::Message;
use crate::providers::{Provider, TextStream};
use crate::storage::KeyValueStore;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

/// Create a temporary directory for testing
///
/// # Returns
///
/// Returns a TempDir that will be cleaned up when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error's message contains `expected`
///
/// # Panics
///
/// Panics if the result is Ok or the message does not match
pub fn assert_error_contains<T>(result: Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// A key-value store that is always unavailable
pub struct FailingStore;

impl FailingStore {
    fn unavailable(op: &str) -> anyhow::Error {
        PocketchatError::Storage(format!("{} failed: store unavailable", op)).into()
    }
}

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(Self::unavailable("get"))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(Self::unavailable("set"))
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        Err(Self::unavailable("remove"))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Err(Self::unavailable("keys"))
    }
}

struct ScriptedReply {
    deltas: Vec<String>,
    failure: Option<String>,
}

/// Provider that answers each request with the next scripted reply
///
/// Requests beyond the script fail with a provider error. Every request is
/// recorded for inspection.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<(String, Vec<Message>)>>,
}

impl ScriptedProvider {
    /// A provider with an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply made of `deltas`
    pub fn with_reply(self, deltas: &[&str]) -> Self {
        self.push(deltas, None)
    }

    /// Queue a reply that streams `deltas` and then fails with `message`
    pub fn with_failure(self, deltas: &[&str], message: &str) -> Self {
        self.push(deltas, Some(message.to_string()))
    }

    fn push(self, deltas: &[&str], failure: Option<String>) -> Self {
        self.replies
            .lock()
            .expect("script lock poisoned")
            .push_back(ScriptedReply {
                deltas: deltas.iter().map(|d| d.to_string()).collect(),
                failure,
            });
        self
    }

    /// Conversation id and messages of every request so far
    pub fn requests(&self) -> Vec<(String, Vec<Message>)> {
        self.requests.lock().expect("request lock poisoned").clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream_chat(
        &self,
        conversation_id: &str,
        messages: &[Message],
    ) -> Result<TextStream> {
        self.requests
            .lock()
            .expect("request lock poisoned")
            .push((conversation_id.to_string(), messages.to_vec()));

        let reply = self
            .replies
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .ok_or_else(|| PocketchatError::Provider("No scripted reply left".to_string()))?;

        let mut items: Vec<Result<String>> = reply.deltas.into_iter().map(Ok).collect();
        if let Some(message) = reply.failure {
            items.push(Err(PocketchatError::Stream(message).into()));
        }
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "test.txt", "content");
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "content");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        assert_error_contains(Ok(()), "error");
    }

    #[tokio::test]
    async fn test_failing_store_fails_everything() {
        let store = FailingStore;
        assert_error_contains(store.get("k").await, "store unavailable");
        assert_error_contains(store.set("k", "v").await, "store unavailable");
        assert_error_contains(store.keys().await, "store unavailable");
    }

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::new()
            .with_reply(&["a", "b"])
            .with_failure(&["c"], "boom");

        let first: Vec<Result<String>> = provider.stream_chat("1", &[]).await.unwrap().collect().await;
        assert_eq!(first.len(), 2);

        let second: Vec<Result<String>> = provider.stream_chat("1", &[]).await.unwrap().collect().await;
        assert!(second[1].is_err());

        assert_error_contains(provider.stream_chat("1", &[]).await.map(|_| ()), "No scripted reply");
        assert_eq!(provider.requests().len(), 3);
    }
}
