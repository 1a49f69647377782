//! Key-value storage for chat history
//!
//! Everything pocketchat persists is a JSON string stored under a string key.
//! The [`KeyValueStore`] trait is the only seam between the history logic and
//! the backing store, so tests can swap the embedded `sled` database for an
//! in-memory map.

use crate::error::Result;
use async_trait::async_trait;

pub mod memory;
pub mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

/// Key holding the serialized conversation summary list
pub const HISTORY_KEY: &str = "chatHistory";

const MESSAGES_PREFIX: &str = "chat_";
const MESSAGES_SUFFIX: &str = "_messages";
const SUBMITTED_SUFFIX: &str = "_submitted";

/// Key holding the serialized message log of one conversation
///
/// # Examples
///
/// ```
/// use pocketchat::storage::messages_key;
///
/// assert_eq!(messages_key("1712345678901"), "chat_1712345678901_messages");
/// ```
pub fn messages_key(conversation_id: &str) -> String {
    format!("{}{}{}", MESSAGES_PREFIX, conversation_id, MESSAGES_SUFFIX)
}

/// Key holding the id of the last automatically submitted user message
pub fn submitted_key(conversation_id: &str) -> String {
    format!("{}{}{}", MESSAGES_PREFIX, conversation_id, SUBMITTED_SUFFIX)
}

/// Extract the conversation id from a message log key
///
/// Returns `None` for keys that are not message log keys.
///
/// # Examples
///
/// ```
/// use pocketchat::storage::conversation_id_from_messages_key;
///
/// assert_eq!(conversation_id_from_messages_key("chat_42_messages"), Some("42"));
/// assert_eq!(conversation_id_from_messages_key("chatHistory"), None);
/// ```
pub fn conversation_id_from_messages_key(key: &str) -> Option<&str> {
    key.strip_prefix(MESSAGES_PREFIX)?
        .strip_suffix(MESSAGES_SUFFIX)
        .filter(|id| !id.is_empty())
}

/// Asynchronous string-keyed persistent store
///
/// Values are opaque strings; callers serialize to JSON before writing.
/// Implementations must make a successful `set` visible to every later `get`
/// on the same store, including after a process restart for durable stores.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    ///
    /// Returns `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing an absent key is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// List every key currently in the store
    async fn keys(&self) -> Result<Vec<String>>;
}
