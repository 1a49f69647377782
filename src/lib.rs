//! pocketchat - chat client library with durable local conversation history
//!
//! This library provides the conversation history index, per-conversation
//! message logs over a key-value store, and a streaming chat client that
//! keeps both in step.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `storage`: Key-value store abstraction with `sled` and in-memory backends
//! - `history`: Conversation summaries, message logs and the history index
//! - `providers`: Streaming chat provider abstraction (data stream, Ollama)
//! - `chat`: Chat client, conversation session and landing helpers
//! - `commands`: Terminal front-end command handlers
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use pocketchat::chat::{start_new_chat, ConversationSession};
//! use pocketchat::history::ChatHistory;
//! use pocketchat::providers::create_provider;
//! use pocketchat::storage::{KeyValueStore, SledStore};
//! use pocketchat::Config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let store: Arc<dyn KeyValueStore> = Arc::new(SledStore::open_default()?);
//!     let mut history = ChatHistory::new(Arc::clone(&store));
//!     history.load().await;
//!
//!     if let Some(summary) = start_new_chat(&mut history, "Hello!").await {
//!         let provider = create_provider(&config.provider, None)?;
//!         let mut session = ConversationSession::open(summary.id, store, provider).await;
//!         session.bootstrap(&mut history, |delta| print!("{}", delta)).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod providers;
pub mod storage;

// Re-export commonly used types
pub use chat::{ChatClient, ConversationSession};
pub use config::Config;
pub use error::{PocketchatError, Result};
pub use history::{ChatHistory, ConversationSummary, Message, MessageLog, Role};
pub use storage::{KeyValueStore, MemoryStore, SledStore};

#[cfg(test)]
pub mod test_utils;
