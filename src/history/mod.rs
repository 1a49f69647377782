//! Chat history: conversation summaries and per-conversation message logs
//!
//! - `summary`: the title/preview record shown in list views and its
//!   truncation rules
//! - `messages`: the message model and whole-log persistence
//! - `index`: the owned, persisted list of summaries

pub mod index;
pub mod messages;
pub mod summary;

pub use index::{now_millis, ChatHistory, OrphanReport};
pub use messages::{Message, MessageLog, Role};
pub use summary::{
    derive_preview, derive_title, truncate_with_ellipsis, ConversationSummary,
    PLACEHOLDER_PREVIEW, PREVIEW_MAX_CHARS, TITLE_MAX_CHARS,
};
