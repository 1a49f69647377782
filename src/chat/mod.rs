//! Chat components
//!
//! - `client`: the streaming chat client with its draft and error slot
//! - `session`: an open conversation bound to its stored message log
//! - `landing`: quick ideas and starting new conversations

pub mod client;
pub mod landing;
pub mod session;

pub use client::{ChatClient, Staged};
pub use landing::{new_conversation_id, quick_idea, start_new_chat, QuickIdea, QUICK_IDEAS};
pub use session::{ConversationSession, SessionState, StateObserver};
