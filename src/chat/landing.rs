//! Landing: starting new conversations

use crate::history::{now_millis, ChatHistory, ConversationSummary};

/// A canned first message offered on the landing screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickIdea {
    /// Short label
    pub title: &'static str,
    /// Message sent when the idea is picked
    pub prompt: &'static str,
}

/// Built-in quick-start ideas, in display order
pub const QUICK_IDEAS: [QuickIdea; 4] = [
    QuickIdea {
        title: "Creative Writing",
        prompt: "Help me write a short story about a robot discovering emotions.",
    },
    QuickIdea {
        title: "Recipe Ideas",
        prompt: "Suggest a healthy dinner recipe using chicken, broccoli, and rice.",
    },
    QuickIdea {
        title: "Brainstorm",
        prompt: "Help me brainstorm ideas for my science project about renewable energy.",
    },
    QuickIdea {
        title: "Language Helper",
        prompt: "Translate 'I would like to learn your language' to Spanish, French, and Japanese.",
    },
];

/// Look up a quick idea by its 1-based position
pub fn quick_idea(number: usize) -> Option<&'static QuickIdea> {
    number.checked_sub(1).and_then(|i| QUICK_IDEAS.get(i))
}

/// Id for a new conversation
///
/// The current time in milliseconds, moved forward until no listed
/// conversation uses it.
pub fn new_conversation_id(history: &ChatHistory) -> String {
    let mut candidate = now_millis();
    while history.contains(&candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}

/// Start a conversation from `initial_message`
///
/// Surrounding whitespace is trimmed. A blank message starts nothing and
/// returns `None`.
///
/// # Examples
///
/// ```
/// use pocketchat::chat::start_new_chat;
/// use pocketchat::history::ChatHistory;
/// use pocketchat::storage::MemoryStore;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let mut history = ChatHistory::new(Arc::new(MemoryStore::new()));
/// assert!(start_new_chat(&mut history, "   ").await.is_none());
///
/// let summary = start_new_chat(&mut history, " Plan a trip to Lisbon ").await.unwrap();
/// assert_eq!(summary.title, "Plan a trip to Lisbon");
/// assert_eq!(history.len(), 1);
/// # });
/// ```
pub async fn start_new_chat(
    history: &mut ChatHistory,
    initial_message: &str,
) -> Option<ConversationSummary> {
    let message = initial_message.trim();
    if message.is_empty() {
        tracing::debug!("Ignoring empty initial message");
        return None;
    }

    let conversation_id = new_conversation_id(history);
    Some(history.create(&conversation_id, message).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{Role, PLACEHOLDER_PREVIEW};
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_quick_idea_lookup_is_one_based() {
        assert_eq!(quick_idea(1).unwrap().title, "Creative Writing");
        assert_eq!(quick_idea(4).unwrap().title, "Language Helper");
        assert!(quick_idea(0).is_none());
        assert!(quick_idea(5).is_none());
    }

    #[tokio::test]
    async fn test_start_new_chat_writes_log_and_summary() {
        let mut history = ChatHistory::new(Arc::new(MemoryStore::new()));
        let summary = start_new_chat(&mut history, QUICK_IDEAS[1].prompt)
            .await
            .unwrap();

        assert_eq!(summary.title, "Suggest a healthy dinner ...");
        assert_eq!(summary.preview, PLACEHOLDER_PREVIEW);

        let messages = history.message_log().load(&summary.id).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert!(messages[0].id.starts_with("user-"));
    }

    #[tokio::test]
    async fn test_ids_stay_unique_within_same_millisecond() {
        let mut history = ChatHistory::new(Arc::new(MemoryStore::new()));
        let a = start_new_chat(&mut history, "one").await.unwrap();
        let b = start_new_chat(&mut history, "two").await.unwrap();
        let c = start_new_chat(&mut history, "three").await.unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
        assert_ne!(a.id, c.id);
        assert_eq!(history.summaries()[0].id, c.id);
    }

    #[tokio::test]
    async fn test_blank_message_creates_nothing() {
        let mut history = ChatHistory::new(Arc::new(MemoryStore::new()));
        assert!(start_new_chat(&mut history, "\n\t ").await.is_none());
        assert!(history.is_empty());
    }
}
