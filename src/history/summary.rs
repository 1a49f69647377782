//! Conversation summaries shown in the history list

use serde::{Deserialize, Serialize};

/// Maximum characters of the first user message kept in a title
pub const TITLE_MAX_CHARS: usize = 25;

/// Maximum characters of the first assistant message kept in a preview
pub const PREVIEW_MAX_CHARS: usize = 40;

/// Preview shown until the first assistant response arrives
pub const PLACEHOLDER_PREVIEW: &str = "Start a new conversation";

const ELLIPSIS: &str = "...";

/// Compact representation of a conversation for list views
///
/// Field names match the persisted JSON (`lastUpdated` in camelCase).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Conversation id, also the key into the message log
    pub id: String,
    /// Display title derived from the first user message
    pub title: String,
    /// Milliseconds since the Unix epoch of the last mutation
    pub last_updated: i64,
    /// Display preview derived from the first assistant message
    pub preview: String,
}

impl ConversationSummary {
    /// Summary for a conversation that has not been answered yet
    ///
    /// # Examples
    ///
    /// ```
    /// use pocketchat::history::{ConversationSummary, PLACEHOLDER_PREVIEW};
    ///
    /// let summary = ConversationSummary::new("1", "Explain recursion simply", 0);
    /// assert_eq!(summary.title, "Explain recursion simply");
    /// assert_eq!(summary.preview, PLACEHOLDER_PREVIEW);
    /// ```
    pub fn new(id: impl Into<String>, first_user_message: &str, now_ms: i64) -> Self {
        Self {
            id: id.into(),
            title: derive_title(first_user_message),
            last_updated: now_ms,
            preview: PLACEHOLDER_PREVIEW.to_string(),
        }
    }

    /// Recompute title and preview from the first exchange
    pub fn apply_first_exchange(&mut self, user_message: &str, assistant_message: &str, now_ms: i64) {
        self.title = derive_title(user_message);
        self.preview = derive_preview(assistant_message);
        self.last_updated = now_ms;
    }
}

/// Title for a conversation whose first user message is `text`
pub fn derive_title(text: &str) -> String {
    truncate_with_ellipsis(text, TITLE_MAX_CHARS)
}

/// Preview for a conversation whose first assistant message is `text`
pub fn derive_preview(text: &str) -> String {
    truncate_with_ellipsis(text, PREVIEW_MAX_CHARS)
}

/// Keep the first `max_chars` characters of `text`, appending `...` iff
/// anything was cut
///
/// Counts `char`s, so multi-byte text is never split inside a code point.
///
/// # Examples
///
/// ```
/// use pocketchat::history::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("short", 25), "short");
/// assert_eq!(truncate_with_ellipsis("abcdef", 3), "abc...");
/// ```
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}
