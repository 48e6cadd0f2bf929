use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest title kept before the ellipsis marker is appended.
pub const TITLE_MAX_CHARS: usize = 50;

/// Title used while a conversation has no user message.
pub const UNTITLED: &str = "New Chat";

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }
}

/// A single chat turn. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, content)
    }
}

/// An ordered, append-only exchange between the user and the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    messages: Vec<Message>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create an empty conversation with a fresh id
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: UNTITLED.to_string(),
            messages: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Append a message, re-deriving the title and `updated_at`
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.title = derive_title(&self.messages);
        self.updated_at = Utc::now();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent assistant message, if any
    pub fn last_reply(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.sender == Sender::Assistant)
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// Title from the first user message, truncated to [`TITLE_MAX_CHARS`].
pub fn derive_title(messages: &[Message]) -> String {
    match messages.iter().find(|m| m.sender == Sender::User) {
        Some(first) => truncate_title(&first.content),
        None => UNTITLED.to_string(),
    }
}

/// Truncate on character boundaries, appending `...` when anything was cut.
pub fn truncate_title(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Human-friendly age of a timestamp relative to `now`.
pub fn relative_date(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff_ms = (now - timestamp).num_milliseconds().unsigned_abs();
    let day_ms = 24 * 60 * 60 * 1000;
    let days = diff_ms.div_ceil(day_ms);

    match days {
        0 | 1 => "Today".to_string(),
        2 => "Yesterday".to_string(),
        3..=7 => format!("{} days ago", days),
        _ => {
            let date: NaiveDate = timestamp.date_naive();
            date.format("%Y-%m-%d").to_string()
        }
    }
}
