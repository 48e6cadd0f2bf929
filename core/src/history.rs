use tracing::debug;

use crate::conversation::Conversation;

/// Default number of conversations retained.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Saved conversations, newest first, never longer than `limit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHistory {
    conversations: Vec<Conversation>,
    limit: usize,
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl ChatHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            conversations: Vec::new(),
            limit,
        }
    }

    /// Build from an already ordered list, dropping anything past `limit`.
    pub fn from_conversations(mut conversations: Vec<Conversation>, limit: usize) -> Self {
        conversations.truncate(limit);
        Self {
            conversations,
            limit,
        }
    }

    /// Replace the entry with the same id in place, or insert at the front.
    ///
    /// Inserting past the limit evicts the oldest entry.
    pub fn upsert(&mut self, conversation: Conversation) {
        if let Some(existing) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation.id)
        {
            *existing = conversation;
            return;
        }

        self.conversations.insert(0, conversation);
        if self.conversations.len() > self.limit {
            let evicted = self.conversations.len() - self.limit;
            self.conversations.truncate(self.limit);
            debug!("History at capacity, evicted {} oldest conversation(s)", evicted);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Conversation at a zero-based position in display order
    pub fn get_index(&self, index: usize) -> Option<&Conversation> {
        self.conversations.get(index)
    }

    pub fn remove(&mut self, id: &str) -> Option<Conversation> {
        let position = self.conversations.iter().position(|c| c.id == id)?;
        Some(self.conversations.remove(position))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.iter()
    }

    pub fn as_slice(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
