use std::collections::VecDeque;

use {dashmap::DashMap, parley_common::ChatKey, tracing::debug};

use crate::message::Turn;

/// Per-chat bounded history, shared across request handlers.
///
/// Backed by a sharded map: appends for different chats rarely contend, and
/// no lock is ever held across an `.await`. When a chat exceeds `max_turns`
/// the oldest turns are dropped first.
pub struct ConversationMemory {
    max_turns: usize,
    chats: DashMap<ChatKey, VecDeque<Turn>>,
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            chats: DashMap::new(),
        }
    }

    /// Append a turn, evicting from the front until the bound holds.
    pub fn append(&self, chat: &ChatKey, turn: Turn) {
        let mut history = self.chats.entry(chat.clone()).or_default();
        history.push_back(turn);
        let mut evicted = 0usize;
        while history.len() > self.max_turns {
            history.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            debug!(%chat, evicted, kept = history.len(), "trimmed chat history");
        }
    }

    /// Snapshot of a chat's history, oldest first.
    #[must_use]
    pub fn history(&self, chat: &ChatKey) -> Vec<Turn> {
        self.chats
            .get(chat)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Forget everything about a chat.
    pub fn reset(&self, chat: &ChatKey) {
        if let Some((_, history)) = self.chats.remove(chat) {
            debug!(%chat, dropped = history.len(), "cleared chat history");
        }
    }

    /// Number of chats with stored history.
    #[must_use]
    pub fn chat_count(&self) -> usize {
        self.chats.len()
    }

    /// Drop all history, used at shutdown.
    pub fn clear(&self) {
        let chats = self.chats.len();
        self.chats.clear();
        debug!(chats, "cleared conversation memory");
    }
}
