//! Append-only message list with a revision counter bumped on every mutation.

use crate::message::ChatMessage;

/// Whether a sender label belongs above `list[index]`.
///
/// Shown only for other people's messages that start a run: the first message, or one whose
/// predecessor has a different sender id or is the local user's own.
pub fn show_sender(list: &[ChatMessage], index: usize) -> bool {
    let Some(msg) = list.get(index) else {
        return false;
    };
    if msg.is_own {
        return false;
    }
    match index.checked_sub(1).and_then(|i| list.get(i)) {
        None => true,
        Some(prev) => prev.sender.id != msg.sender.id || prev.is_own,
    }
}

/// Ordered messages in arrival order. History replaces, everything else appends.
#[derive(Debug, Clone, Default)]
pub struct MessageList {
    messages: Vec<ChatMessage>,
    revision: u64,
}

impl MessageList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all entries and take `history` as the new content.
    pub fn replace(&mut self, history: Vec<ChatMessage>) {
        self.messages = history;
        self.revision += 1;
    }

    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.revision += 1;
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Incremented on each mutation; starts at 0 for a fresh list.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn show_sender(&self, index: usize) -> bool {
        show_sender(&self.messages, index)
    }
}
