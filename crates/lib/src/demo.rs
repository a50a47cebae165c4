//! Offline demo chat: local echo on send and random sample messages on demand.

use crate::message::{ChatMessage, MessageIdGenerator, Sender};
use crate::message_list::MessageList;
use crate::render::{self, RenderRecord};
use rand::seq::SliceRandom;
use rand::Rng;

pub const SAMPLE_USERS: [&str; 4] = ["Kim Cheolsu", "Lee Younghee", "Park Minsu", "Jung Sujin"];

pub const SAMPLE_TEXTS: [&str; 5] = [
    "Hello!",
    "Nice weather today.",
    "How is the project going?",
    "Could you set up a meeting time?",
    "That's a great idea!",
];

/// Demo chat seeded from the thread-local rng.
pub type DemoChat = LocalChat<rand::rngs::ThreadRng>;

/// Mock variant of the chat view. Nothing leaves the process.
pub struct LocalChat<R: Rng> {
    name: String,
    list: MessageList,
    composer: String,
    ids: MessageIdGenerator,
    rng: R,
}

impl LocalChat<rand::rngs::ThreadRng> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_rng(name, rand::thread_rng())
    }
}

impl<R: Rng> LocalChat<R> {
    pub fn with_rng(name: impl Into<String>, rng: R) -> Self {
        Self {
            name: name.into(),
            list: MessageList::new(),
            composer: String::new(),
            ids: MessageIdGenerator::new(),
            rng,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn messages(&self) -> &MessageList {
        &self.list
    }

    pub fn composer(&self) -> &str {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut String {
        &mut self.composer
    }

    pub fn set_composer(&mut self, text: impl Into<String>) {
        self.composer = text.into();
    }

    /// Append the composer text as an own message and clear it. Blank text is ignored.
    pub fn send(&mut self) -> bool {
        if self.composer.trim().is_empty() {
            return false;
        }
        let text = std::mem::take(&mut self.composer);
        self.list.append(ChatMessage {
            id: self.ids.next_id(),
            text,
            sender: Sender {
                id: self.name.clone(),
                name: self.name.clone(),
            },
            is_own: true,
        });
        true
    }

    pub fn send_text(&mut self, text: &str) -> bool {
        self.composer = text.to_string();
        self.send()
    }

    /// Append a message from a random sample user with a random sample text.
    pub fn add_sample_message(&mut self) -> &ChatMessage {
        let user = SAMPLE_USERS.choose(&mut self.rng).copied().unwrap_or(SAMPLE_USERS[0]);
        let text = SAMPLE_TEXTS.choose(&mut self.rng).copied().unwrap_or(SAMPLE_TEXTS[0]);
        self.list.append(ChatMessage {
            id: self.ids.next_id(),
            text: text.to_string(),
            sender: Sender {
                id: user.to_string(),
                name: user.to_string(),
            },
            is_own: false,
        });
        &self.list.messages()[self.list.len() - 1]
    }

    pub fn render(&self) -> Vec<RenderRecord> {
        render::render(&self.list)
    }
}
