//! Chat messages as the client holds them, plus id generation for outgoing ones.

use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// Sender identity as carried on the wire (`{ id, name }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: String,
    pub name: String,
}

impl From<&Session> for Sender {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id().to_string(),
            name: session.name().to_string(),
        }
    }
}

/// Wire shape of a message: `{ id, text, sender: { id, name } }`. Ownership is never transmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub id: String,
    pub text: String,
    pub sender: Sender,
}

/// A message in the local list. `is_own` is derived locally and never trusted from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub is_own: bool,
}

impl ChatMessage {
    /// Build a local message from a wire message, comparing the sender id to the local user id.
    pub fn from_wire(wire: WireMessage, local_user_id: &str) -> Self {
        let is_own = wire.sender.id == local_user_id;
        Self {
            id: wire.id,
            text: wire.text,
            sender: wire.sender,
            is_own,
        }
    }

    pub fn to_wire(&self) -> WireMessage {
        WireMessage {
            id: self.id.clone(),
            text: self.text.clone(),
            sender: self.sender.clone(),
        }
    }
}

/// Hands out millisecond-timestamp ids that never repeat within one generator.
///
/// Two requests in the same millisecond get `previous + 1`, so ids stay unique and ordered.
#[derive(Debug, Default)]
pub struct MessageIdGenerator {
    last: AtomicI64,
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        self.next_at(chrono::Utc::now().timestamp_millis())
    }

    fn next_at(&self, now_ms: i64) -> String {
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now_ms.max(prev + 1);
            match self
                .last
                .compare_exchange(prev, candidate, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return candidate.to_string(),
                Err(actual) => prev = actual,
            }
        }
    }
}
