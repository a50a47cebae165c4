//! View model for the message list: render records and the auto-scroll anchor.
//!
//! Front-ends draw records only; alignment and labels are decided here, colours and
//! spacing are left to the front-end.

use crate::message_list::MessageList;

/// Text shown when the list is empty.
pub const EMPTY_PLACEHOLDER: &str = "No messages yet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    /// Other participants' messages.
    Start,
    /// The local user's own messages.
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderRecord {
    Placeholder {
        text: String,
    },
    Message {
        id: String,
        text: String,
        sender_label: Option<String>,
        is_own: bool,
        align: Align,
    },
}

impl RenderRecord {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, RenderRecord::Placeholder { .. })
    }
}

/// Render one message of the list.
pub fn render_message(list: &MessageList, index: usize) -> Option<RenderRecord> {
    let msg = list.messages().get(index)?;
    Some(RenderRecord::Message {
        id: msg.id.clone(),
        text: msg.text.clone(),
        sender_label: list.show_sender(index).then(|| msg.sender.name.clone()),
        is_own: msg.is_own,
        align: if msg.is_own { Align::End } else { Align::Start },
    })
}

/// Render the whole list; an empty list yields exactly one placeholder.
pub fn render(list: &MessageList) -> Vec<RenderRecord> {
    if list.is_empty() {
        return vec![RenderRecord::Placeholder {
            text: EMPTY_PLACEHOLDER.to_string(),
        }];
    }
    (0..list.len())
        .filter_map(|i| render_message(list, i))
        .collect()
}

/// Tracks the last list revision the front-end scrolled for.
///
/// `should_scroll` is true once per new revision, regardless of where the user has scrolled.
#[derive(Debug, Default)]
pub struct ScrollAnchor {
    seen: Option<u64>,
}

impl ScrollAnchor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_scroll(&mut self, list: &MessageList) -> bool {
        let rev = list.revision();
        if self.seen == Some(rev) {
            return false;
        }
        self.seen = Some(rev);
        rev > 0
    }
}
