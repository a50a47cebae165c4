//! Networked chat view: owns the session, the message list, the composer and one connection.
//!
//! Sent messages are not shown until the server echoes them back as `receive_message`.

use crate::message::{ChatMessage, MessageIdGenerator, Sender, WireMessage};
use crate::message_list::MessageList;
use crate::render::{self, RenderRecord};
use crate::session::{Session, SessionStore};
use crate::transport::{ChatTransport, ClientEvent, ServerEvent, TransportError, WsConnection};

#[derive(Debug, thiserror::Error)]
pub enum MountError {
    /// No usable session; the front-end goes back to the entry view.
    #[error("no session; redirect to the entry view")]
    NoSession,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Effect of one inbound event on the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    /// History snapshot replaced everything.
    Replaced,
    /// One message appended at this index.
    Appended(usize),
}

pub struct ChatView<T: ChatTransport> {
    session: Session,
    list: MessageList,
    composer: String,
    transport: Option<T>,
    ids: MessageIdGenerator,
}

impl<T: ChatTransport> ChatView<T> {
    pub fn new(session: Session, transport: T) -> Self {
        Self {
            session,
            list: MessageList::new(),
            composer: String::new(),
            transport: Some(transport),
            ids: MessageIdGenerator::new(),
        }
    }

    /// Read the session from `store` and open the connection with `connect`.
    /// Without a session nothing is connected and [`MountError::NoSession`] is returned.
    pub fn mount_with<F>(store: &SessionStore, connect: F) -> Result<Self, MountError>
    where
        F: FnOnce(&Session) -> Result<T, TransportError>,
    {
        let session = store.load().ok_or(MountError::NoSession)?;
        let transport = connect(&session)?;
        Ok(Self::new(session, transport))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn messages(&self) -> &MessageList {
        &self.list
    }

    pub fn composer(&self) -> &str {
        &self.composer
    }

    /// Mutable composer text for input widgets.
    pub fn composer_mut(&mut self) -> &mut String {
        &mut self.composer
    }

    pub fn set_composer(&mut self, text: impl Into<String>) {
        self.composer = text.into();
    }

    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_open())
    }

    /// Send the composer text. Returns `Ok(false)` (and keeps the composer) when the text is blank
    /// or there is no open connection. On success the composer is cleared; the list is untouched
    /// until the echo arrives.
    pub fn send(&mut self) -> Result<bool, TransportError> {
        if self.composer.trim().is_empty() {
            return Ok(false);
        }
        let Some(transport) = self.transport.as_mut().filter(|t| t.is_open()) else {
            log::debug!("send ignored: no open connection");
            return Ok(false);
        };
        let message = WireMessage {
            id: self.ids.next_id(),
            text: self.composer.clone(),
            sender: Sender::from(&self.session),
        };
        transport.emit(ClientEvent::SendMessage(message))?;
        self.composer.clear();
        Ok(true)
    }

    /// Put `text` in the composer and send it.
    pub fn send_text(&mut self, text: &str) -> Result<bool, TransportError> {
        self.composer = text.to_string();
        self.send()
    }

    /// Apply one inbound event, computing ownership against the local session id.
    pub fn apply(&mut self, event: ServerEvent) -> ListChange {
        let local_id = self.session.id().to_string();
        match event {
            ServerEvent::ChatHistory(history) => {
                log::debug!("history snapshot with {} message(s)", history.len());
                self.list.replace(
                    history
                        .into_iter()
                        .map(|m| ChatMessage::from_wire(m, &local_id))
                        .collect(),
                );
                ListChange::Replaced
            }
            ServerEvent::ReceiveMessage(message) => {
                self.list.append(ChatMessage::from_wire(message, &local_id));
                ListChange::Appended(self.list.len() - 1)
            }
        }
    }

    /// Apply every event waiting in the transport's queue. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.transport.as_mut().and_then(|t| t.try_next_event()) {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    pub fn render(&self) -> Vec<RenderRecord> {
        render::render(&self.list)
    }

    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    /// Close the connection; pending events are discarded with it.
    pub fn unmount(mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
    }
}

impl ChatView<WsConnection> {
    /// Mount against the real server: session from `store`, one WebSocket to `realtime_url`.
    pub async fn mount(store: &SessionStore, realtime_url: &str) -> Result<Self, MountError> {
        let session = store.load().ok_or(MountError::NoSession)?;
        let connection = WsConnection::connect(realtime_url, &session).await?;
        Ok(Self::new(session, connection))
    }

    /// Wait for the next inbound event and apply it. `None` once the connection is gone.
    pub async fn next_change(&mut self) -> Option<ListChange> {
        let event = self.transport.as_mut()?.next_event().await?;
        Some(self.apply(event))
    }
}
