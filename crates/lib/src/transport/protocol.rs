//! Realtime channel wire types (event frames, connect params) and the login request/response.

use crate::message::{Sender, WireMessage};
use serde::{Deserialize, Serialize};

pub const EVENT_CHAT_HISTORY: &str = "chat_history";
pub const EVENT_RECEIVE_MESSAGE: &str = "receive_message";
pub const EVENT_SEND_MESSAGE: &str = "send_message";

/// Wire frame: `{ "type": "event", "event", "payload" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    #[serde(rename = "type")]
    pub typ: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl EventFrame {
    pub fn new(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            typ: "event".to_string(),
            event: event.into(),
            payload,
        }
    }
}

/// Connection-time metadata, sent as `?userId=..&userName=..`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub user_id: String,
    pub user_name: String,
}

/// Server-to-client events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// One-time snapshot sent right after connect.
    ChatHistory(Vec<WireMessage>),
    ReceiveMessage(WireMessage),
}

impl ServerEvent {
    /// Parse a text frame. `Ok(None)` for frames that are not events or carry an unknown event name.
    pub fn from_text(text: &str) -> Result<Option<Self>, serde_json::Error> {
        let frame: EventFrame = serde_json::from_str(text)?;
        if frame.typ != "event" {
            return Ok(None);
        }
        let event = match frame.event.as_str() {
            EVENT_CHAT_HISTORY => Some(ServerEvent::ChatHistory(serde_json::from_value(
                frame.payload,
            )?)),
            EVENT_RECEIVE_MESSAGE => Some(ServerEvent::ReceiveMessage(serde_json::from_value(
                frame.payload,
            )?)),
            _ => None,
        };
        Ok(event)
    }

    pub fn to_frame(&self) -> Result<EventFrame, serde_json::Error> {
        Ok(match self {
            ServerEvent::ChatHistory(history) => {
                EventFrame::new(EVENT_CHAT_HISTORY, serde_json::to_value(history)?)
            }
            ServerEvent::ReceiveMessage(msg) => {
                EventFrame::new(EVENT_RECEIVE_MESSAGE, serde_json::to_value(msg)?)
            }
        })
    }
}

/// Client-to-server events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    SendMessage(WireMessage),
}

impl ClientEvent {
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        let frame = match self {
            ClientEvent::SendMessage(msg) => {
                EventFrame::new(EVENT_SEND_MESSAGE, serde_json::to_value(msg)?)
            }
        };
        serde_json::to_string(&frame)
    }

    /// Parse a client frame (used by servers and test doubles).
    pub fn from_text(text: &str) -> Result<Option<Self>, serde_json::Error> {
        let frame: EventFrame = serde_json::from_str(text)?;
        if frame.typ != "event" || frame.event != EVENT_SEND_MESSAGE {
            return Ok(None);
        }
        Ok(Some(ClientEvent::SendMessage(serde_json::from_value(
            frame.payload,
        )?)))
    }
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub id: String,
    pub password: String,
}

/// Response of `POST /login`: `{ success, user? , error? }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Sender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
