//! Realtime transport: one WebSocket per chat view.
//!
//! Frames are JSON events `{ "type": "event", "event", "payload" }`. The server sends
//! `chat_history` once after connect and `receive_message` for every delivered message;
//! the client sends `send_message`.

mod connection;
mod protocol;

pub use connection::{
    connect_url, ChatTransport, TransportError, WsConnection, INBOUND_QUEUE_CAPACITY,
};
pub use protocol::{
    ClientEvent, ConnectParams, EventFrame, LoginRequest, LoginResponse, ServerEvent,
    EVENT_CHAT_HISTORY, EVENT_RECEIVE_MESSAGE, EVENT_SEND_MESSAGE,
};
