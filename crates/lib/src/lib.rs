//! Chatter core library: session, login, message list model, renderer and realtime transport
//! shared by the CLI and desktop applications.

pub mod auth;
pub mod chat;
pub mod config;
pub mod demo;
pub mod init;
pub mod message;
pub mod message_list;
pub mod render;
pub mod session;
pub mod transport;
