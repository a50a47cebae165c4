//! WebSocket connection to the message server.
//!
//! A socket task owns the stream. Inbound events go through a bounded queue that the chat
//! view drains on its own thread; outbound events go through an unbounded queue to the task.

use crate::session::Session;
use crate::transport::protocol::{ClientEvent, ConnectParams, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Capacity of the inbound event queue between the socket task and the view.
pub const INBOUND_QUEUE_CAPACITY: usize = 64;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid realtime url: {0}")]
    Url(String),
    #[error("websocket connect failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("connection closed")]
    Closed,
}

/// What a chat view needs from a connection. Implemented by [`WsConnection`] and by test doubles.
pub trait ChatTransport {
    /// Queue an event for the server. Fails with [`TransportError::Closed`] once closed.
    fn emit(&mut self, event: ClientEvent) -> Result<(), TransportError>;
    /// Next received event, if one is waiting. Never blocks.
    fn try_next_event(&mut self) -> Option<ServerEvent>;
    fn is_open(&self) -> bool;
    /// Close the connection and discard undelivered events.
    fn close(&mut self);
}

/// Add the connect-time identity to the realtime URL as `userId` / `userName` query params.
pub fn connect_url(base: &str, session: &Session) -> Result<reqwest::Url, TransportError> {
    let mut url = reqwest::Url::parse(base).map_err(|e| TransportError::Url(e.to_string()))?;
    if url.scheme() != "ws" && url.scheme() != "wss" {
        return Err(TransportError::Url(format!(
            "expected ws:// or wss:// url, got {}",
            base
        )));
    }
    let params = ConnectParams {
        user_id: session.id().to_string(),
        user_name: session.name().to_string(),
    };
    url.query_pairs_mut()
        .append_pair("userId", &params.user_id)
        .append_pair("userName", &params.user_name);
    Ok(url)
}

/// Live WebSocket connection; closed on [`ChatTransport::close`] or drop.
pub struct WsConnection {
    outbound: Option<mpsc::UnboundedSender<ClientEvent>>,
    inbound: mpsc::Receiver<ServerEvent>,
    open: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl WsConnection {
    /// Open one connection for `session`. Must be called within a tokio runtime.
    pub async fn connect(realtime_url: &str, session: &Session) -> Result<Self, TransportError> {
        let url = connect_url(realtime_url, session)?;
        log::info!("connecting to {}", realtime_url);
        let (socket, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        log::debug!("realtime connection open for user {}", session.id());

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_CAPACITY);
        let open = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(run_socket(socket, outbound_rx, inbound_tx, open.clone()));

        Ok(Self {
            outbound: Some(outbound_tx),
            inbound: inbound_rx,
            open,
            task: Some(task),
        })
    }

    /// Wait for the next event. `None` once the connection is gone and the queue is drained.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.inbound.recv().await
    }
}

impl ChatTransport for WsConnection {
    fn emit(&mut self, event: ClientEvent) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        let tx = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        tx.send(event).map_err(|_| TransportError::Closed)
    }

    fn try_next_event(&mut self) -> Option<ServerEvent> {
        self.inbound.try_recv().ok()
    }

    fn is_open(&self) -> bool {
        self.outbound.is_some() && self.open.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        self.open.store(false, Ordering::SeqCst);
        self.outbound.take();
        if let Some(task) = self.task.take() {
            task.abort();
            log::debug!("realtime connection closed");
        }
        self.inbound.close();
        while self.inbound.try_recv().is_ok() {}
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_socket(
    socket: Socket,
    mut outbound_rx: mpsc::UnboundedReceiver<ClientEvent>,
    inbound_tx: mpsc::Sender<ServerEvent>,
    open: Arc<AtomicBool>,
) {
    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            out = outbound_rx.recv() => {
                let Some(event) = out else {
                    let _ = sink.close().await;
                    break;
                };
                let text = match event.to_text() {
                    Ok(t) => t,
                    Err(e) => {
                        log::warn!("dropping outbound event: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    log::warn!("realtime send failed: {}", e);
                    break;
                }
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match ServerEvent::from_text(&text) {
                        Ok(Some(event)) => {
                            if inbound_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => log::debug!("ignoring frame: {}", text),
                        Err(e) => log::warn!("invalid frame from server: {}", e),
                    },
                    Some(Ok(Message::Close(reason))) => {
                        log::warn!("server closed realtime connection: {:?}", reason);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::warn!("realtime connection error: {}", e);
                        break;
                    }
                    None => {
                        log::warn!("realtime connection ended");
                        break;
                    }
                }
            }
        }
    }
    open.store(false, Ordering::SeqCst);
}
