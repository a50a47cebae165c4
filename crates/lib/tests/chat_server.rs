//! Integration test: start a stand-in message server (login + WebSocket echo) on a loopback
//! port and drive the real login client and chat view against it.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use chatter_core::auth::{LoginClient, LoginForm};
use chatter_core::chat::{ChatView, ListChange, MountError};
use chatter_core::message::{Sender, WireMessage};
use chatter_core::session::{Session, SessionStore};
use chatter_core::transport::{ChatTransport, ClientEvent, LoginRequest, ServerEvent, WsConnection};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
struct ServerState {
    history: Vec<WireMessage>,
    connects: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn login(Json(req): Json<LoginRequest>) -> (StatusCode, Json<serde_json::Value>) {
    match req.password.as_str() {
        "secret" => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "user": { "id": req.id, "name": format!("User {}", req.id) }
            })),
        ),
        "silent" => (StatusCode::UNAUTHORIZED, Json(json!({ "success": false }))),
        "spaces" => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "  " })),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "invalid credentials" })),
        ),
    }
}

async fn ws_handler(
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

async fn handle_socket(
    mut socket: WebSocket,
    state: ServerState,
    params: HashMap<String, String>,
) {
    state.connects.lock().expect("connects lock").push(params);

    let history = ServerEvent::ChatHistory(state.history.clone())
        .to_frame()
        .expect("history frame");
    let text = serde_json::to_string(&history).expect("serialize history");
    if socket.send(Message::Text(text)).await.is_err() {
        return;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(text) = msg else { continue };
        let Ok(Some(ClientEvent::SendMessage(m))) = ClientEvent::from_text(&text) else {
            continue;
        };
        let echo = ServerEvent::ReceiveMessage(m).to_frame().expect("echo frame");
        let text = serde_json::to_string(&echo).expect("serialize echo");
        if socket.send(Message::Text(text)).await.is_err() {
            break;
        }
    }
}

/// Sends the history, an unknown event and a non-JSON frame, then closes from the server side.
async fn closing_ws_handler(State(state): State<ServerState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_closing_socket(socket, state))
}

async fn handle_closing_socket(mut socket: WebSocket, state: ServerState) {
    let history = ServerEvent::ChatHistory(state.history.clone())
        .to_frame()
        .expect("history frame");
    let frames = vec![
        serde_json::to_string(&history).expect("serialize history"),
        json!({ "type": "event", "event": "user_joined", "payload": { "id": "u9" } }).to_string(),
        "not json at all".to_string(),
    ];
    for text in frames {
        if socket.send(Message::Text(text)).await.is_err() {
            return;
        }
    }
    let _ = socket.send(Message::Close(None)).await;
}

async fn start_server(history: Vec<WireMessage>) -> (SocketAddr, ServerState) {
    let state = ServerState {
        history,
        connects: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/login", post(login))
        .route("/ws", get(ws_handler))
        .route("/ws-closing", get(closing_ws_handler))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, state)
}

fn bob_says(id: &str, text: &str) -> WireMessage {
    WireMessage {
        id: id.to_string(),
        text: text.to_string(),
        sender: Sender {
            id: "u2".to_string(),
            name: "Bob".to_string(),
        },
    }
}

async fn next_change(view: &mut ChatView<WsConnection>) -> ListChange {
    tokio::time::timeout(Duration::from_secs(5), view.next_change())
        .await
        .expect("no event within 5s")
        .expect("connection ended")
}

#[tokio::test]
async fn login_success_stores_server_identity() {
    let (addr, _) = start_server(Vec::new()).await;
    let client = LoginClient::new(format!("http://{}", addr));
    let store = SessionStore::new();
    let mut form = LoginForm::new();
    form.id = "u7".to_string();
    form.password = "secret".to_string();

    let session = form.submit(&client, &store).await.expect("login succeeds");
    assert_eq!(session.id(), "u7");
    assert_eq!(session.name(), "User u7");
    assert_eq!(store.load(), Some(session));
    assert!(form.error().is_none());
}

#[tokio::test]
async fn login_rejection_shows_server_error_or_fallback() {
    let (addr, _) = start_server(Vec::new()).await;
    let client = LoginClient::new(format!("http://{}", addr));
    let store = SessionStore::new();

    let mut form = LoginForm::new();
    form.id = "u7".to_string();
    form.password = "wrong".to_string();
    assert!(form.submit(&client, &store).await.is_none());
    assert_eq!(form.error(), Some("invalid credentials"));

    form.password = "silent".to_string();
    assert!(form.submit(&client, &store).await.is_none());
    assert_eq!(form.error(), Some("Login failed."));
    assert!(store.load().is_none());
}

#[tokio::test]
async fn whitespace_server_error_is_shown_as_sent() {
    let (addr, _) = start_server(Vec::new()).await;
    let client = LoginClient::new(format!("http://{}", addr));
    let store = SessionStore::new();
    let mut form = LoginForm::new();
    form.id = "u7".to_string();
    form.password = "spaces".to_string();

    assert!(form.submit(&client, &store).await.is_none());
    assert_eq!(form.error(), Some("  "));
    assert_eq!(form.password, "spaces");
}

#[tokio::test]
async fn login_against_closed_port_is_generic_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
        listener.local_addr().expect("local_addr").port()
    };
    let client = LoginClient::new(format!("http://127.0.0.1:{}", port));
    let store = SessionStore::new();
    let mut form = LoginForm::new();
    form.id = "u1".to_string();
    form.password = "secret".to_string();

    assert!(form.submit(&client, &store).await.is_none());
    assert_eq!(form.error(), Some("Could not reach the server."));
}

#[tokio::test]
async fn history_then_echo_round_trip() {
    let (addr, state) = start_server(vec![bob_says("m1", "hi")]).await;
    let store = SessionStore::new();
    store.save(&Session::new("u1", "Alice").expect("session"));

    let mut view = ChatView::mount(&store, &format!("ws://{}/ws", addr))
        .await
        .expect("mount");
    assert_eq!(next_change(&mut view).await, ListChange::Replaced);
    assert_eq!(view.messages().len(), 1);
    assert!(!view.messages().messages()[0].is_own);
    assert!(view.messages().show_sender(0));

    assert!(view.send_text("hello").expect("send"));
    assert_eq!(view.messages().len(), 1);
    assert_eq!(next_change(&mut view).await, ListChange::Appended(1));

    let echoed = &view.messages().messages()[1];
    assert_eq!(echoed.text, "hello");
    assert_eq!(echoed.sender.id, "u1");
    assert!(echoed.is_own);
    assert!(!view.messages().show_sender(1));

    let connects = state.connects.lock().expect("connects lock").clone();
    assert_eq!(connects.len(), 1);
    assert_eq!(connects[0].get("userId").map(String::as_str), Some("u1"));
    assert_eq!(connects[0].get("userName").map(String::as_str), Some("Alice"));

    view.unmount();
}

#[tokio::test]
async fn mount_without_session_does_not_connect() {
    let (addr, state) = start_server(Vec::new()).await;
    let store = SessionStore::new();
    let res = ChatView::mount(&store, &format!("ws://{}/ws", addr)).await;
    assert!(matches!(res, Err(MountError::NoSession)));
    assert!(state.connects.lock().expect("connects lock").is_empty());
}

#[tokio::test]
async fn closed_connection_refuses_emit() {
    let (addr, _) = start_server(Vec::new()).await;
    let session = Session::new("u1", "Alice").expect("session");
    let mut conn = WsConnection::connect(&format!("ws://{}/ws", addr), &session)
        .await
        .expect("connect");
    assert!(conn.is_open());

    conn.close();
    assert!(!conn.is_open());
    assert!(conn.try_next_event().is_none());
    let res = conn.emit(ClientEvent::SendMessage(bob_says("x", "late")));
    assert!(res.is_err());
}

#[tokio::test]
async fn server_close_marks_view_disconnected() {
    let (addr, _) = start_server(vec![bob_says("m1", "hi")]).await;
    let store = SessionStore::new();
    store.save(&Session::new("u1", "Alice").expect("session"));

    let mut view = ChatView::mount(&store, &format!("ws://{}/ws-closing", addr))
        .await
        .expect("mount");
    assert_eq!(next_change(&mut view).await, ListChange::Replaced);

    // Unknown event and non-JSON frame are skipped; the close ends the stream.
    let end = tokio::time::timeout(Duration::from_secs(5), view.next_change())
        .await
        .expect("stream did not end within 5s");
    assert_eq!(end, None);
    assert_eq!(view.messages().len(), 1);
    assert!(!view.is_connected());

    assert!(!view.send_text("hello").expect("send on closed connection"));
    assert_eq!(view.composer(), "hello");
    assert_eq!(view.messages().len(), 1);

    view.unmount();
}
