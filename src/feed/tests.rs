#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use tokio::net::TcpListener;

/// Binds a feed stand-in listener on an ephemeral port, returning the
/// `TcpListener` and its `SocketAddr` to the caller.
pub async fn listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .await
        .unwrap();

    let addr = listener.local_addr().unwrap();

    (listener, addr)
}

/// Feed stand-in: every accepted connection sends one score document
/// carrying a connection-unique id, then drops the socket so the client
/// sees a close.
pub fn one_score_then_close_router(connections: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route("/scores", get(one_score_handler))
        .with_state(connections)
}

async fn one_score_handler(
    ws: WebSocketUpgrade,
    State(connections): State<Arc<AtomicUsize>>,
) -> Response {
    ws.on_upgrade(move |socket| send_one_score(socket, connections))
}

async fn send_one_score(mut socket: WebSocket, connections: Arc<AtomicUsize>) {
    let nth = connections.fetch_add(1, Ordering::SeqCst) + 1;
    _ = socket
        .send(Message::Text(score_json(nth as i64, 0.727).into()))
        .await;
}

/// Feed stand-in: one unparseable frame, then a valid score, then the
/// connection is held open until the client goes away.
pub fn garbage_then_score_router() -> Router {
    Router::new().route("/scores", get(garbage_then_score_handler))
}

async fn garbage_then_score_handler(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(garbage_then_score)
}

async fn garbage_then_score(mut socket: WebSocket) {
    _ = socket.send(Message::Text("definitely not json".into())).await;
    _ = socket
        .send(Message::Text(score_json(7, 0.5).into()))
        .await;

    while let Some(Ok(_)) = socket.recv().await {}
}

pub fn score_json(id: i64, accuracy: f64) -> String {
    serde_json::json!({
        "id": id,
        "playerId": "76561198000000000",
        "accuracy": accuracy,
        "timepost": 1722470400,
        "player": { "id": "76561198000000000", "name": "tester" },
        "leaderboard": {
            "song": { "name": "Time Files" },
            "difficulty": { "difficultyName": "Expert+" }
        }
    })
    .to_string()
}
