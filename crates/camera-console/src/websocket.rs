use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::connection::ConnectionSnapshot;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    Ping,
    Pong,
    Connection { snapshot: ConnectionSnapshotMessage },
}

/// Wire form of a [`ConnectionSnapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSnapshotMessage {
    pub state: String,
    pub retry_count: u32,
    pub banner_visible: bool,
    pub message: String,
}

impl From<&ConnectionSnapshot> for ConnectionSnapshotMessage {
    fn from(snapshot: &ConnectionSnapshot) -> Self {
        use crate::connection::ConnectionPhase;

        let (state, retry_count) = match snapshot.phase {
            ConnectionPhase::Checking => ("checking", 0),
            ConnectionPhase::Connected => ("connected", 0),
            ConnectionPhase::Disconnected { retry_count } => ("disconnected", retry_count),
            ConnectionPhase::Reconnected => ("reconnected", 0),
        };
        Self {
            state: state.to_string(),
            retry_count,
            banner_visible: snapshot.banner_visible,
            message: snapshot.message.clone(),
        }
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

fn encode(message: &WsMessage) -> Option<Message> {
    serde_json::to_string(message).ok().map(Message::Text)
}

/// Sends the current banner state on connect and again on every change.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut snapshots = state.connection().subscribe();
    let (pong_tx, mut pong_rx) = mpsc::channel::<()>(4);

    let mut send_task = tokio::spawn(async move {
        let initial = WsMessage::Connection {
            snapshot: (&*snapshots.borrow_and_update()).into(),
        };
        if let Some(msg) = encode(&initial) {
            if sender.send(msg).await.is_err() {
                return;
            }
        }

        loop {
            let outgoing = tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    WsMessage::Connection {
                        snapshot: (&*snapshots.borrow_and_update()).into(),
                    }
                }
                Some(()) = pong_rx.recv() => WsMessage::Pong,
            };

            if let Some(msg) = encode(&outgoing) {
                if sender.send(msg).await.is_err() {
                    break;
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<WsMessage>(&text) {
                    Ok(WsMessage::Ping) => {
                        if pong_tx.send(()).await.is_err() {
                            break;
                        }
                    }
                    Ok(other) => debug!(?other, "ignoring client message"),
                    Err(err) => debug!(error = %err, "unparseable client message"),
                },
                Message::Close(_) => {
                    info!("websocket client disconnected");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}
