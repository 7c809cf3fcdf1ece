use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};

use super::models::{Project, Task, TaskColumn};

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long an unanswered Ping may stay outstanding.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

/// Keepalive timing for one client connection.
#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    pub ping_every: Duration,
    pub pong_deadline: Duration,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            ping_every: PING_INTERVAL,
            pong_deadline: PONG_TIMEOUT,
        }
    }
}

/// Why a client connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    PongTimeout,
    ClientClosed,
    SendFailed,
    EventsClosed,
}

// ── Board change events ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BoardEvent {
    ProjectCreated {
        project: Project,
    },
    ProjectUpdated {
        project: Project,
    },
    ProjectDeleted {
        project_id: i64,
    },
    TaskCreated {
        task: Task,
    },
    TaskUpdated {
        task: Task,
    },
    TaskDeleted {
        project_id: i64,
        task_id: i64,
    },
    TaskMoved {
        project_id: i64,
        task_id: i64,
        from_column: TaskColumn,
        to_column: TaskColumn,
        position: i64,
    },
    /// The whole layout of a project was replaced.
    BoardReordered {
        project_id: i64,
    },
}

// ── WebSocket handler ────────────────────────────────────────────────

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    tx: broadcast::Sender<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, tx))
}

async fn handle_socket(socket: WebSocket, tx: broadcast::Sender<String>) {
    let (sender, receiver) = socket.split();
    let rx = tx.subscribe();
    tracing::debug!(subscribers = tx.receiver_count(), "websocket client connected");
    let reason = run_socket_loop(sender, receiver, rx, Heartbeat::default()).await;
    tracing::debug!(?reason, "websocket client disconnected");
}

/// Forward board events to one client until it goes away, then send Close.
///
/// The client is pinged every `heartbeat.ping_every`. Once a Ping is
/// outstanding, a Pong must arrive within `heartbeat.pong_deadline` or the
/// connection is dropped. A client that falls behind the broadcast buffer
/// skips the missed events and carries on.
async fn run_socket_loop<S, R, E>(
    mut sender: S,
    mut receiver: R,
    mut events: broadcast::Receiver<String>,
    heartbeat: Heartbeat,
) -> Disconnect
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
{
    let mut pings = tokio::time::interval_at(
        Instant::now() + heartbeat.ping_every,
        heartbeat.ping_every,
    );
    pings.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pong_due: Option<Instant> = None;

    let reason = loop {
        tokio::select! {
            _ = tokio::time::sleep_until(pong_due.unwrap_or_else(Instant::now)), if pong_due.is_some() => {
                break Disconnect::PongTimeout;
            }

            _ = pings.tick() => {
                if sender.send(Message::Ping(Default::default())).await.is_err() {
                    break Disconnect::SendFailed;
                }
                pong_due.get_or_insert_with(|| Instant::now() + heartbeat.pong_deadline);
            }

            event = events.recv() => match event {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break Disconnect::SendFailed;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "websocket client lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break Disconnect::EventsClosed,
            },

            frame = receiver.next() => match frame {
                Some(Ok(Message::Pong(_))) => pong_due = None,
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    break Disconnect::ClientClosed;
                }
                // Text, Binary and Ping from the client are ignored
                Some(Ok(_)) => {}
            },
        }
    };

    let _ = sender.send(Message::Close(None)).await;
    reason
}

/// Serialize `event` and fan it out to every connected client.
pub fn broadcast_event(tx: &broadcast::Sender<String>, event: &BoardEvent) {
    match serde_json::to_string(event) {
        Ok(json) => {
            // No receivers is not an error
            let _ = tx.send(json);
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize board event");
        }
    }
}
