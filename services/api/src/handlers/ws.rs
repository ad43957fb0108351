//! WebSocket subscription endpoint.
//!
//! Each connection gets one broker handle and one writer task. The writer
//! is the only socket writer: it interleaves broadcast batches from the
//! broker queue with control replies (acks, errors) from the read loop.
//! The read loop parses client commands and mutates topic memberships.

use axum::{
    extract::{
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::debug;
use tracking::topic::Topic;
use types::ids::RouteId;

use crate::error::ApiError;
use crate::state::AppState;

/// Commands a subscriber may send, tagged by `action`.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ClientCommand {
    #[serde(rename_all = "camelCase")]
    SubscribeBus { bus_number: String },
    SubscribeAllBuses,
    #[serde(rename_all = "camelCase")]
    SubscribeRoute { route_id: RouteId },
    Unsubscribe { topic: String },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    state.rate_limiter.check_rate_limit("ws:connect", 100, 20.0)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state)))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let handle = state.broker.register();
    let conn_id = handle.id();
    debug!(conn_id, "websocket connected");

    let (control_tx, mut control_rx) = mpsc::channel::<String>(16);

    let writer_handle = handle.clone();
    let mut writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                batch = writer_handle.next_batch() => {
                    let Some(batch) = batch else { break };
                    for msg in batch {
                        let frame = Message::Text(Utf8Bytes::from(&*msg.payload));
                        if sink.send(frame).await.is_err() {
                            return;
                        }
                    }
                }
                Some(reply) = control_rx.recv() => {
                    if sink.send(Message::Text(Utf8Bytes::from(reply))).await.is_err() {
                        return;
                    }
                }
            }
        }
        let _ = sink.close().await;
    });

    loop {
        tokio::select! {
            _ = &mut writer => break,
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let reply = apply_command(&state, conn_id, &text);
                    if control_tx.send(reply).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    // Teardown closes the handle, which ends the writer once drained.
    state.broker.disconnect(conn_id);
    debug!(conn_id, "websocket disconnected");
}

/// Apply one client command, returning the reply frame.
fn apply_command(state: &AppState, conn_id: u64, text: &str) -> String {
    let command: ClientCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(err) => return error_frame(&format!("invalid command: {err}")),
    };

    if let Err(e) = state
        .rate_limiter
        .check_rate_limit(&format!("ws:{conn_id}:commands"), 50, 50.0)
    {
        return error_frame(&e.to_string());
    }

    match command {
        ClientCommand::SubscribeBus { bus_number } => {
            subscribe(state, conn_id, Topic::bus(&bus_number))
        }
        ClientCommand::SubscribeAllBuses => subscribe(state, conn_id, Topic::All),
        ClientCommand::SubscribeRoute { route_id } => {
            subscribe(state, conn_id, Topic::Route(route_id))
        }
        ClientCommand::Unsubscribe { topic } => match Topic::parse(&topic) {
            Some(topic) => {
                state.broker.unsubscribe(conn_id, &topic);
                ack_frame("unsubscribed", &topic)
            }
            None => error_frame(&format!("unknown topic: {topic}")),
        },
    }
}

fn subscribe(state: &AppState, conn_id: u64, topic: Topic) -> String {
    if state.broker.subscribe(conn_id, topic.clone()) {
        ack_frame("subscribed", &topic)
    } else {
        error_frame("connection is closed")
    }
}

fn ack_frame(event: &str, topic: &Topic) -> String {
    json!({ "event": event, "topic": topic.to_string() }).to_string()
}

fn error_frame(message: &str) -> String {
    json!({ "event": "error", "message": message }).to_string()
}
