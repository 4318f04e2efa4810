//! WebSocket endpoint: the join handshake, the per-client writer task,
//! and the read loop relaying control messages into the room session.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use gemrush_core::net::messages::{
    ClientMessage, JoinRoomResponseMsg, MatchStartMsg, PlayerIndexMsg, ServerMessage,
};
use gemrush_core::net::protocol::{
    PROTOCOL_VERSION, decode_client_message, encode_server_message,
};

use crate::room::JoinInfo;
use crate::session::RoomCommand;
use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state)))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // The first frame must be a JoinRoom.
    let first_msg = match ws_receiver.next().await {
        Some(Ok(Message::Binary(data))) => data,
        _ => return,
    };
    let join = match decode_client_message(&first_msg) {
        Ok(ClientMessage::JoinRoom(join)) => join,
        Ok(other) => {
            tracing::debug!(msg = ?other.message_type(), "Expected JoinRoom as first message");
            return;
        },
        Err(e) => {
            tracing::debug!(error = %e, "Undecodable join message");
            return;
        },
    };

    if join.protocol_version != 0 && join.protocol_version != PROTOCOL_VERSION {
        send_join_error(
            &mut ws_sender,
            &format!(
                "Protocol version mismatch: client={}, server={}",
                join.protocol_version, PROTOCOL_VERSION
            ),
        )
        .await;
        return;
    }

    let name = join.player_name.trim();
    if name.is_empty() || name.len() > 32 || name.chars().any(|c| c.is_control()) {
        send_join_error(&mut ws_sender, "Invalid player name").await;
        return;
    }

    let (tx, rx) = mpsc::channel::<Bytes>(state.config.limits.player_message_buffer);
    let result = {
        let mut rooms = state.rooms.write().await;
        rooms.join_or_create(tx, Arc::clone(&state.rooms))
    };
    let info = match result {
        Ok(info) => info,
        Err(e) => {
            send_join_error(&mut ws_sender, &e).await;
            return;
        },
    };

    if !send_join_handshake(&mut ws_sender, &info).await {
        let mut rooms = state.rooms.write().await;
        rooms.leave(&info.room_code, info.slot);
        return;
    }

    spawn_writer(ws_sender, rx);
    read_loop(&mut ws_receiver, &state, &info.room_code, info.slot).await;

    // Disconnected; tell the room.
    let mut rooms = state.rooms.write().await;
    rooms.leave(&info.room_code, info.slot);
    drop(rooms);
    tracing::info!(room = %info.room_code, slot = info.slot, "Player disconnected");
}

/// Send JoinRoomResponse, the one-time slot assignment, and the static
/// match data. Returns false if the socket died mid-handshake.
async fn send_join_handshake(
    ws_sender: &mut SplitSink<WebSocket, Message>,
    info: &JoinInfo,
) -> bool {
    let messages = [
        ServerMessage::JoinRoomResponse(JoinRoomResponseMsg {
            success: true,
            player_index: Some(info.slot),
            room_code: Some(info.room_code.clone()),
            error: None,
        }),
        ServerMessage::PlayerIndex(PlayerIndexMsg {
            player_index: info.slot,
        }),
        ServerMessage::MatchStart(MatchStartMsg {
            level: info.level.clone(),
            player_count: info.player_count,
        }),
    ];
    for msg in &messages {
        let data = match encode_server_message(msg) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode handshake message");
                return false;
            },
        };
        if ws_sender.send(Message::Binary(data.into())).await.is_err() {
            return false;
        }
    }
    true
}

async fn send_join_error(ws_sender: &mut SplitSink<WebSocket, Message>, error: &str) {
    let msg = ServerMessage::JoinRoomResponse(JoinRoomResponseMsg {
        success: false,
        player_index: None,
        room_code: None,
        error: Some(error.to_string()),
    });
    if let Ok(data) = encode_server_message(&msg)
        && let Err(e) = ws_sender.send(Message::Binary(data.into())).await
    {
        tracing::debug!(error = %e, "Failed to send join error");
    }
}

/// Forward room broadcasts from the player's channel onto the socket.
fn spawn_writer(mut ws_sender: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<Bytes>) {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender.send(Message::Binary(data)).await.is_err() {
                break;
            }
        }
    });
}

/// Relay control/signal messages into the room session until the client
/// disconnects. Messages referencing a foreign slot are dropped.
async fn read_loop(
    ws_receiver: &mut SplitStream<WebSocket>,
    state: &AppState,
    room_code: &str,
    slot: u8,
) {
    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(data) => data,
            Message::Close(_) => break,
            _ => continue,
        };
        match decode_client_message(&data) {
            Ok(ClientMessage::PlayerControls(m)) => {
                if m.player_idx != slot {
                    tracing::debug!(claimed = m.player_idx, slot, "Controls for foreign slot");
                    continue;
                }
                let rooms = state.rooms.read().await;
                rooms.route_command(
                    room_code,
                    RoomCommand::Controls {
                        slot,
                        controls: m.controls,
                    },
                );
            },
            Ok(ClientMessage::StartSignal(m)) => {
                if m.player_idx != slot {
                    tracing::debug!(claimed = m.player_idx, slot, "Start signal for foreign slot");
                    continue;
                }
                let rooms = state.rooms.read().await;
                rooms.route_command(room_code, RoomCommand::StartSignal { slot });
            },
            Ok(ClientMessage::RestartSignal(m)) => {
                if m.player_idx != slot {
                    continue;
                }
                let rooms = state.rooms.read().await;
                rooms.route_command(room_code, RoomCommand::RestartSignal { slot });
            },
            Ok(ClientMessage::LeaveRoom(_)) => break,
            Ok(ClientMessage::JoinRoom(_)) => {
                tracing::debug!(slot, "Duplicate JoinRoom ignored");
            },
            Err(e) => {
                tracing::debug!(error = %e, "Undecodable message ignored");
            },
        }
    }
}
