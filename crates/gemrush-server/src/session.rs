//! The per-room authoritative tick loop. Each room owns exactly one
//! [`GameController`]; this task drives it at a fixed interval, applies
//! commands arriving from WebSocket handlers, and broadcasts the
//! resulting match state to every connected client.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use gemrush_core::controls::Controls;
use gemrush_core::net::messages::{
    MatchEndMsg, MatchStateMsg, PlayerScoreEntry, ServerMessage,
};
use gemrush_core::net::protocol::encode_server_message;
use gemrush_core::phase::GamePhase;
use gemrush_game::GameController;

/// Commands sent from the WebSocket handlers to the room tick loop.
#[derive(Debug)]
pub enum RoomCommand {
    /// Register the next free slot with the controller.
    PlayerJoined,
    Controls { slot: u8, controls: Controls },
    StartSignal { slot: u8 },
    RestartSignal { slot: u8 },
    PlayerLeft { slot: u8 },
    Stop,
}

/// Broadcasts from the tick loop to all connected clients.
#[derive(Debug, Clone)]
pub enum RoomBroadcast {
    /// Encoded ServerMessage bytes, cloned zero-copy per client.
    Encoded(Bytes),
    /// The session has ended and the loop has exited.
    Ended,
}

/// Spawn a room's tick loop as a tokio task.
pub fn spawn_room_session(
    controller: GameController,
    tick_interval: Duration,
) -> (
    mpsc::UnboundedSender<RoomCommand>,
    mpsc::UnboundedReceiver<RoomBroadcast>,
    JoinHandle<()>,
) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        run_room_tick_loop(controller, tick_interval, cmd_rx, broadcast_tx).await;
    });

    (cmd_tx, broadcast_rx, handle)
}

async fn run_room_tick_loop(
    mut controller: GameController,
    tick_interval: Duration,
    mut cmd_rx: mpsc::UnboundedReceiver<RoomCommand>,
    broadcast_tx: mpsc::UnboundedSender<RoomBroadcast>,
) {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let dt_ms = tick_interval.as_secs_f32() * 1000.0;
    let mut tick: u32 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                tick = tick.wrapping_add(1);
                controller.step(dt_ms);
                controller.cleanup();

                let state = ServerMessage::MatchState(MatchStateMsg {
                    tick,
                    phase: controller.phase(),
                    level_num: controller.level(),
                    players: controller.player_snapshots(),
                    diamonds: controller.diamond_snapshots(),
                    bombs: controller.bomb_snapshots(),
                });
                match encode_server_message(&state) {
                    Ok(data) => {
                        let _ = broadcast_tx.send(RoomBroadcast::Encoded(Bytes::from(data)));
                    },
                    Err(e) => tracing::error!(tick, error = %e, "Failed to encode MatchState"),
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(RoomCommand::PlayerJoined) => {
                        controller.register_player();
                    },
                    Some(RoomCommand::Controls { slot, controls }) => {
                        controller.set_player_controls(slot as usize, controls);
                    },
                    Some(RoomCommand::StartSignal { slot }) => {
                        tracing::debug!(slot, "Start signal");
                        controller.start();
                    },
                    Some(RoomCommand::RestartSignal { slot }) => {
                        if controller.phase() == GamePhase::GameOver {
                            tracing::info!(slot, "Restarting match");
                            controller.restart();
                        } else {
                            tracing::debug!(
                                slot,
                                phase = ?controller.phase(),
                                "Restart signal ignored"
                            );
                        }
                    },
                    Some(RoomCommand::PlayerLeft { slot }) => {
                        // The match cannot continue with a missing slot;
                        // end it and let the room close.
                        tracing::info!(slot, "Player left, ending match");
                        break;
                    },
                    Some(RoomCommand::Stop) | None => break,
                }
            }
        }
    }

    let final_scores: Vec<PlayerScoreEntry> = controller
        .player_snapshots()
        .iter()
        .enumerate()
        .map(|(slot, p)| PlayerScoreEntry {
            player_index: slot as u8,
            score: p.score,
        })
        .collect();
    let end = ServerMessage::MatchEnd(MatchEndMsg { final_scores });
    match encode_server_message(&end) {
        Ok(data) => {
            let _ = broadcast_tx.send(RoomBroadcast::Encoded(Bytes::from(data)));
        },
        Err(e) => tracing::error!(error = %e, "Failed to encode MatchEnd"),
    }

    controller.dispose();
    let _ = broadcast_tx.send(RoomBroadcast::Ended);
}
