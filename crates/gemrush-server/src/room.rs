//! Room management: matchmaking into rooms, slot assignment, command
//! routing into each room's tick loop, and broadcast fan-out back to
//! connected clients. Rooms are fully isolated from each other — each
//! owns its controller, channels, and player slots.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use gemrush_core::level::LevelDef;
use gemrush_core::phase::GamePhase;
use gemrush_game::GameController;

use crate::config::ServerConfig;
use crate::session::{RoomBroadcast, RoomCommand, spawn_room_session};
use crate::state::SharedRoomManager;

/// Per-player sender for outbound WebSocket binary messages. Bounded so
/// a slow client cannot exhaust memory; uses `Bytes` for zero-copy
/// cloning across players.
pub type PlayerSender = mpsc::Sender<Bytes>;

/// Everything a WebSocket handler needs after a successful join.
#[derive(Debug, Clone)]
pub struct JoinInfo {
    pub room_code: String,
    pub slot: u8,
    pub level: LevelDef,
    pub player_count: u8,
}

/// One row of the `/monitor` introspection listing.
#[derive(Debug, Clone, Serialize)]
pub struct RoomMonitorEntry {
    pub code: String,
    pub phase: GamePhase,
    pub players: usize,
    pub capacity: usize,
    pub locked: bool,
}

struct RoomEntry {
    /// Connected player senders by slot.
    slots: Vec<Option<PlayerSender>>,
    /// Slots handed out so far. Slot indices are assigned in join order
    /// and mirror the controller's registration order.
    joined: usize,
    /// Once full, the room accepts no further joins.
    locked: bool,
    cmd_tx: mpsc::UnboundedSender<RoomCommand>,
    #[allow(dead_code)]
    session_task: JoinHandle<()>,
    #[allow(dead_code)]
    forward_task: JoinHandle<()>,
    /// Shared sender map the broadcast forwarder reads each message.
    broadcast_senders: Arc<Mutex<HashMap<u8, PlayerSender>>>,
    /// Last observed phase, updated by the controller's transition
    /// listener inside the session task.
    phase: Arc<Mutex<GamePhase>>,
    level: LevelDef,
}

/// Manages all active rooms and their connected players.
pub struct RoomManager {
    config: Arc<ServerConfig>,
    rooms: HashMap<String, RoomEntry>,
}

impl RoomManager {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self {
            config,
            rooms: HashMap::new(),
        }
    }

    /// Join the first unlocked room, or create a fresh one. Returns the
    /// assigned slot; once the expected player count has joined, the
    /// room locks against further joins.
    pub fn join_or_create(
        &mut self,
        sender: PlayerSender,
        rooms: SharedRoomManager,
    ) -> Result<JoinInfo, String> {
        let code = match self.find_open_room() {
            Some(code) => code,
            None => self.create_room(rooms)?,
        };
        let entry = self
            .rooms
            .get_mut(&code)
            .ok_or_else(|| "Room vanished during join".to_string())?;

        let slot = entry.joined as u8;
        entry.slots[slot as usize] = Some(sender.clone());
        entry.joined += 1;
        if entry.joined >= entry.slots.len() {
            entry.locked = true;
        }
        entry
            .broadcast_senders
            .lock()
            .unwrap()
            .insert(slot, sender);

        if entry.cmd_tx.send(RoomCommand::PlayerJoined).is_err() {
            return Err("Room is closing".to_string());
        }

        tracing::info!(room = %code, slot, "Player joined");
        Ok(JoinInfo {
            room_code: code,
            slot,
            level: entry.level.clone(),
            player_count: entry.slots.len() as u8,
        })
    }

    fn find_open_room(&self) -> Option<String> {
        self.rooms
            .iter()
            .find(|(_, entry)| !entry.locked)
            .map(|(code, _)| code.clone())
    }

    fn create_room(&mut self, rooms: SharedRoomManager) -> Result<String, String> {
        let cfg = &self.config.rooms;
        let mut controller =
            GameController::new(cfg.arena_width, cfg.arena_height, cfg.max_players)
                .map_err(|e| e.to_string())?;
        let level = controller.level_def().clone();

        let phase = Arc::new(Mutex::new(controller.phase()));
        let phase_cell = Arc::clone(&phase);
        controller.subscribe_phase(Box::new(move |new, _| {
            *phase_cell.lock().unwrap() = new;
        }));

        let (cmd_tx, broadcast_rx, session_task) =
            spawn_room_session(controller, Duration::from_millis(cfg.tick_interval_ms));

        let code = generate_room_code();
        let broadcast_senders: Arc<Mutex<HashMap<u8, PlayerSender>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let forward_task = tokio::spawn(forward_broadcasts(
            broadcast_rx,
            Arc::clone(&broadcast_senders),
            code.clone(),
            rooms,
        ));

        self.rooms.insert(
            code.clone(),
            RoomEntry {
                slots: vec![None; cfg.max_players],
                joined: 0,
                locked: false,
                cmd_tx,
                session_task,
                forward_task,
                broadcast_senders,
                phase,
                level,
            },
        );
        tracing::info!(room = %code, capacity = cfg.max_players, "Room created");
        Ok(code)
    }

    /// Handle a disconnect. An empty room stops outright; otherwise the
    /// session is told the slot is gone and ends the match early.
    pub fn leave(&mut self, room_code: &str, slot: u8) {
        let Some(entry) = self.rooms.get_mut(room_code) else {
            return;
        };
        if let Some(s) = entry.slots.get_mut(slot as usize) {
            *s = None;
        }
        entry.broadcast_senders.lock().unwrap().remove(&slot);

        let empty = entry.slots.iter().all(Option::is_none);
        let cmd = if empty {
            RoomCommand::Stop
        } else {
            RoomCommand::PlayerLeft { slot }
        };
        if entry.cmd_tx.send(cmd).is_err() {
            tracing::debug!(room = %room_code, "Room session already stopped");
        }
    }

    /// Route a command into a room's tick loop. Unknown rooms and
    /// closed sessions are no-ops.
    pub fn route_command(&self, room_code: &str, cmd: RoomCommand) {
        if let Some(entry) = self.rooms.get(room_code)
            && entry.cmd_tx.send(cmd).is_err()
        {
            tracing::debug!(room = %room_code, "Room session gone");
        }
    }

    /// Drop a room entry once its session has ended.
    pub fn remove_room(&mut self, room_code: &str) {
        if self.rooms.remove(room_code).is_some() {
            tracing::info!(room = %room_code, "Room removed");
        }
    }

    /// (active rooms, connected players) for the health endpoint.
    pub fn stats(&self) -> (usize, usize) {
        let players = self
            .rooms
            .values()
            .map(|e| e.slots.iter().filter(|s| s.is_some()).count())
            .sum();
        (self.rooms.len(), players)
    }

    /// Introspection rows for `/monitor`.
    pub fn monitor_entries(&self) -> Vec<RoomMonitorEntry> {
        let mut entries: Vec<RoomMonitorEntry> = self
            .rooms
            .iter()
            .map(|(code, e)| RoomMonitorEntry {
                code: code.clone(),
                phase: *e.phase.lock().unwrap(),
                players: e.slots.iter().filter(|s| s.is_some()).count(),
                capacity: e.slots.len(),
                locked: e.locked,
            })
            .collect();
        entries.sort_by(|a, b| a.code.cmp(&b.code));
        entries
    }
}

/// Forward session broadcasts to every connected player, then remove
/// the room once the session ends. Slow clients are skipped rather than
/// blocking the tick loop.
async fn forward_broadcasts(
    mut broadcast_rx: mpsc::UnboundedReceiver<RoomBroadcast>,
    senders: Arc<Mutex<HashMap<u8, PlayerSender>>>,
    room_code: String,
    rooms: SharedRoomManager,
) {
    while let Some(broadcast) = broadcast_rx.recv().await {
        match broadcast {
            RoomBroadcast::Encoded(data) => {
                let snapshot = senders.lock().unwrap().clone();
                for (slot, sender) in &snapshot {
                    if sender.try_send(data.clone()).is_err() {
                        tracing::debug!(
                            slot,
                            room = %room_code,
                            "Skipping broadcast to slow client"
                        );
                    }
                }
            },
            RoomBroadcast::Ended => break,
        }
    }

    tracing::info!(room = %room_code, "Room session ended");
    let mut mgr = rooms.write().await;
    mgr.remove_room(&room_code);
}

fn generate_room_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
