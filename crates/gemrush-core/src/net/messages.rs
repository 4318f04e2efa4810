use serde::{Deserialize, Serialize};

use crate::controls::Controls;
use crate::level::LevelDef;
use crate::phase::GamePhase;

/// Network message type discriminator (wire prefix byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    PlayerControls = 0x01,
    JoinRoom = 0x02,
    LeaveRoom = 0x03,
    StartSignal = 0x04,
    RestartSignal = 0x05,

    // Server -> Client
    JoinRoomResponse = 0x10,
    PlayerIndex = 0x11,
    MatchStart = 0x12,
    MatchState = 0x13,
    MatchEnd = 0x14,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::PlayerControls),
            0x02 => Some(Self::JoinRoom),
            0x03 => Some(Self::LeaveRoom),
            0x04 => Some(Self::StartSignal),
            0x05 => Some(Self::RestartSignal),
            0x10 => Some(Self::JoinRoomResponse),
            0x11 => Some(Self::PlayerIndex),
            0x12 => Some(Self::MatchStart),
            0x13 => Some(Self::MatchState),
            0x14 => Some(Self::MatchEnd),
            _ => None,
        }
    }
}

/// Request to join (or be matched into) a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRoomMsg {
    pub player_name: String,
    pub protocol_version: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeaveRoomMsg {
    pub player_idx: u8,
}

/// Latest control flags for one slot. Last write wins per slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerControlsMsg {
    pub player_idx: u8,
    pub controls: Controls,
}

/// Request to move the match from Ready to Playing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartSignalMsg {
    pub player_idx: u8,
}

/// Request a fresh match after GameOver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RestartSignalMsg {
    pub player_idx: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRoomResponseMsg {
    pub success: bool,
    pub player_index: Option<u8>,
    pub room_code: Option<String>,
    pub error: Option<String>,
}

/// Slot assignment, sent once right after a successful join.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerIndexMsg {
    pub player_index: u8,
}

/// Static match data, sent once when a client enters a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStartMsg {
    pub level: LevelDef,
    pub player_count: u8,
}

/// Replicated per-player state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub score: u32,
    pub dead: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiamondSnapshot {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BombSnapshot {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
}

/// Authoritative match state broadcast every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStateMsg {
    pub tick: u32,
    pub phase: GamePhase,
    pub level_num: u32,
    pub players: Vec<PlayerSnapshot>,
    pub diamonds: Vec<DiamondSnapshot>,
    pub bombs: Vec<BombSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScoreEntry {
    pub player_index: u8,
    pub score: u32,
}

/// Sent when a match ends early (e.g. a player left) before the room closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEndMsg {
    pub final_scores: Vec<PlayerScoreEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    JoinRoom(JoinRoomMsg),
    LeaveRoom(LeaveRoomMsg),
    PlayerControls(PlayerControlsMsg),
    StartSignal(StartSignalMsg),
    RestartSignal(RestartSignalMsg),
}

impl ClientMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::JoinRoom(_) => MessageType::JoinRoom,
            Self::LeaveRoom(_) => MessageType::LeaveRoom,
            Self::PlayerControls(_) => MessageType::PlayerControls,
            Self::StartSignal(_) => MessageType::StartSignal,
            Self::RestartSignal(_) => MessageType::RestartSignal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    JoinRoomResponse(JoinRoomResponseMsg),
    PlayerIndex(PlayerIndexMsg),
    MatchStart(MatchStartMsg),
    MatchState(MatchStateMsg),
    MatchEnd(MatchEndMsg),
}

impl ServerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::JoinRoomResponse(_) => MessageType::JoinRoomResponse,
            Self::PlayerIndex(_) => MessageType::PlayerIndex,
            Self::MatchStart(_) => MessageType::MatchStart,
            Self::MatchState(_) => MessageType::MatchState,
            Self::MatchEnd(_) => MessageType::MatchEnd,
        }
    }
}
