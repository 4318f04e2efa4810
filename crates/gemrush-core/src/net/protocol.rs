use serde::{Deserialize, Serialize};

use super::messages::{
    ClientMessage, JoinRoomMsg, JoinRoomResponseMsg, LeaveRoomMsg, MatchEndMsg, MatchStartMsg,
    MatchStateMsg, MessageType, PlayerControlsMsg, PlayerIndexMsg, RestartSignalMsg,
    ServerMessage, StartSignalMsg,
};

/// Current protocol version. Clients with a different non-zero version
/// are rejected at join time.
pub const PROTOCOL_VERSION: u8 = 1;

/// Default match tick interval in milliseconds (20 Hz).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;

/// Maximum message payload size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(f, "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})")
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::JoinRoom(m) => encode_message(MessageType::JoinRoom, m),
        ClientMessage::LeaveRoom(m) => encode_message(MessageType::LeaveRoom, m),
        ClientMessage::PlayerControls(m) => encode_message(MessageType::PlayerControls, m),
        ClientMessage::StartSignal(m) => encode_message(MessageType::StartSignal, m),
        ClientMessage::RestartSignal(m) => encode_message(MessageType::RestartSignal, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::JoinRoomResponse(m) => encode_message(MessageType::JoinRoomResponse, m),
        ServerMessage::PlayerIndex(m) => encode_message(MessageType::PlayerIndex, m),
        ServerMessage::MatchStart(m) => encode_message(MessageType::MatchStart, m),
        ServerMessage::MatchState(m) => encode_message(MessageType::MatchState, m),
        ServerMessage::MatchEnd(m) => encode_message(MessageType::MatchEnd, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    MessageType::from_byte(data[0]).ok_or(ProtocolError::UnknownMessageType(data[0]))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::JoinRoom => Ok(ClientMessage::JoinRoom(decode_payload::<JoinRoomMsg>(
            data,
        )?)),
        MessageType::LeaveRoom => Ok(ClientMessage::LeaveRoom(decode_payload::<LeaveRoomMsg>(
            data,
        )?)),
        MessageType::PlayerControls => Ok(ClientMessage::PlayerControls(decode_payload::<
            PlayerControlsMsg,
        >(data)?)),
        MessageType::StartSignal => Ok(ClientMessage::StartSignal(
            decode_payload::<StartSignalMsg>(data)?,
        )),
        MessageType::RestartSignal => Ok(ClientMessage::RestartSignal(decode_payload::<
            RestartSignalMsg,
        >(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::JoinRoomResponse => Ok(ServerMessage::JoinRoomResponse(decode_payload::<
            JoinRoomResponseMsg,
        >(data)?)),
        MessageType::PlayerIndex => Ok(ServerMessage::PlayerIndex(
            decode_payload::<PlayerIndexMsg>(data)?,
        )),
        MessageType::MatchStart => Ok(ServerMessage::MatchStart(decode_payload::<MatchStartMsg>(
            data,
        )?)),
        MessageType::MatchState => Ok(ServerMessage::MatchState(decode_payload::<MatchStateMsg>(
            data,
        )?)),
        MessageType::MatchEnd => Ok(ServerMessage::MatchEnd(decode_payload::<MatchEndMsg>(
            data,
        )?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
