use serde::{Deserialize, Serialize};

use crate::constants::{
    EVENT_CHAT_LIST_UPDATED, EVENT_JOIN_ROOM, EVENT_LEAVE_ROOM, EVENT_MESSAGE_DELETED,
    EVENT_RECEIVE_MESSAGE, EVENT_SEND_MESSAGE,
};
use crate::error::Result;
use crate::models::{Attachment, ChatSummary, Message};
use crate::types::{ClientTempId, RoomId, UserId};

/// Events emitted by the client on the realtime channel.
///
/// Framed as `{"event": "<name>", "payload": <value>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum TransportCommand {
    /// Subscribe to a room's events
    JoinRoom(RoomId),

    /// Stop receiving a room's events
    LeaveRoom(RoomId),

    /// Publish a new message
    SendMessage(SendMessagePayload),

    /// Tell other participants a message was deleted
    MessageDeleted(MessageDeletedPayload),
}

/// Events delivered to the client by the realtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum TransportEvent {
    /// A persisted message for a joined room
    ReceiveMessage(Message),

    /// A message was deleted by another participant
    MessageDeleted(MessageDeletedPayload),

    /// A room-list entry changed
    ChatListUpdated(ChatSummary),

    /// The connection is (re-)established. Produced by the transport, never framed.
    #[serde(skip)]
    Connected,

    /// The connection dropped. Produced by the transport, never framed.
    #[serde(skip)]
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub sender_id: UserId,
    /// Counterpart user id for direct rooms, the room id for groups
    pub receiver_id_or_room_id: String,
    pub room_id: RoomId,
    /// Echoed back on the persisted message for reconciliation
    pub client_temp_id: ClientTempId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeletedPayload {
    pub deleted_message: Message,
    pub new_latest_message: Option<Message>,
}

impl TransportCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom(_) => EVENT_JOIN_ROOM,
            Self::LeaveRoom(_) => EVENT_LEAVE_ROOM,
            Self::SendMessage(_) => EVENT_SEND_MESSAGE,
            Self::MessageDeleted(_) => EVENT_MESSAGE_DELETED,
        }
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl TransportEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReceiveMessage(_) => EVENT_RECEIVE_MESSAGE,
            Self::MessageDeleted(_) => EVENT_MESSAGE_DELETED,
            Self::ChatListUpdated(_) => EVENT_CHAT_LIST_UPDATED,
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }

    /// Deserialize from a JSON text frame
    pub fn from_json(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }
}
