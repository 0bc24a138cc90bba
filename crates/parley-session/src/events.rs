use serde::Serialize;
use tokio::sync::mpsc;

use parley_shared::models::{ChatSummary, Message};
use parley_shared::types::{ClientTempId, MessageId, RoomId};

/// Everything the session tells its UI.
///
/// Serialized as `{"type": "<kebab-name>", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum SessionUpdate {
    #[serde(rename_all = "camelCase")]
    RoomJoined { room_id: RoomId },

    #[serde(rename_all = "camelCase")]
    HistoryLoaded {
        room_id: RoomId,
        /// `false` for the initial page
        older: bool,
        added: usize,
        has_more_older: bool,
    },

    /// A new entry in the open room: a pending local echo or a live arrival
    MessageAppended(Message),

    #[serde(rename_all = "camelCase")]
    MessageReconciled { temp_id: ClientTempId, message: Message },

    #[serde(rename_all = "camelCase")]
    MessageRemoved {
        message_id: MessageId,
        new_latest_message: Option<Message>,
    },

    /// The full room list, most recent first
    ChatListChanged(Vec<ChatSummary>),

    #[serde(rename_all = "camelCase")]
    FetchFailed { room_id: RoomId, reason: String },

    #[serde(rename_all = "camelCase")]
    SendFailed { reason: String },

    #[serde(rename_all = "camelCase")]
    DeleteFailed { message_id: MessageId, reason: String },

    #[serde(rename_all = "camelCase")]
    ValidationFailed { reason: String },

    /// The room does not exist; the view should redirect after the delay.
    #[serde(rename_all = "camelCase")]
    NotFound { room_id: RoomId, redirect_after_ms: u64 },

    ConnectionChanged { connected: bool },
}

impl SessionUpdate {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomJoined { .. } => "room-joined",
            Self::HistoryLoaded { .. } => "history-loaded",
            Self::MessageAppended(_) => "message-appended",
            Self::MessageReconciled { .. } => "message-reconciled",
            Self::MessageRemoved { .. } => "message-removed",
            Self::ChatListChanged(_) => "chat-list-changed",
            Self::FetchFailed { .. } => "fetch-failed",
            Self::SendFailed { .. } => "send-failed",
            Self::DeleteFailed { .. } => "delete-failed",
            Self::ValidationFailed { .. } => "validation-failed",
            Self::NotFound { .. } => "not-found",
            Self::ConnectionChanged { .. } => "connection-changed",
        }
    }
}

pub async fn emit_update(tx: &mpsc::Sender<SessionUpdate>, update: SessionUpdate) {
    let event = update.name();
    if tx.send(update).await.is_err() {
        tracing::error!(event, "Failed to emit update, receiver dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_wire_shape() {
        let update = SessionUpdate::NotFound {
            room_id: RoomId("g1".into()),
            redirect_after_ms: 3000,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["type"], update.name());
        assert_eq!(json["payload"]["roomId"], "g1");
        assert_eq!(json["payload"]["redirectAfterMs"], 3000);
    }
}
