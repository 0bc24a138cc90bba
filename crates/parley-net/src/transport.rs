//! Client handle to the realtime channel.
//!
//! The channel itself runs in its own task (see [`crate::websocket`]). Code
//! that wants to emit events holds a cloneable [`Transport`], which only
//! forwards typed [`TransportCommand`]s over an mpsc queue. Inbound events
//! arrive on a separate `mpsc::Receiver<TransportEvent>`.

use tokio::sync::mpsc;
use tracing::debug;

use parley_shared::error::{ParleyError, Result};
use parley_shared::protocol::{MessageDeletedPayload, SendMessagePayload, TransportCommand};
use parley_shared::types::RoomId;

/// Sending half of the shared realtime connection.
#[derive(Debug, Clone)]
pub struct Transport {
    cmd_tx: mpsc::Sender<TransportCommand>,
}

impl Transport {
    pub fn new(cmd_tx: mpsc::Sender<TransportCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Queue a command for the connection task.
    pub async fn emit(&self, command: TransportCommand) -> Result<()> {
        let event = command.name();
        debug!(event, "Queueing realtime event");
        self.cmd_tx
            .send(command)
            .await
            .map_err(|_| ParleyError::Network(format!("realtime channel closed, dropped {event}")))
    }

    pub async fn join_room(&self, room_id: &RoomId) -> Result<()> {
        self.emit(TransportCommand::JoinRoom(room_id.clone())).await
    }

    pub async fn leave_room(&self, room_id: &RoomId) -> Result<()> {
        self.emit(TransportCommand::LeaveRoom(room_id.clone())).await
    }

    pub async fn send_message(&self, payload: SendMessagePayload) -> Result<()> {
        self.emit(TransportCommand::SendMessage(payload)).await
    }

    pub async fn announce_deletion(&self, payload: MessageDeletedPayload) -> Result<()> {
        self.emit(TransportCommand::MessageDeleted(payload)).await
    }
}

/// In-process transport: every emitted command lands on the returned
/// receiver. Lets callers plug in their own connection, and backs tests.
pub fn channel(capacity: usize) -> (Transport, mpsc::Receiver<TransportCommand>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(capacity.max(1));
    (Transport::new(cmd_tx), cmd_rx)
}
