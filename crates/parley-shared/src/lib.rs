//! # parley-shared
//!
//! Types shared by the transport and session crates: identifiers, the
//! message model, realtime wire events and the error taxonomy.

pub mod constants;
pub mod error;
pub mod models;
pub mod protocol;
pub mod types;

pub use error::{NotFoundError, ParleyError, Result, ValidationError};
pub use models::{Attachment, ChatSummary, Message, OutgoingMessage};
pub use protocol::{MessageDeletedPayload, SendMessagePayload, TransportCommand, TransportEvent};
pub use types::{ClientTempId, ConnectionState, MessageId, Room, RoomId, RoomKind, UserId};
