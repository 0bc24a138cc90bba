use thiserror::Error;

use crate::types::{MessageId, RoomId};

#[derive(Error, Debug)]
pub enum ParleyError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Room is not active: {0}")]
    RoomNotActive(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message has neither content nor attachments")]
    EmptyMessage,

    #[error("Message cannot carry both content and attachments")]
    MixedBody,

    #[error("Message content is {len} characters (max {max})")]
    ContentTooLong { len: usize, max: usize },

    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    #[error("Malformed user id: {0:?}")]
    InvalidUserId(String),

    #[error("Direct room needs two distinct users, got {0} twice")]
    SelfConversation(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("Room {0} not found")]
    Room(RoomId),

    #[error("Message {0} not found")]
    Message(MessageId),
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ParleyError>;
