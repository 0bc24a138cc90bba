//! Domain records exchanged with the REST API and the realtime channel.
//!
//! Every struct derives `Serialize` and `Deserialize` with camelCase field
//! names so it matches the server's JSON directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_CONTENT_CHARS;
use crate::error::ValidationError;
use crate::types::{ClientTempId, MessageId, RoomId, UserId};

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// An image already uploaded elsewhere, referenced by URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl Attachment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::InvalidAttachment("empty url".into()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ValidationError::InvalidAttachment(format!(
                "non-positive dimensions {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.
///
/// Persisted messages carry a server id. Pending messages are stored under
/// their `client_temp_id` until the server echo arrives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_temp_id: Option<ClientTempId>,
}

impl Message {
    /// Build the optimistic local echo of an outgoing message.
    pub fn pending(
        temp_id: ClientTempId,
        room_id: RoomId,
        sender_id: UserId,
        body: OutgoingMessage,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: temp_id.to_message_id(),
            room_id,
            sender_id,
            content: body.content,
            attachments: body.attachments,
            created_at,
            client_temp_id: Some(temp_id),
        }
    }

    /// A pending message is stored under its own temporary id.
    pub fn is_pending(&self) -> bool {
        self.client_temp_id
            .as_ref()
            .is_some_and(|tmp| tmp.as_str() == self.id.as_str())
    }

    /// Drop the echoed temporary id once the message is confirmed.
    pub fn into_persisted(mut self) -> Self {
        if !self.is_pending() {
            self.client_temp_id = None;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Outgoing body
// ---------------------------------------------------------------------------

/// What the user submits: text or a set of attachments, never both.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub content: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            attachments: Vec::new(),
        }
    }

    pub fn attachments(attachments: Vec<Attachment>) -> Self {
        Self {
            content: None,
            attachments,
        }
    }

    /// Check the body and normalise whitespace-only content to `None`.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let content = self.content.filter(|c| !c.trim().is_empty());

        match (&content, self.attachments.is_empty()) {
            (None, true) => return Err(ValidationError::EmptyMessage),
            (Some(_), false) => return Err(ValidationError::MixedBody),
            _ => {}
        }

        if let Some(text) = &content {
            let len = text.chars().count();
            if len > MAX_CONTENT_CHARS {
                return Err(ValidationError::ContentTooLong {
                    len,
                    max: MAX_CONTENT_CHARS,
                });
            }
        }

        for attachment in &self.attachments {
            attachment.validate()?;
        }

        Ok(Self {
            content,
            attachments: self.attachments,
        })
    }
}

// ---------------------------------------------------------------------------
// Chat summary
// ---------------------------------------------------------------------------

/// Room-list entry: the latest message of a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub room_id: RoomId,
    #[serde(default)]
    pub latest_message: Option<Message>,
    pub updated_at: DateTime<Utc>,
}
