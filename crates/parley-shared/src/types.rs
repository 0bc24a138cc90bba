use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::MAX_USER_ID_LEN;
use crate::error::ValidationError;

// User identity = opaque server-assigned id. Deserialization goes through
// `UserId::parse`, so every instance is well-formed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Parse a user id, rejecting anything that is not 1..=64 ASCII
    /// alphanumerics, `-` or `_`.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let well_formed = !s.is_empty()
            && s.len() <= MAX_USER_ID_LEN
            && s
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !well_formed {
            return Err(ValidationError::InvalidUserId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl TryFrom<String> for UserId {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Deterministic id of the direct room between two users: both ids in
    /// sorted order, concatenated. Either participant derives the same id.
    pub fn direct(a: &UserId, b: &UserId) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{}{}", first.as_str(), second.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Locally generated id carried by a pending message through the
/// send → echo round trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ClientTempId(pub String);

impl ClientTempId {
    pub fn generate() -> Self {
        Self(format!("tmp-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id a pending message is stored under until it is confirmed.
    pub fn to_message_id(&self) -> MessageId {
        MessageId(self.0.clone())
    }
}

impl std::fmt::Display for ClientTempId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Direct,
    Group,
}

/// A conversation scope. Direct rooms have exactly two members.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub kind: RoomKind,
    pub member_ids: BTreeSet<UserId>,
}

impl Room {
    /// Direct room between two distinct users.
    pub fn direct(a: &str, b: &str) -> Result<Self, ValidationError> {
        let a = UserId::parse(a)?;
        let b = UserId::parse(b)?;
        if a == b {
            return Err(ValidationError::SelfConversation(a.to_string()));
        }
        Ok(Self {
            id: RoomId::direct(&a, &b),
            kind: RoomKind::Direct,
            member_ids: [a, b].into_iter().collect(),
        })
    }

    /// Group room with a server-assigned id.
    pub fn group(id: RoomId, members: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            id,
            kind: RoomKind::Group,
            member_ids: members.into_iter().collect(),
        }
    }

    /// The other participant of a direct room, from `me`'s point of view.
    pub fn counterpart(&self, me: &UserId) -> Option<&UserId> {
        match self.kind {
            RoomKind::Direct => self.member_ids.iter().find(|m| *m != me),
            RoomKind::Group => None,
        }
    }

    /// Value used as `selectedUser` / `receiverIdOrRoomId` on the wire:
    /// the counterpart for direct rooms, the room id for groups.
    pub fn addressee(&self, me: &UserId) -> String {
        match self.counterpart(me) {
            Some(other) => other.to_string(),
            None => self.id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}
