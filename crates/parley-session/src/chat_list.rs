//! Room list: one summary per room, most recent first.

use std::collections::HashMap;

use tracing::debug;

use parley_shared::models::{ChatSummary, Message};
use parley_shared::protocol::MessageDeletedPayload;
use parley_shared::types::RoomId;

#[derive(Debug, Clone, Default)]
pub struct ChatList {
    rooms: HashMap<RoomId, ChatSummary>,
}

impl ChatList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a summary. An older `updated_at` never overwrites a
    /// newer one. Returns whether the list changed.
    pub fn upsert(&mut self, summary: ChatSummary) -> bool {
        match self.rooms.get(&summary.room_id) {
            Some(existing) if existing.updated_at > summary.updated_at => {
                debug!(room = %summary.room_id, "Ignoring outdated chat summary");
                false
            }
            Some(existing) if *existing == summary => false,
            _ => {
                self.rooms.insert(summary.room_id.clone(), summary);
                true
            }
        }
    }

    /// A message was sent or received in some room.
    pub fn record_message(&mut self, message: &Message) -> bool {
        if message.is_pending() {
            return false;
        }
        self.upsert(ChatSummary {
            room_id: message.room_id.clone(),
            latest_message: Some(message.clone()),
            updated_at: message.created_at,
        })
    }

    /// Apply a deletion. Only matters when the deleted message is the one
    /// the summary currently shows.
    pub fn apply_deletion(&mut self, payload: &MessageDeletedPayload) -> bool {
        let deleted = &payload.deleted_message;
        let Some(summary) = self.rooms.get_mut(&deleted.room_id) else {
            return false;
        };
        if summary.latest_message.as_ref().map(|m| &m.id) != Some(&deleted.id) {
            return false;
        }

        summary.latest_message = payload.new_latest_message.clone();
        if let Some(latest) = &summary.latest_message {
            summary.updated_at = latest.created_at;
        }
        true
    }

    /// Replace everything with a fresh server listing.
    pub fn replace_all(&mut self, summaries: Vec<ChatSummary>) {
        self.rooms = summaries
            .into_iter()
            .map(|s| (s.room_id.clone(), s))
            .collect();
    }

    /// Summaries, most recently updated first. Ties break on room id so the
    /// order is stable.
    pub fn sorted(&self) -> Vec<ChatSummary> {
        let mut list: Vec<ChatSummary> = self.rooms.values().cloned().collect();
        list.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.room_id.cmp(&b.room_id))
        });
        list
    }

    pub fn get(&self, room_id: &RoomId) -> Option<&ChatSummary> {
        self.rooms.get(room_id)
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
