//! Ordered, deduplicated in-memory view of one room's messages.
//!
//! Entries are kept sorted by `created_at` ascending and unique by id.
//! Realtime delivery is normally already in order, so [`MessageLog::append`]
//! has a push fast path; out-of-order arrivals and older pages are inserted
//! at their sorted position. History pages and realtime arrivals can overlap,
//! and id deduplication is what keeps that race harmless.

use std::collections::HashSet;

use tracing::{debug, warn};

use parley_shared::models::Message;
use parley_shared::types::{ClientTempId, MessageId, RoomId};

/// Result of matching a server echo against the pending entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The pending entry was substituted; `index` is its final position.
    Replaced { index: usize },
    /// The persisted id was already in the log. Any pending twin was dropped.
    AlreadyPresent,
    /// No pending entry matched; the persisted message was appended.
    Appended,
}

/// A removed entry and its neighbours at the time of removal.
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    pub removed: Message,
    pub previous: Option<Message>,
    pub next: Option<Message>,
}

impl Removal {
    pub fn was_latest(&self) -> bool {
        self.next.is_none()
    }
}

/// What deleting an entry would do to the room's latest message.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletionPreview {
    pub message: Message,
    pub is_latest: bool,
    pub new_latest: Option<Message>,
}

#[derive(Debug, Clone)]
pub struct MessageLog {
    room_id: RoomId,
    entries: Vec<Message>,
    ids: HashSet<MessageId>,
}

impl MessageLog {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            entries: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Insert one message at its sorted position. Returns `false` if the id
    /// is already present or the message belongs to another room.
    pub fn append(&mut self, message: Message) -> bool {
        if message.room_id != self.room_id {
            warn!(
                room = %self.room_id,
                other = %message.room_id,
                msg_id = %message.id,
                "Refusing message for another room"
            );
            return false;
        }
        if self.ids.contains(&message.id) {
            debug!(room = %self.room_id, msg_id = %message.id, "Duplicate message ignored");
            return false;
        }

        let message = message.into_persisted();
        let pos = match self.entries.last() {
            Some(last) if message.created_at < last.created_at => self
                .entries
                .partition_point(|m| m.created_at <= message.created_at),
            _ => self.entries.len(),
        };

        self.ids.insert(message.id.clone());
        self.entries.insert(pos, message);
        true
    }

    /// Insert a page of older messages. Ids already present, repeated within
    /// the page, or belonging to another room are dropped. Returns the number
    /// of entries added.
    pub fn prepend_page(&mut self, page: Vec<Message>) -> usize {
        let mut fresh: Vec<Message> = Vec::with_capacity(page.len());
        for message in page {
            if message.room_id != self.room_id {
                warn!(room = %self.room_id, msg_id = %message.id, "Dropping foreign message from page");
                continue;
            }
            if self.ids.insert(message.id.clone()) {
                fresh.push(message.into_persisted());
            }
        }
        fresh.sort_by_key(|m| m.created_at);

        let added = fresh.len();
        let fits_at_head = match (fresh.last(), self.entries.first()) {
            (Some(newest), Some(oldest)) => newest.created_at <= oldest.created_at,
            _ => true,
        };

        if fits_at_head {
            self.entries.splice(0..0, fresh);
        } else {
            // Overlapping page: place each entry before existing ones with
            // the same timestamp. Walking backwards keeps page order for ties.
            debug!(room = %self.room_id, added, "Merging overlapping history page");
            for message in fresh.into_iter().rev() {
                let pos = self
                    .entries
                    .partition_point(|m| m.created_at < message.created_at);
                self.entries.insert(pos, message);
            }
        }

        added
    }

    /// Swap the pending entry for `temp_id` with its persisted counterpart.
    pub fn replace_pending(&mut self, temp_id: &ClientTempId, persisted: Message) -> Reconciliation {
        let persisted = persisted.into_persisted();
        if persisted.id.as_str() == temp_id.as_str() {
            warn!(room = %self.room_id, temp_id = %temp_id, "Echo reuses the temporary id, ignoring");
            return Reconciliation::AlreadyPresent;
        }

        let pending_pos = self.entries.iter().position(|m| {
            m.is_pending() && m.client_temp_id.as_ref() == Some(temp_id)
        });

        if self.ids.contains(&persisted.id) {
            if let Some(pos) = pending_pos {
                let twin = self.entries.remove(pos);
                self.ids.remove(&twin.id);
                debug!(room = %self.room_id, temp_id = %temp_id, "Dropped pending twin of known message");
            }
            return Reconciliation::AlreadyPresent;
        }

        match pending_pos {
            Some(pos) => {
                self.ids.insert(persisted.id.clone());
                let old = std::mem::replace(&mut self.entries[pos], persisted);
                self.ids.remove(&old.id);
                let index = self.restore_order(pos);
                Reconciliation::Replaced { index }
            }
            None => {
                warn!(
                    room = %self.room_id,
                    temp_id = %temp_id,
                    msg_id = %persisted.id,
                    "Reconciliation miss: no pending entry, appending"
                );
                self.append(persisted);
                Reconciliation::Appended
            }
        }
    }

    /// Remove an entry by id.
    pub fn remove(&mut self, id: &MessageId) -> Option<Removal> {
        let pos = self.position(id)?;
        let removed = self.entries.remove(pos);
        self.ids.remove(&removed.id);

        let previous = pos.checked_sub(1).and_then(|p| self.entries.get(p)).cloned();
        let next = self.entries.get(pos).cloned();

        Some(Removal {
            removed,
            previous,
            next,
        })
    }

    /// Preview deleting `id`: the second-to-last entry becomes latest when
    /// the last one goes, otherwise the latest is unchanged.
    pub fn preview_deletion(&self, id: &MessageId) -> Option<DeletionPreview> {
        let pos = self.position(id)?;
        let is_latest = pos + 1 == self.entries.len();
        let new_latest = if is_latest {
            pos.checked_sub(1).and_then(|p| self.entries.get(p)).cloned()
        } else {
            self.entries.last().cloned()
        };

        Some(DeletionPreview {
            message: self.entries[pos].clone(),
            is_latest,
            new_latest,
        })
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|m| m.is_pending()).count()
    }

    pub fn messages(&self) -> &[Message] {
        &self.entries
    }

    pub fn last(&self) -> Option<&Message> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: &MessageId) -> Option<usize> {
        if !self.ids.contains(id) {
            return None;
        }
        self.entries.iter().position(|m| &m.id == id)
    }

    // The server timestamp may differ from the local one; move the entry if
    // it no longer fits between its neighbours.
    fn restore_order(&mut self, pos: usize) -> usize {
        let ts = self.entries[pos].created_at;
        let before_ok = pos == 0 || self.entries[pos - 1].created_at <= ts;
        let after_ok = pos + 1 >= self.entries.len() || ts <= self.entries[pos + 1].created_at;
        if before_ok && after_ok {
            return pos;
        }

        let entry = self.entries.remove(pos);
        let target = self.entries.partition_point(|m| m.created_at <= ts);
        self.entries.insert(target, entry);
        debug!(room = %self.room_id, from = pos, to = target, "Moved reconciled message");
        target
    }
}
