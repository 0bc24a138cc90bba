//! Lifecycle of "being in a room".
//!
//! The controller is the only owner of the active room's [`MessageLog`]. It
//! performs no history I/O itself: opening a room or paging back hands out
//! a [`FetchTicket`], the caller runs the fetch wherever it likes, and
//! [`SessionController::apply_fetch`] applies the result only if the ticket
//! still matches the active room. A fetch that resolves after a room switch
//! is dropped without touching any log.
//!
//! Per room: `Closed -> Joining -> Active -> Closed`. Sending and paging are
//! refused while `Joining`.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use parley_net::history::{HistoryFetcher, HistoryPage};
use parley_net::transport::Transport;
use parley_shared::error::{NotFoundError, ParleyError, Result};
use parley_shared::models::{Message, OutgoingMessage};
use parley_shared::protocol::{MessageDeletedPayload, SendMessagePayload};
use parley_shared::types::{ClientTempId, ConnectionState, MessageId, Room, RoomId};

use crate::cursor::PaginationCursor;
use crate::message_log::{MessageLog, Reconciliation, Removal};
use crate::state::SessionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoomPhase {
    Closed,
    Joining,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Initial,
    Older { skip_amount: usize },
}

/// Permission to apply one history fetch to one room generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub room: Room,
    pub generation: u64,
    pub kind: FetchKind,
}

#[derive(Debug)]
pub enum FetchOutcome {
    /// The page was merged into the log.
    Applied {
        kind: FetchKind,
        added: usize,
        has_more_older: bool,
    },
    /// The ticket belongs to a room that is no longer active.
    Stale,
    /// The fetch failed; the log is unchanged.
    Failed { kind: FetchKind, error: ParleyError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    Appended,
    /// A pending entry was replaced by its persisted counterpart.
    Reconciled { temp_id: ClientTempId, index: usize },
    Duplicate,
    /// Not for the active room (or no room is open).
    Ignored,
}

/// A local deletion waiting for the server's confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDeletion {
    pub room_id: RoomId,
    pub generation: u64,
    pub message: Message,
    pub is_latest: bool,
    /// Latest message once this one is gone, as seen when the deletion
    /// started. Announced if the room is no longer open on confirmation.
    pub new_latest: Option<Message>,
}

/// Read-only view handed to the UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub room_id: Option<RoomId>,
    pub phase: RoomPhase,
    pub messages: Vec<Message>,
    /// Sent messages still waiting for the server echo
    pub pending_count: usize,
    pub cursor: Option<PaginationCursor>,
    pub loading_older: bool,
    pub connected: bool,
}

struct OpenRoom {
    room: Room,
    phase: RoomPhase,
    generation: u64,
    log: MessageLog,
    cursor: PaginationCursor,
    older_in_flight: bool,
}

pub struct SessionController {
    context: SessionContext,
    transport: Transport,
    current: Option<OpenRoom>,
    watched: HashSet<RoomId>,
    next_generation: u64,
    connection: ConnectionState,
}

impl SessionController {
    pub fn new(context: SessionContext, transport: Transport) -> Self {
        Self {
            context,
            transport,
            current: None,
            watched: HashSet::new(),
            next_generation: 0,
            connection: ConnectionState::Connected,
        }
    }

    // -----------------------------------------------------------------------
    // Room lifecycle
    // -----------------------------------------------------------------------

    /// Enter `room`, leaving any other open room first.
    ///
    /// Returns the initial fetch to run, or `None` if `room` is already open.
    pub async fn open_room(&mut self, room: Room) -> Result<Option<FetchTicket>> {
        if let Some(open) = &self.current {
            if open.room.id == room.id {
                debug!(room = %room.id, "Room already open, join skipped");
                return Ok(None);
            }
        }

        self.close_room().await;

        self.next_generation += 1;
        let generation = self.next_generation;

        self.transport.join_room(&room.id).await?;

        info!(room = %room.id, kind = ?room.kind, generation, "Joining room");
        self.current = Some(OpenRoom {
            log: MessageLog::new(room.id.clone()),
            room: room.clone(),
            phase: RoomPhase::Joining,
            generation,
            cursor: PaginationCursor::new(),
            older_in_flight: false,
        });

        Ok(Some(FetchTicket {
            room,
            generation,
            kind: FetchKind::Initial,
        }))
    }

    /// Leave the open room and discard its log. Returns the room left.
    pub async fn close_room(&mut self) -> Option<RoomId> {
        let open = self.current.take()?;
        let room_id = open.room.id;

        // Rooms watched for the room list stay joined.
        if !self.watched.contains(&room_id) {
            if let Err(e) = self.transport.leave_room(&room_id).await {
                warn!(room = %room_id, error = %e, "Failed to emit leave-room");
            }
        }

        info!(room = %room_id, discarded = open.log.len(), "Left room");
        Some(room_id)
    }

    /// Subscribe to rooms for room-list notifications only.
    pub async fn watch_rooms(&mut self, room_ids: impl IntoIterator<Item = RoomId>) -> Result<usize> {
        let mut joined = 0;
        for room_id in room_ids {
            if self.watched.insert(room_id.clone()) {
                self.transport.join_room(&room_id).await?;
                joined += 1;
            }
        }
        debug!(joined, total = self.watched.len(), "Watching rooms");
        Ok(joined)
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Ticket for the next older page, if paging is possible right now.
    pub fn request_older(&mut self) -> Result<Option<FetchTicket>> {
        let open = self.active_room_mut()?;
        if open.older_in_flight || !open.cursor.has_more_older() {
            return Ok(None);
        }

        open.older_in_flight = true;
        let skip_amount = open.cursor.skip_amount();
        debug!(room = %open.room.id, skip = skip_amount, "Requesting older page");

        Ok(Some(FetchTicket {
            room: open.room.clone(),
            generation: open.generation,
            kind: FetchKind::Older { skip_amount },
        }))
    }

    /// Apply a finished fetch if its ticket still matches the active room.
    pub fn apply_fetch(&mut self, ticket: FetchTicket, result: Result<HistoryPage>) -> FetchOutcome {
        let open = match self.current.as_mut() {
            Some(open) if open.room.id == ticket.room.id && open.generation == ticket.generation => open,
            _ => {
                debug!(
                    room = %ticket.room.id,
                    generation = ticket.generation,
                    "Discarding stale history fetch"
                );
                return FetchOutcome::Stale;
            }
        };

        if let FetchKind::Older { .. } = ticket.kind {
            open.older_in_flight = false;
        }
        // A failed initial fetch still activates the room: the log is empty
        // and paging back from offset 0 doubles as the retry.
        open.phase = RoomPhase::Active;

        match result {
            Ok(page) => {
                let fetched = page.messages.len();
                let added = open.log.prepend_page(page.messages);
                open.cursor.advance(fetched, page.has_more_older);

                info!(
                    room = %open.room.id,
                    kind = ?ticket.kind,
                    fetched,
                    added,
                    has_more_older = page.has_more_older,
                    "History applied"
                );

                FetchOutcome::Applied {
                    kind: ticket.kind,
                    added,
                    has_more_older: page.has_more_older,
                }
            }
            Err(error) => {
                warn!(room = %open.room.id, kind = ?ticket.kind, error = %error, "History fetch failed");
                FetchOutcome::Failed {
                    kind: ticket.kind,
                    error,
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    /// Validate, echo locally, and emit. Does not wait for the server.
    pub async fn send_message(&mut self, body: OutgoingMessage) -> Result<Message> {
        let body = body.validate()?;
        let user = self.context.user.clone();
        let open = self.current.as_mut().ok_or_else(|| {
            ParleyError::RoomNotActive("no room is open".into())
        })?;
        if open.phase != RoomPhase::Active {
            return Err(ParleyError::RoomNotActive(format!("{} is still joining", open.room.id)));
        }
        // Nothing is queued for later delivery while the channel is down.
        if self.connection == ConnectionState::Disconnected {
            return Err(ParleyError::Network("realtime channel is disconnected".into()));
        }

        let temp_id = ClientTempId::generate();
        let pending = Message::pending(
            temp_id.clone(),
            open.room.id.clone(),
            user.clone(),
            body.clone(),
            Utc::now(),
        );
        open.log.append(pending.clone());

        let payload = SendMessagePayload {
            content: body.content,
            attachments: body.attachments,
            receiver_id_or_room_id: open.room.addressee(&user),
            sender_id: user,
            room_id: open.room.id.clone(),
            client_temp_id: temp_id.clone(),
        };

        if let Err(e) = self.transport.send_message(payload).await {
            // Nothing will ever confirm this entry.
            open.log.remove(&pending.id);
            return Err(e);
        }

        debug!(room = %open.room.id, temp_id = %temp_id, "Message sent");
        Ok(pending)
    }

    /// Route a persisted message from the realtime channel.
    pub fn receive_message(&mut self, message: Message) -> ReceiveOutcome {
        let own_user = &self.context.user;
        let Some(open) = self.current.as_mut() else {
            return ReceiveOutcome::Ignored;
        };
        if message.room_id != open.room.id {
            debug!(room = %open.room.id, other = %message.room_id, "Ignoring message for another room");
            return ReceiveOutcome::Ignored;
        }
        if message.is_pending() {
            warn!(msg_id = %message.id, "Ignoring unconfirmed message from the wire");
            return ReceiveOutcome::Ignored;
        }

        let outcome = match message.client_temp_id.clone() {
            Some(temp_id) if &message.sender_id == own_user => {
                match open.log.replace_pending(&temp_id, message) {
                    Reconciliation::Replaced { index } => ReceiveOutcome::Reconciled { temp_id, index },
                    Reconciliation::AlreadyPresent => ReceiveOutcome::Duplicate,
                    Reconciliation::Appended => ReceiveOutcome::Appended,
                }
            }
            _ => {
                if open.log.append(message) {
                    ReceiveOutcome::Appended
                } else {
                    ReceiveOutcome::Duplicate
                }
            }
        };

        // Not counted while Joining: the initial page may already hold it.
        // An undercount only makes the next older page overlap by one entry.
        if open.phase == RoomPhase::Active
            && matches!(outcome, ReceiveOutcome::Appended | ReceiveOutcome::Reconciled { .. })
        {
            open.cursor.note_live_message();
        }
        outcome
    }

    /// Apply a deletion announced by another participant.
    pub fn handle_remote_deletion(&mut self, payload: &MessageDeletedPayload) -> Option<Removal> {
        let open = self.current.as_mut()?;
        if payload.deleted_message.room_id != open.room.id {
            return None;
        }
        let removal = open.log.remove(&payload.deleted_message.id)?;
        open.cursor.note_removed();
        debug!(room = %open.room.id, msg_id = %removal.removed.id, "Message removed remotely");
        Some(removal)
    }

    /// First half of a deletion: check the message exists locally.
    pub fn prepare_delete(&self, id: &MessageId) -> Result<PendingDeletion> {
        let open = self
            .current
            .as_ref()
            .ok_or_else(|| ParleyError::RoomNotActive("no room is open".into()))?;

        let preview = open
            .log
            .preview_deletion(id)
            .filter(|p| !p.message.is_pending())
            .ok_or_else(|| NotFoundError::Message(id.clone()))?;

        Ok(PendingDeletion {
            room_id: open.room.id.clone(),
            generation: open.generation,
            message: preview.message,
            is_latest: preview.is_latest,
            new_latest: preview.new_latest,
        })
    }

    /// Second half, after the server confirmed: remove locally and tell the
    /// other participants. The announcement goes out even if the room was
    /// switched meanwhile, since the server-side deletion already happened.
    pub async fn finish_delete(&mut self, pending: PendingDeletion) -> Result<MessageDeletedPayload> {
        let mut new_latest = pending.new_latest;

        match self.current.as_mut() {
            Some(open) if open.room.id == pending.room_id && open.generation == pending.generation => {
                if let Some(removal) = open.log.remove(&pending.message.id) {
                    open.cursor.note_removed();
                    new_latest = if removal.was_latest() {
                        removal.previous
                    } else {
                        open.log.last().cloned()
                    };
                }
            }
            _ => {
                debug!(room = %pending.room_id, msg_id = %pending.message.id, "Deleted message no longer displayed");
            }
        }

        let payload = MessageDeletedPayload {
            deleted_message: pending.message,
            new_latest_message: new_latest,
        };
        self.transport.announce_deletion(payload.clone()).await?;

        info!(room = %pending.room_id, msg_id = %payload.deleted_message.id, "Message deleted");
        Ok(payload)
    }

    /// Delete a message: local check, server call, local removal and
    /// announcement. A server failure leaves the log unchanged.
    pub async fn delete_message(&mut self, id: &MessageId, fetcher: &HistoryFetcher) -> Result<MessageDeletedPayload> {
        let pending = self.prepare_delete(id)?;
        fetcher.delete_message(id, pending.is_latest).await?;
        self.finish_delete(pending).await
    }

    // -----------------------------------------------------------------------
    // Connection
    // -----------------------------------------------------------------------

    /// Track connection changes. After a reconnect every joined room is
    /// joined again, since the server forgets subscriptions.
    pub async fn set_connection(&mut self, state: ConnectionState) -> Result<()> {
        let was = std::mem::replace(&mut self.connection, state);
        if was == state {
            return Ok(());
        }
        info!(?state, "Connection state changed");

        if state == ConnectionState::Connected {
            if let Some(open) = &self.current {
                self.transport.join_room(&open.room.id).await?;
            }
            for room_id in &self.watched {
                if self.current.as_ref().map(|o| &o.room.id) != Some(room_id) {
                    self.transport.join_room(room_id).await?;
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> RoomPhase {
        self.current.as_ref().map_or(RoomPhase::Closed, |o| o.phase)
    }

    pub fn room(&self) -> Option<&Room> {
        self.current.as_ref().map(|o| &o.room)
    }

    pub fn log(&self) -> Option<&MessageLog> {
        self.current.as_ref().map(|o| &o.log)
    }

    pub fn cursor(&self) -> Option<PaginationCursor> {
        self.current.as_ref().map(|o| o.cursor)
    }

    /// Active, more history, and no older fetch in flight.
    pub fn can_load_older(&self) -> bool {
        self.current.as_ref().is_some_and(|o| {
            o.phase == RoomPhase::Active && o.cursor.has_more_older() && !o.older_in_flight
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            room_id: self.room().map(|r| r.id.clone()),
            phase: self.phase(),
            messages: self.log().map(|l| l.messages().to_vec()).unwrap_or_default(),
            pending_count: self.log().map_or(0, MessageLog::pending_count),
            cursor: self.cursor(),
            loading_older: self.current.as_ref().is_some_and(|o| o.older_in_flight),
            connected: self.connection == ConnectionState::Connected,
        }
    }

    fn active_room_mut(&mut self) -> Result<&mut OpenRoom> {
        match self.current.as_mut() {
            Some(open) if open.phase == RoomPhase::Active => Ok(open),
            Some(open) => Err(ParleyError::RoomNotActive(format!("{} is still joining", open.room.id))),
            None => Err(ParleyError::RoomNotActive("no room is open".into())),
        }
    }
}
