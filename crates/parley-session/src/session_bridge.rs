//! The session loop: one task owning the [`SessionController`].
//!
//! UI commands, realtime events and finished background I/O all funnel into
//! a single `select!`, so the controller is only ever touched from one
//! place. History reads, deletions and chat-list polls run in spawned tasks
//! and report back through an internal completion channel.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use parley_net::history::{HistoryApi, HistoryFetcher, HistoryPage};
use parley_net::http::HttpApiClient;
use parley_net::transport::Transport;
use parley_net::websocket::spawn_websocket_transport;
use parley_shared::error::{NotFoundError, ParleyError, Result};
use parley_shared::models::{ChatSummary, Message, OutgoingMessage};
use parley_shared::protocol::{MessageDeletedPayload, TransportEvent};
use parley_shared::types::{ConnectionState, MessageId, Room, RoomId};

use crate::chat_list::ChatList;
use crate::config::SessionConfig;
use crate::controller::{
    FetchKind, FetchOutcome, FetchTicket, PendingDeletion, ReceiveOutcome, SessionController,
    SessionSnapshot,
};
use crate::events::{emit_update, SessionUpdate};
use crate::state::SessionContext;

/// Requests from the UI.
#[derive(Debug)]
pub enum SessionCommand {
    OpenRoom(Room),
    CloseRoom,
    SendMessage(OutgoingMessage),
    DeleteMessage(MessageId),
    LoadOlder,
    WatchRooms(Vec<RoomId>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown,
}

enum Completion {
    Fetch(FetchTicket, Result<HistoryPage>),
    Delete(PendingDeletion, Result<()>),
    ChatList(Result<Vec<ChatSummary>>),
}

/// Connect to the configured server and start the session.
pub async fn connect_session(
    context: SessionContext,
    config: &SessionConfig,
) -> Result<(mpsc::Sender<SessionCommand>, mpsc::Receiver<SessionUpdate>)> {
    let api = HttpApiClient::new(&config.api_url, config.http_timeout)?;
    let (transport, events_rx) =
        spawn_websocket_transport(&config.ws_url, config.channel_capacity, config.reconnect).await?;
    Ok(start_session_bridge(context, config, transport, events_rx, Arc::new(api)))
}

/// Spawn the session loop over an existing transport and API.
pub fn start_session_bridge(
    context: SessionContext,
    config: &SessionConfig,
    transport: Transport,
    events_rx: mpsc::Receiver<TransportEvent>,
    api: Arc<dyn HistoryApi>,
) -> (mpsc::Sender<SessionCommand>, mpsc::Receiver<SessionUpdate>) {
    let capacity = config.channel_capacity.max(1);
    let (cmd_tx, cmd_rx) = mpsc::channel(capacity);
    let (update_tx, update_rx) = mpsc::channel(capacity);
    let (completion_tx, completion_rx) = mpsc::channel(capacity);

    let fetcher = HistoryFetcher::new(api, context.user.clone())
        .with_page_sizes(config.direct_page_size, config.group_page_size);

    let poll = config.chat_list_poll.map(|period| {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    info!(user = %context.user, poll = ?config.chat_list_poll, "Starting session");

    let bridge = SessionBridge {
        controller: SessionController::new(context, transport),
        fetcher,
        chat_list: ChatList::new(),
        update_tx,
        completion_tx,
        not_found_redirect_ms: config.not_found_redirect.as_millis() as u64,
    };

    tokio::spawn(session_loop(bridge, cmd_rx, events_rx, completion_rx, poll));

    (cmd_tx, update_rx)
}

struct SessionBridge {
    controller: SessionController,
    fetcher: HistoryFetcher,
    chat_list: ChatList,
    update_tx: mpsc::Sender<SessionUpdate>,
    completion_tx: mpsc::Sender<Completion>,
    not_found_redirect_ms: u64,
}

async fn session_loop(
    mut bridge: SessionBridge,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    mut events_rx: mpsc::Receiver<TransportEvent>,
    mut completion_rx: mpsc::Receiver<Completion>,
    mut poll: Option<Interval>,
) {
    let mut events_open = true;

    loop {
        tokio::select! {
            // --- UI commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Shutdown) => {
                        info!("Session shutdown requested");
                        break;
                    }
                    Some(cmd) => bridge.handle_command(cmd).await,
                    None => {
                        info!("Command channel closed, shutting down session");
                        break;
                    }
                }
            }

            // --- Realtime events ---
            event = events_rx.recv(), if events_open => {
                match event {
                    Some(event) => bridge.handle_event(event).await,
                    None => {
                        warn!("Realtime event channel closed");
                        events_open = false;
                        bridge.connection_changed(ConnectionState::Disconnected).await;
                    }
                }
            }

            // --- Background I/O ---
            Some(done) = completion_rx.recv() => bridge.handle_completion(done).await,

            // --- Chat list polling ---
            _ = next_poll(&mut poll) => bridge.spawn_chat_list_fetch(),
        }
    }

    bridge.controller.close_room().await;
    info!("Session loop ended");
}

async fn next_poll(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

impl SessionBridge {
    async fn emit(&self, update: SessionUpdate) {
        emit_update(&self.update_tx, update).await;
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::OpenRoom(room) => {
                let room_id = room.id.clone();
                match self.controller.open_room(room).await {
                    Ok(Some(ticket)) => {
                        self.emit(SessionUpdate::RoomJoined { room_id }).await;
                        self.spawn_fetch(ticket);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(room = %room_id, error = %e, "Failed to open room");
                        self.emit(SessionUpdate::FetchFailed {
                            room_id,
                            reason: e.to_string(),
                        })
                        .await;
                    }
                }
            }

            SessionCommand::CloseRoom => {
                self.controller.close_room().await;
            }

            SessionCommand::SendMessage(body) => match self.controller.send_message(body).await {
                Ok(pending) => self.emit(SessionUpdate::MessageAppended(pending)).await,
                Err(ParleyError::Validation(e)) => {
                    debug!(error = %e, "Outgoing message rejected");
                    self.emit(SessionUpdate::ValidationFailed { reason: e.to_string() }).await;
                }
                Err(e) => {
                    warn!(error = %e, "Send failed");
                    self.emit(SessionUpdate::SendFailed { reason: e.to_string() }).await;
                }
            },

            SessionCommand::DeleteMessage(id) => match self.controller.prepare_delete(&id) {
                Ok(pending) => self.spawn_delete(pending),
                Err(e) => {
                    self.emit(SessionUpdate::DeleteFailed {
                        message_id: id,
                        reason: e.to_string(),
                    })
                    .await;
                }
            },

            SessionCommand::LoadOlder => match self.controller.request_older() {
                Ok(Some(ticket)) => self.spawn_fetch(ticket),
                Ok(None) => debug!("No older page to load"),
                Err(e) => debug!(error = %e, "Older page not loadable"),
            },

            SessionCommand::WatchRooms(room_ids) => {
                if let Err(e) = self.controller.watch_rooms(room_ids).await {
                    warn!(error = %e, "Failed to watch rooms");
                }
            }

            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.controller.snapshot());
            }

            SessionCommand::Shutdown => {}
        }
    }

    async fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::ReceiveMessage(message) => self.on_message(message).await,
            TransportEvent::MessageDeleted(payload) => self.on_deleted(&payload).await,
            TransportEvent::ChatListUpdated(summary) => {
                if self.chat_list.upsert(summary) {
                    self.emit_chat_list().await;
                }
            }
            TransportEvent::Connected => self.connection_changed(ConnectionState::Connected).await,
            TransportEvent::Disconnected => self.connection_changed(ConnectionState::Disconnected).await,
        }
    }

    async fn on_message(&mut self, message: Message) {
        let list_changed = self.chat_list.record_message(&message);

        match self.controller.receive_message(message.clone()) {
            ReceiveOutcome::Appended => {
                self.emit(SessionUpdate::MessageAppended(message.into_persisted())).await;
            }
            ReceiveOutcome::Reconciled { temp_id, index } => {
                let stored = self
                    .controller
                    .log()
                    .and_then(|log| log.messages().get(index).cloned());
                if let Some(message) = stored {
                    self.emit(SessionUpdate::MessageReconciled { temp_id, message }).await;
                }
            }
            ReceiveOutcome::Duplicate | ReceiveOutcome::Ignored => {}
        }

        if list_changed {
            self.emit_chat_list().await;
        }
    }

    async fn on_deleted(&mut self, payload: &MessageDeletedPayload) {
        if self.controller.handle_remote_deletion(payload).is_some() {
            self.emit(SessionUpdate::MessageRemoved {
                message_id: payload.deleted_message.id.clone(),
                new_latest_message: payload.new_latest_message.clone(),
            })
            .await;
        }
        if self.chat_list.apply_deletion(payload) {
            self.emit_chat_list().await;
        }
    }

    async fn connection_changed(&mut self, state: ConnectionState) {
        if let Err(e) = self.controller.set_connection(state).await {
            warn!(error = %e, "Failed to re-join rooms after reconnect");
        }
        self.emit(SessionUpdate::ConnectionChanged {
            connected: state == ConnectionState::Connected,
        })
        .await;
    }

    async fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Fetch(ticket, result) => self.on_fetch(ticket, result).await,

            Completion::Delete(pending, Ok(())) => {
                let message_id = pending.message.id.clone();
                match self.controller.finish_delete(pending).await {
                    Ok(payload) => {
                        if self.chat_list.apply_deletion(&payload) {
                            self.emit_chat_list().await;
                        }
                        self.emit(SessionUpdate::MessageRemoved {
                            message_id,
                            new_latest_message: payload.new_latest_message,
                        })
                        .await;
                    }
                    Err(e) => {
                        self.emit(SessionUpdate::DeleteFailed {
                            message_id,
                            reason: e.to_string(),
                        })
                        .await;
                    }
                }
            }

            Completion::Delete(pending, Err(e)) => {
                warn!(msg_id = %pending.message.id, error = %e, "Server refused deletion");
                self.emit(SessionUpdate::DeleteFailed {
                    message_id: pending.message.id,
                    reason: e.to_string(),
                })
                .await;
            }

            Completion::ChatList(Ok(summaries)) => {
                debug!(count = summaries.len(), "Chat list refreshed");
                self.chat_list.replace_all(summaries);
                self.emit_chat_list().await;
                // Rooms that appeared server-side need a subscription too.
                if let Err(e) = self.controller.watch_rooms(self.chat_list.room_ids()).await {
                    warn!(error = %e, "Failed to watch polled rooms");
                }
            }

            Completion::ChatList(Err(e)) => {
                warn!(error = %e, "Chat list poll failed");
            }
        }
    }

    async fn on_fetch(&mut self, ticket: FetchTicket, result: Result<HistoryPage>) {
        let room_id = ticket.room.id.clone();

        match self.controller.apply_fetch(ticket, result) {
            FetchOutcome::Applied {
                kind,
                added,
                has_more_older,
            } => {
                self.emit(SessionUpdate::HistoryLoaded {
                    room_id,
                    older: kind != FetchKind::Initial,
                    added,
                    has_more_older,
                })
                .await;
            }

            FetchOutcome::Stale => {}

            FetchOutcome::Failed {
                kind: FetchKind::Initial,
                error: ParleyError::NotFound(NotFoundError::Room(_)),
            } => {
                info!(room = %room_id, "Room does not exist");
                self.controller.close_room().await;
                self.emit(SessionUpdate::NotFound {
                    room_id,
                    redirect_after_ms: self.not_found_redirect_ms,
                })
                .await;
            }

            FetchOutcome::Failed { error, .. } => {
                self.emit(SessionUpdate::FetchFailed {
                    room_id,
                    reason: error.to_string(),
                })
                .await;
            }
        }
    }

    async fn emit_chat_list(&self) {
        self.emit(SessionUpdate::ChatListChanged(self.chat_list.sorted())).await;
    }

    fn spawn_fetch(&self, ticket: FetchTicket) {
        let fetcher = self.fetcher.clone();
        let done = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = match ticket.kind {
                FetchKind::Initial => fetcher.fetch_initial(&ticket.room).await,
                FetchKind::Older { skip_amount } => fetcher.fetch_older(&ticket.room, skip_amount).await,
            };
            let _ = done.send(Completion::Fetch(ticket, result)).await;
        });
    }

    fn spawn_delete(&self, pending: PendingDeletion) {
        let fetcher = self.fetcher.clone();
        let done = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = fetcher.delete_message(&pending.message.id, pending.is_latest).await;
            let _ = done.send(Completion::Delete(pending, result)).await;
        });
    }

    fn spawn_chat_list_fetch(&self) {
        let fetcher = self.fetcher.clone();
        let done = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = fetcher.fetch_chat_list().await;
            let _ = done.send(Completion::ChatList(result)).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use parley_net::history::HistoryQuery;
    use parley_shared::protocol::TransportCommand;
    use parley_shared::types::{ClientTempId, UserId};

    use crate::controller::RoomPhase;

    struct MockApi;

    fn msg(room: &str, id: &str, secs: i64) -> Message {
        Message {
            id: MessageId(id.into()),
            room_id: RoomId(room.into()),
            sender_id: UserId::parse("bob").unwrap(),
            content: Some(id.into()),
            attachments: Vec::new(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(secs),
            client_temp_id: None,
        }
    }

    #[async_trait]
    impl HistoryApi for MockApi {
        async fn fetch_messages(&self, query: &HistoryQuery) -> Result<Vec<Message>> {
            match query.selected.as_str() {
                "ghost" => Err(NotFoundError::Room(query.room_id.clone()).into()),
                _ => Ok(vec![
                    msg(query.room_id.as_str(), "m1", 1),
                    msg(query.room_id.as_str(), "m2", 2),
                ]),
            }
        }

        async fn delete_message(&self, _id: &MessageId, _is_latest: bool) -> Result<()> {
            Ok(())
        }

        async fn fetch_chat_list(&self, _user: &UserId) -> Result<Vec<ChatSummary>> {
            Ok(vec![ChatSummary {
                room_id: RoomId("alicebob".into()),
                latest_message: Some(msg("alicebob", "m2", 2)),
                updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 2).unwrap(),
            }])
        }
    }

    struct Harness {
        cmd_tx: mpsc::Sender<SessionCommand>,
        updates: mpsc::Receiver<SessionUpdate>,
        events_tx: mpsc::Sender<TransportEvent>,
        wire: mpsc::Receiver<TransportCommand>,
    }

    fn start(config: SessionConfig) -> Harness {
        let (transport, wire) = parley_net::transport::channel(64);
        let (events_tx, events_rx) = mpsc::channel(64);
        let (cmd_tx, updates) = start_session_bridge(
            SessionContext::new("alice").unwrap(),
            &config,
            transport,
            events_rx,
            Arc::new(MockApi),
        );
        Harness {
            cmd_tx,
            updates,
            events_tx,
            wire,
        }
    }

    async fn next_matching(
        updates: &mut mpsc::Receiver<SessionUpdate>,
        pred: impl Fn(&SessionUpdate) -> bool,
    ) -> SessionUpdate {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let update = updates.recv().await.expect("bridge stopped");
                if pred(&update) {
                    return update;
                }
            }
        })
        .await
        .expect("timed out waiting for update")
    }

    async fn snapshot(cmd_tx: &mpsc::Sender<SessionCommand>) -> SessionSnapshot {
        let (tx, rx) = oneshot::channel();
        cmd_tx.send(SessionCommand::Snapshot(tx)).await.unwrap();
        rx.await.unwrap()
    }

    async fn open_direct(h: &mut Harness) -> Room {
        let room = Room::direct("alice", "bob").unwrap();
        h.cmd_tx.send(SessionCommand::OpenRoom(room.clone())).await.unwrap();
        next_matching(&mut h.updates, |u| matches!(u, SessionUpdate::HistoryLoaded { .. })).await;
        room
    }

    #[tokio::test]
    async fn test_open_room_loads_history() {
        let mut h = start(SessionConfig::default());
        let room = Room::direct("alice", "bob").unwrap();
        h.cmd_tx.send(SessionCommand::OpenRoom(room.clone())).await.unwrap();

        let joined = next_matching(&mut h.updates, |_| true).await;
        assert_eq!(joined, SessionUpdate::RoomJoined { room_id: room.id.clone() });

        let loaded = next_matching(&mut h.updates, |_| true).await;
        assert_eq!(
            loaded,
            SessionUpdate::HistoryLoaded {
                room_id: room.id.clone(),
                older: false,
                added: 2,
                has_more_older: false,
            }
        );

        let snap = snapshot(&h.cmd_tx).await;
        assert_eq!(snap.phase, RoomPhase::Active);
        assert_eq!(snap.messages.len(), 2);
        assert_eq!(h.wire.recv().await, Some(TransportCommand::JoinRoom(room.id)));
    }

    #[tokio::test]
    async fn test_send_and_echo() {
        let mut h = start(SessionConfig::default());
        let room = open_direct(&mut h).await;

        h.cmd_tx
            .send(SessionCommand::SendMessage(OutgoingMessage::text("hi bob")))
            .await
            .unwrap();
        let SessionUpdate::MessageAppended(pending) =
            next_matching(&mut h.updates, |u| matches!(u, SessionUpdate::MessageAppended(_))).await
        else {
            unreachable!()
        };
        assert!(pending.is_pending());

        let echo = Message {
            id: MessageId("srv-9".into()),
            created_at: pending.created_at,
            ..pending.clone()
        };
        h.events_tx.send(TransportEvent::ReceiveMessage(echo)).await.unwrap();

        let reconciled =
            next_matching(&mut h.updates, |u| matches!(u, SessionUpdate::MessageReconciled { .. })).await;
        let SessionUpdate::MessageReconciled { temp_id, message } = reconciled else {
            unreachable!()
        };
        assert_eq!(Some(temp_id), pending.client_temp_id);
        assert_eq!(message.id.as_str(), "srv-9");
        assert!(message.client_temp_id.is_none());

        let snap = snapshot(&h.cmd_tx).await;
        assert_eq!(snap.messages.len(), 3);
        assert_eq!(snap.room_id, Some(room.id));
    }

    #[tokio::test]
    async fn test_empty_message_reports_validation() {
        let mut h = start(SessionConfig::default());
        open_direct(&mut h).await;

        h.cmd_tx
            .send(SessionCommand::SendMessage(OutgoingMessage::text("   ")))
            .await
            .unwrap();
        let update =
            next_matching(&mut h.updates, |u| matches!(u, SessionUpdate::ValidationFailed { .. })).await;
        assert!(matches!(update, SessionUpdate::ValidationFailed { .. }));
        assert_eq!(snapshot(&h.cmd_tx).await.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_room_redirects() {
        let mut config = SessionConfig::default();
        config.not_found_redirect = Duration::from_millis(1500);
        let mut h = start(config);

        let room = Room::direct("alice", "ghost").unwrap();
        h.cmd_tx.send(SessionCommand::OpenRoom(room.clone())).await.unwrap();

        let update = next_matching(&mut h.updates, |u| matches!(u, SessionUpdate::NotFound { .. })).await;
        assert_eq!(
            update,
            SessionUpdate::NotFound {
                room_id: room.id,
                redirect_after_ms: 1500,
            }
        );
        assert_eq!(snapshot(&h.cmd_tx).await.phase, RoomPhase::Closed);
    }

    #[tokio::test]
    async fn test_delete_announces_to_room() {
        let mut h = start(SessionConfig::default());
        let room = open_direct(&mut h).await;

        h.cmd_tx
            .send(SessionCommand::DeleteMessage(MessageId("m2".into())))
            .await
            .unwrap();
        let update =
            next_matching(&mut h.updates, |u| matches!(u, SessionUpdate::MessageRemoved { .. })).await;
        let SessionUpdate::MessageRemoved {
            message_id,
            new_latest_message,
        } = update
        else {
            unreachable!()
        };
        assert_eq!(message_id.as_str(), "m2");
        assert_eq!(new_latest_message.unwrap().id.as_str(), "m1");

        assert_eq!(h.wire.recv().await, Some(TransportCommand::JoinRoom(room.id)));
        match h.wire.recv().await {
            Some(TransportCommand::MessageDeleted(payload)) => {
                assert_eq!(payload.deleted_message.id.as_str(), "m2");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reconnect_rejoins_active_room() {
        let mut h = start(SessionConfig::default());
        let room = open_direct(&mut h).await;
        assert_eq!(h.wire.recv().await, Some(TransportCommand::JoinRoom(room.id.clone())));

        h.events_tx.send(TransportEvent::Disconnected).await.unwrap();
        h.events_tx.send(TransportEvent::Connected).await.unwrap();

        next_matching(&mut h.updates, |u| *u == SessionUpdate::ConnectionChanged { connected: true }).await;
        assert_eq!(h.wire.recv().await, Some(TransportCommand::JoinRoom(room.id)));
    }

    #[tokio::test]
    async fn test_foreign_room_message_updates_chat_list_only() {
        let mut h = start(SessionConfig::default());
        open_direct(&mut h).await;

        let mut other = msg("alicecarol", "c1", 50);
        other.client_temp_id = Some(ClientTempId("tmp-x".into()));
        h.events_tx.send(TransportEvent::ReceiveMessage(other)).await.unwrap();

        let update =
            next_matching(&mut h.updates, |u| matches!(u, SessionUpdate::ChatListChanged(_))).await;
        let SessionUpdate::ChatListChanged(list) = update else {
            unreachable!()
        };
        assert_eq!(list[0].room_id.as_str(), "alicecarol");
        assert_eq!(snapshot(&h.cmd_tx).await.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_chat_list_polling() {
        let mut config = SessionConfig::default();
        config.chat_list_poll = Some(Duration::from_millis(20));
        let mut h = start(config);

        let update =
            next_matching(&mut h.updates, |u| matches!(u, SessionUpdate::ChatListChanged(_))).await;
        let SessionUpdate::ChatListChanged(list) = update else {
            unreachable!()
        };
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].room_id.as_str(), "alicebob");

        let joined = tokio::time::timeout(Duration::from_secs(2), h.wire.recv())
            .await
            .expect("no subscription for polled room");
        assert_eq!(joined, Some(TransportCommand::JoinRoom(RoomId("alicebob".into()))));
    }

    #[tokio::test]
    async fn test_send_while_disconnected_reports_failure() {
        let mut h = start(SessionConfig::default());
        open_direct(&mut h).await;

        h.events_tx.send(TransportEvent::Disconnected).await.unwrap();
        next_matching(&mut h.updates, |u| *u == SessionUpdate::ConnectionChanged { connected: false }).await;

        h.cmd_tx
            .send(SessionCommand::SendMessage(OutgoingMessage::text("lost?")))
            .await
            .unwrap();
        next_matching(&mut h.updates, |u| matches!(u, SessionUpdate::SendFailed { .. })).await;

        let snap = snapshot(&h.cmd_tx).await;
        assert_eq!(snap.messages.len(), 2);
        assert_eq!(snap.pending_count, 0);
    }

    #[tokio::test]
    async fn test_shutdown_leaves_room() {
        let mut h = start(SessionConfig::default());
        let room = open_direct(&mut h).await;

        h.cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        assert_eq!(h.wire.recv().await, Some(TransportCommand::JoinRoom(room.id.clone())));
        assert_eq!(h.wire.recv().await, Some(TransportCommand::LeaveRoom(room.id)));
    }
}
