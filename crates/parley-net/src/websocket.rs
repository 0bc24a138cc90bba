//! Realtime channel over a WebSocket carrying JSON text frames.
//!
//! The connection runs in a dedicated tokio task. Outbound
//! [`TransportCommand`]s are serialized to text frames, inbound text frames
//! are parsed into [`TransportEvent`]s. Malformed or unknown frames are
//! skipped so that one bad payload never tears down the shared connection.
//!
//! When the socket drops, the task emits `Disconnected` and redials with
//! exponential backoff; the [`Transport`] handle stays valid throughout.
//! Commands issued while disconnected are dropped. After a successful
//! redial the task emits `Connected` again.
//!
//! The task never awaits the event consumer while it could be reading
//! commands: inbound events wait in a small backlog, and the socket is not
//! read while that backlog is full.

use std::collections::VecDeque;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use parley_shared::constants::{DEFAULT_RECONNECT_BASE_MS, DEFAULT_RECONNECT_MAX_MS};
use parley_shared::error::{ParleyError, Result};
use parley_shared::protocol::{TransportCommand, TransportEvent};

use crate::transport::Transport;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Redial schedule after the connection drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first redial; doubles on every failed attempt.
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(DEFAULT_RECONNECT_BASE_MS),
            max_delay: Duration::from_millis(DEFAULT_RECONNECT_MAX_MS),
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Wait before redial number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Connect to `url` and spawn the connection task.
///
/// The first event on the returned receiver is always
/// [`TransportEvent::Connected`]. Every drop of the socket is reported as
/// [`TransportEvent::Disconnected`]. The receiver closes once the task gives
/// up redialing or every [`Transport`] handle is dropped.
pub async fn spawn_websocket_transport(
    url: &str,
    capacity: usize,
    policy: ReconnectPolicy,
) -> Result<(Transport, mpsc::Receiver<TransportEvent>)> {
    let (ws, _) = connect_async(url)
        .await
        .map_err(|e| ParleyError::Network(format!("WebSocket connect to {url}: {e}")))?;

    info!(url, "Realtime channel connected");

    let capacity = capacity.max(1);
    let (cmd_tx, cmd_rx) = mpsc::channel::<TransportCommand>(capacity);
    let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(capacity);

    // Fresh channel with spare capacity: cannot fail.
    let _ = event_tx.try_send(TransportEvent::Connected);

    tokio::spawn(run_transport(url.to_string(), ws, cmd_rx, event_tx, policy, capacity));

    Ok((Transport::new(cmd_tx), event_rx))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    /// The socket closed or failed.
    Dropped,
    /// Every transport handle is gone.
    HandlesDropped,
    /// Nobody listens for events any more.
    ReceiverDropped,
}

async fn run_transport(
    url: String,
    mut ws: WsStream,
    mut cmd_rx: mpsc::Receiver<TransportCommand>,
    event_tx: mpsc::Sender<TransportEvent>,
    policy: ReconnectPolicy,
    capacity: usize,
) {
    loop {
        let mut backlog = VecDeque::new();
        let exit = connection_loop(ws, &mut cmd_rx, &event_tx, &mut backlog, capacity).await;
        if exit != LoopExit::Dropped {
            debug!(?exit, "Realtime connection loop stopped");
            break;
        }

        backlog.push_back(TransportEvent::Disconnected);
        for event in backlog.drain(..) {
            if !deliver_offline(&event_tx, &mut cmd_rx, event).await {
                return;
            }
        }

        ws = match redial(&url, &policy, &mut cmd_rx).await {
            Some(next) => next,
            None => break,
        };

        if !deliver_offline(&event_tx, &mut cmd_rx, TransportEvent::Connected).await {
            return;
        }
    }

    info!("Realtime transport stopped");
}

async fn connection_loop<S>(
    ws: WebSocketStream<S>,
    cmd_rx: &mut mpsc::Receiver<TransportCommand>,
    event_tx: &mpsc::Sender<TransportEvent>,
    backlog: &mut VecDeque<TransportEvent>,
    capacity: usize,
) -> LoopExit
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            // --- Outbound commands ---
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    info!("All transport handles dropped, closing realtime channel");
                    let _ = ws_tx.close().await;
                    return LoopExit::HandlesDropped;
                };

                let frame = match cmd.to_json() {
                    Ok(frame) => frame,
                    Err(e) => {
                        error!(event = cmd.name(), error = %e, "Failed to serialize realtime event");
                        continue;
                    }
                };

                debug!(event = cmd.name(), len = frame.len(), "Sending realtime frame");
                if let Err(e) = ws_tx.send(WsMessage::Text(frame.into())).await {
                    warn!(error = %e, "Realtime send failed");
                    return LoopExit::Dropped;
                }
            }

            // --- Backlog to consumer ---
            permit = event_tx.reserve(), if !backlog.is_empty() => {
                let Ok(permit) = permit else {
                    info!("Event receiver dropped, closing realtime channel");
                    let _ = ws_tx.close().await;
                    return LoopExit::ReceiverDropped;
                };
                if let Some(event) = backlog.pop_front() {
                    permit.send(event);
                }
            }

            // --- Inbound frames ---
            frame = ws_rx.next(), if backlog.len() < capacity => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => match TransportEvent::from_json(&text) {
                        Ok(event) => {
                            debug!(event = event.name(), "Realtime event received");
                            backlog.push_back(event);
                        }
                        Err(e) => {
                            debug!(error = %e, "Ignoring unrecognised realtime frame");
                        }
                    },
                    Some(Ok(WsMessage::Close(_))) | None => {
                        info!("Realtime channel closed by server");
                        return LoopExit::Dropped;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "Realtime channel error");
                        return LoopExit::Dropped;
                    }
                }
            }
        }
    }
}

/// Hand one event to the consumer while no socket is open, discarding
/// commands meanwhile. Returns `false` once the task should stop.
async fn deliver_offline(
    event_tx: &mpsc::Sender<TransportEvent>,
    cmd_rx: &mut mpsc::Receiver<TransportCommand>,
    event: TransportEvent,
) -> bool {
    loop {
        tokio::select! {
            permit = event_tx.reserve() => {
                return match permit {
                    Ok(permit) => {
                        permit.send(event);
                        true
                    }
                    Err(_) => false,
                };
            }
            cmd = cmd_rx.recv() => match cmd {
                Some(cmd) => debug!(event = cmd.name(), "Dropping command while disconnected"),
                None => return false,
            },
        }
    }
}

async fn redial(
    url: &str,
    policy: &ReconnectPolicy,
    cmd_rx: &mut mpsc::Receiver<TransportCommand>,
) -> Option<WsStream> {
    let mut attempt = 0;

    loop {
        if policy.max_attempts.is_some_and(|max| attempt >= max) {
            warn!(url, attempts = attempt, "Giving up on realtime channel");
            return None;
        }

        let delay = policy.delay(attempt);
        attempt += 1;
        debug!(url, attempt, delay_ms = delay.as_millis() as u64, "Waiting before redial");

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => debug!(event = cmd.name(), "Dropping command while disconnected"),
                    None => return None,
                },
            }
        }

        match connect_async(url).await {
            Ok((ws, _)) => {
                info!(url, attempt, "Realtime channel reconnected");
                return Some(ws);
            }
            Err(e) => warn!(url, attempt, error = %e, "Redial failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parley_shared::types::RoomId;
    use tokio::net::TcpListener;

    fn fast_policy(max_attempts: Option<u32>) -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            max_attempts,
        }
    }

    async fn next_text<S>(ws: &mut WebSocketStream<S>) -> String
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            match ws.next().await {
                Some(Ok(WsMessage::Text(text))) => return text.as_str().to_string(),
                Some(Ok(_)) => continue,
                other => panic!("unexpected frame {other:?}"),
            }
        }
    }

    async fn recv_event(events: &mut mpsc::Receiver<TransportEvent>) -> Option<TransportEvent> {
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for transport event")
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            max_attempts: None,
        };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(800));
        assert_eq!(policy.delay(4), Duration::from_millis(1000));
        assert_eq!(policy.delay(40), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_roundtrip_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            // Garbage first: must be skipped, not fatal.
            ws.send(WsMessage::Text("not json".into())).await.unwrap();

            let frame = serde_json::json!({
                "event": "receive-message",
                "payload": {
                    "id": "m1",
                    "roomId": "alicebob",
                    "senderId": "bob",
                    "content": "hello",
                    "createdAt": Utc::now(),
                }
            });
            ws.send(WsMessage::Text(frame.to_string().into()))
                .await
                .unwrap();

            let received = next_text(&mut ws).await;
            ws.close(None).await.unwrap();
            received
        });

        let (transport, mut events) =
            spawn_websocket_transport(&format!("ws://{addr}"), 8, fast_policy(Some(1)))
                .await
                .unwrap();

        assert_eq!(recv_event(&mut events).await, Some(TransportEvent::Connected));
        match recv_event(&mut events).await {
            Some(TransportEvent::ReceiveMessage(msg)) => assert_eq!(msg.id.as_str(), "m1"),
            other => panic!("unexpected event {other:?}"),
        }

        transport
            .join_room(&RoomId("alicebob".into()))
            .await
            .unwrap();

        let sent = server.await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&sent).unwrap();
        assert_eq!(value["event"], "join-room");
        assert_eq!(value["payload"], "alicebob");

        assert_eq!(recv_event(&mut events).await, Some(TransportEvent::Disconnected));
    }

    #[tokio::test]
    async fn test_redials_after_server_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut first = tokio_tungstenite::accept_async(stream).await.unwrap();
            first.close(None).await.unwrap();
            while let Some(Ok(_)) = first.next().await {}

            let (stream, _) = listener.accept().await.unwrap();
            let mut second = tokio_tungstenite::accept_async(stream).await.unwrap();
            next_text(&mut second).await
        });

        let (transport, mut events) =
            spawn_websocket_transport(&format!("ws://{addr}"), 8, fast_policy(None))
                .await
                .unwrap();

        assert_eq!(recv_event(&mut events).await, Some(TransportEvent::Connected));
        assert_eq!(recv_event(&mut events).await, Some(TransportEvent::Disconnected));
        assert_eq!(recv_event(&mut events).await, Some(TransportEvent::Connected));

        // Same handle, new socket.
        transport.join_room(&RoomId("g1".into())).await.unwrap();
        let sent = server.await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&sent).unwrap();
        assert_eq!(value["event"], "join-room");
        assert_eq!(value["payload"], "g1");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.close(None).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
            // Listener dropped here: every redial is refused.
        });

        let (_transport, mut events) =
            spawn_websocket_transport(&format!("ws://{addr}"), 8, fast_policy(Some(2)))
                .await
                .unwrap();

        assert_eq!(recv_event(&mut events).await, Some(TransportEvent::Connected));
        assert_eq!(recv_event(&mut events).await, Some(TransportEvent::Disconnected));
        assert_eq!(recv_event(&mut events).await, None);
    }

    #[tokio::test]
    async fn test_commands_flow_while_events_are_unread() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            for i in 0..10 {
                let frame = serde_json::json!({
                    "event": "chat-list-updated",
                    "payload": { "roomId": format!("r{i}"), "updatedAt": Utc::now() }
                });
                ws.send(WsMessage::Text(frame.to_string().into()))
                    .await
                    .unwrap();
            }

            let mut joins = Vec::new();
            for _ in 0..5 {
                joins.push(next_text(&mut ws).await);
            }
            joins
        });

        let (transport, mut events) =
            spawn_websocket_transport(&format!("ws://{addr}"), 1, fast_policy(Some(1)))
                .await
                .unwrap();

        // Nobody reads events yet, and both queues hold a single entry.
        tokio::time::timeout(Duration::from_secs(2), async {
            for i in 0..5 {
                transport.join_room(&RoomId(format!("r{i}"))).await.unwrap();
            }
        })
        .await
        .expect("commands blocked behind unread events");

        assert_eq!(server.await.unwrap().len(), 5);

        assert_eq!(recv_event(&mut events).await, Some(TransportEvent::Connected));
        for i in 0..10 {
            match recv_event(&mut events).await {
                Some(TransportEvent::ChatListUpdated(summary)) => {
                    assert_eq!(summary.room_id.as_str(), format!("r{i}"));
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_connect_failure_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = spawn_websocket_transport(&format!("ws://{addr}"), 8, ReconnectPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::Network(_)));
    }
}
