//! Paginated history reads.
//!
//! [`HistoryApi`] is the seam to the REST server; [`HistoryFetcher`] turns
//! raw pages into [`HistoryPage`]s sized by room kind.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use parley_shared::constants::{DIRECT_PAGE_SIZE, GROUP_PAGE_SIZE};
use parley_shared::error::Result;
use parley_shared::models::{ChatSummary, Message};
use parley_shared::types::{MessageId, Room, RoomId, RoomKind, UserId};

/// Parameters of `GET /messages`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Room the page belongs to (used for error reporting, not sent)
    pub room_id: RoomId,
    /// The requesting user
    pub user: UserId,
    /// Counterpart user id (direct) or room id (group)
    pub selected: String,
    /// Number of most-recent messages to skip
    pub skip_amount: usize,
}

/// The server-side operations the session depends on.
#[async_trait]
pub trait HistoryApi: Send + Sync {
    /// One page of messages, oldest first.
    async fn fetch_messages(&self, query: &HistoryQuery) -> Result<Vec<Message>>;

    /// Authoritative deletion.
    async fn delete_message(&self, id: &MessageId, is_latest_message_deleted: bool) -> Result<()>;

    /// Room-list summaries for `user`.
    async fn fetch_chat_list(&self, user: &UserId) -> Result<Vec<ChatSummary>>;
}

/// A fetched page plus the "more may exist" heuristic.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    pub room_id: RoomId,
    pub messages: Vec<Message>,
    /// `messages.len() == page_size`. A room whose history is an exact
    /// multiple of the page size reports one extra, empty page.
    pub has_more_older: bool,
}

#[derive(Clone)]
pub struct HistoryFetcher {
    api: Arc<dyn HistoryApi>,
    user: UserId,
    direct_page_size: usize,
    group_page_size: usize,
}

impl HistoryFetcher {
    pub fn new(api: Arc<dyn HistoryApi>, user: UserId) -> Self {
        Self {
            api,
            user,
            direct_page_size: DIRECT_PAGE_SIZE,
            group_page_size: GROUP_PAGE_SIZE,
        }
    }

    pub fn with_page_sizes(mut self, direct: usize, group: usize) -> Self {
        self.direct_page_size = direct.max(1);
        self.group_page_size = group.max(1);
        self
    }

    pub fn page_size(&self, kind: RoomKind) -> usize {
        match kind {
            RoomKind::Direct => self.direct_page_size,
            RoomKind::Group => self.group_page_size,
        }
    }

    /// Most recent page (offset 0).
    pub async fn fetch_initial(&self, room: &Room) -> Result<HistoryPage> {
        self.fetch_older(room, 0).await
    }

    /// The page that ends `skip_amount` messages before the newest one.
    pub async fn fetch_older(&self, room: &Room, skip_amount: usize) -> Result<HistoryPage> {
        let query = HistoryQuery {
            room_id: room.id.clone(),
            user: self.user.clone(),
            selected: room.addressee(&self.user),
            skip_amount,
        };

        let mut messages = self.api.fetch_messages(&query).await?;
        // Servers are expected to answer oldest-first; a stable sort keeps
        // that order and repairs anything else.
        messages.sort_by_key(|m| m.created_at);

        let page_size = self.page_size(room.kind);
        let has_more_older = messages.len() == page_size;

        debug!(
            room = %room.id,
            skip = skip_amount,
            count = messages.len(),
            has_more_older,
            "Fetched history page"
        );

        Ok(HistoryPage {
            room_id: room.id.clone(),
            messages,
            has_more_older,
        })
    }

    pub async fn delete_message(&self, id: &MessageId, is_latest: bool) -> Result<()> {
        self.api.delete_message(id, is_latest).await
    }

    pub async fn fetch_chat_list(&self) -> Result<Vec<ChatSummary>> {
        self.api.fetch_chat_list(&self.user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Mutex;

    struct FixedApi {
        pages: Mutex<Vec<Vec<Message>>>,
        queries: Mutex<Vec<HistoryQuery>>,
    }

    #[async_trait]
    impl HistoryApi for FixedApi {
        async fn fetch_messages(&self, query: &HistoryQuery) -> Result<Vec<Message>> {
            self.queries.lock().unwrap().push(query.clone());
            Ok(self.pages.lock().unwrap().remove(0))
        }

        async fn delete_message(&self, _id: &MessageId, _is_latest: bool) -> Result<()> {
            Ok(())
        }

        async fn fetch_chat_list(&self, _user: &UserId) -> Result<Vec<ChatSummary>> {
            Ok(Vec::new())
        }
    }

    fn messages(room: &RoomId, count: usize) -> Vec<Message> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..count)
            .rev()
            .map(|i| Message {
                id: MessageId(format!("m{i}")),
                room_id: room.clone(),
                sender_id: UserId::parse("bob").unwrap(),
                content: Some(format!("#{i}")),
                attachments: Vec::new(),
                created_at: base + Duration::seconds(i as i64),
                client_temp_id: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_direct_page_heuristic() {
        let room = Room::direct("alice", "bob").unwrap();
        let api = Arc::new(FixedApi {
            pages: Mutex::new(vec![messages(&room.id, 20), messages(&room.id, 7)]),
            queries: Mutex::new(Vec::new()),
        });
        let fetcher = HistoryFetcher::new(api.clone(), UserId::parse("alice").unwrap());

        let first = fetcher.fetch_initial(&room).await.unwrap();
        assert!(first.has_more_older);
        // Reordered oldest-first.
        assert!(first
            .messages
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at));

        let second = fetcher.fetch_older(&room, 20).await.unwrap();
        assert!(!second.has_more_older);

        let queries = api.queries.lock().unwrap();
        assert_eq!(queries[0].skip_amount, 0);
        assert_eq!(queries[0].selected, "bob");
        assert_eq!(queries[1].skip_amount, 20);
    }

    #[tokio::test]
    async fn test_group_page_size() {
        let room = Room::group(RoomId("g1".into()), []);
        let api = Arc::new(FixedApi {
            pages: Mutex::new(vec![messages(&room.id, 20)]),
            queries: Mutex::new(Vec::new()),
        });
        let fetcher = HistoryFetcher::new(api.clone(), UserId::parse("alice").unwrap());

        assert_eq!(fetcher.page_size(RoomKind::Group), GROUP_PAGE_SIZE);
        let page = fetcher.fetch_initial(&room).await.unwrap();
        assert!(!page.has_more_older);
        assert_eq!(api.queries.lock().unwrap()[0].selected, "g1");
    }
}
