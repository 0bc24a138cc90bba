//! REST client for the chat server.
//!
//! Endpoints:
//! - `GET  /messages?user=&selectedUser=&skipAmount=`
//! - `DELETE /message/{id}?isLatestMessageDeleted=`
//! - `GET  /chats?user=`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use tracing::{debug, warn};

use parley_shared::error::{NotFoundError, ParleyError, Result};
use parley_shared::models::{ChatSummary, Message};
use parley_shared::types::{MessageId, UserId};

use crate::history::{HistoryApi, HistoryQuery};

#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApiClient {
    /// Creates a client for the API rooted at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ParleyError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl HistoryApi for HttpApiClient {
    async fn fetch_messages(&self, query: &HistoryQuery) -> Result<Vec<Message>> {
        let skip = query.skip_amount.to_string();
        let resp = self
            .client
            .get(self.url("/messages"))
            .query(&[
                ("user", query.user.as_str()),
                ("selectedUser", query.selected.as_str()),
                ("skipAmount", skip.as_str()),
            ])
            .send()
            .await
            .map_err(request_failed)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(NotFoundError::Room(query.room_id.clone()).into());
        }
        let resp = ensure_success(resp).await?;

        resp.json::<Vec<Message>>()
            .await
            .map_err(|e| ParleyError::Protocol(format!("invalid message page: {e}")))
    }

    async fn delete_message(&self, id: &MessageId, is_latest_message_deleted: bool) -> Result<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/message/{}", id.as_str())))
            .query(&[(
                "isLatestMessageDeleted",
                if is_latest_message_deleted { "true" } else { "false" },
            )])
            .send()
            .await
            .map_err(request_failed)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(NotFoundError::Message(id.clone()).into());
        }
        ensure_success(resp).await?;

        debug!(msg_id = %id, is_latest_message_deleted, "Message deleted on server");
        Ok(())
    }

    async fn fetch_chat_list(&self, user: &UserId) -> Result<Vec<ChatSummary>> {
        let resp = self
            .client
            .get(self.url("/chats"))
            .query(&[("user", user.as_str())])
            .send()
            .await
            .map_err(request_failed)?;
        let resp = ensure_success(resp).await?;

        resp.json::<Vec<ChatSummary>>()
            .await
            .map_err(|e| ParleyError::Protocol(format!("invalid chat list: {e}")))
    }
}

fn request_failed(e: reqwest::Error) -> ParleyError {
    ParleyError::Network(format!("HTTP request failed: {e}"))
}

async fn ensure_success(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    warn!(status = %status, body = %body, "Server rejected request");
    Err(ParleyError::Network(format!("server responded {status}")))
}
