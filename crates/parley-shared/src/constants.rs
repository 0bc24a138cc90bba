/// Application name
pub const APP_NAME: &str = "Parley";

/// Maximum length of a text message, in characters (not bytes)
pub const MAX_CONTENT_CHARS: usize = 1000;

/// History page size for direct (one-to-one) rooms
pub const DIRECT_PAGE_SIZE: usize = 20;

/// History page size for group rooms
pub const GROUP_PAGE_SIZE: usize = 30;

/// Maximum length of a user id
pub const MAX_USER_ID_LEN: usize = 64;

/// Delay before a not-found view redirects, in milliseconds
pub const NOT_FOUND_REDIRECT_MS: u64 = 3_000;

/// Default REST API base URL (local development)
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Default realtime endpoint (local development)
pub const DEFAULT_WS_URL: &str = "ws://localhost:5000/ws";

/// Capacity of the command / notification channels
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Distance from the top of the viewport, in pixels, that triggers an older-page fetch
pub const DEFAULT_SCROLL_TOP_THRESHOLD_PX: f64 = 48.0;

/// First redial delay after the realtime channel drops, in milliseconds
pub const DEFAULT_RECONNECT_BASE_MS: u64 = 500;

/// Upper bound on the redial delay, in milliseconds
pub const DEFAULT_RECONNECT_MAX_MS: u64 = 30_000;

/// Realtime event names
pub const EVENT_JOIN_ROOM: &str = "join-room";
pub const EVENT_LEAVE_ROOM: &str = "leave-room";
pub const EVENT_SEND_MESSAGE: &str = "send-message";
pub const EVENT_RECEIVE_MESSAGE: &str = "receive-message";
pub const EVENT_MESSAGE_DELETED: &str = "message-deleted";
pub const EVENT_CHAT_LIST_UPDATED: &str = "chat-list-updated";
