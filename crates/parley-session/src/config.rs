//! Session configuration loaded from environment variables.
//!
//! Every setting has a default so a local development server needs no
//! configuration at all.

use std::time::Duration;

use parley_net::ReconnectPolicy;
use parley_shared::constants::{
    DEFAULT_API_URL, DEFAULT_CHANNEL_CAPACITY, DEFAULT_SCROLL_TOP_THRESHOLD_PX, DEFAULT_WS_URL,
    DIRECT_PAGE_SIZE, GROUP_PAGE_SIZE, NOT_FOUND_REDIRECT_MS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Base URL of the REST API.
    /// Env: `PARLEY_API_URL`
    pub api_url: String,

    /// Realtime endpoint.
    /// Env: `PARLEY_WS_URL`
    pub ws_url: String,

    /// Env: `PARLEY_DIRECT_PAGE_SIZE`
    pub direct_page_size: usize,

    /// Env: `PARLEY_GROUP_PAGE_SIZE`
    pub group_page_size: usize,

    /// Env: `PARLEY_HTTP_TIMEOUT_SECS`
    pub http_timeout: Duration,

    /// Capacity of the command and update queues.
    /// Env: `PARLEY_CHANNEL_CAPACITY`
    pub channel_capacity: usize,

    /// Interval for re-reading the chat list. `None` disables polling.
    /// Env: `PARLEY_CHAT_LIST_POLL_SECS` (0 = disabled)
    pub chat_list_poll: Option<Duration>,

    /// How long a "room not found" notice stays before redirecting.
    /// Env: `PARLEY_NOT_FOUND_REDIRECT_MS`
    pub not_found_redirect: Duration,

    /// Distance from the top that triggers loading older messages.
    /// Env: `PARLEY_SCROLL_TOP_THRESHOLD_PX`
    pub scroll_top_threshold_px: f64,

    /// Redial schedule for the realtime channel.
    /// Env: `PARLEY_RECONNECT_BASE_MS`, `PARLEY_RECONNECT_MAX_MS`,
    /// `PARLEY_RECONNECT_MAX_ATTEMPTS` (0 = retry forever)
    pub reconnect: ReconnectPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            direct_page_size: DIRECT_PAGE_SIZE,
            group_page_size: GROUP_PAGE_SIZE,
            http_timeout: Duration::from_secs(30),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            chat_list_poll: None,
            not_found_redirect: Duration::from_millis(NOT_FOUND_REDIRECT_MS),
            scroll_top_threshold_px: DEFAULT_SCROLL_TOP_THRESHOLD_PX,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SessionConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("PARLEY_API_URL") {
            config.api_url = url;
        }
        if let Some(url) = lookup("PARLEY_WS_URL") {
            config.ws_url = url;
        }

        if let Some(n) = parse_positive(&lookup, "PARLEY_DIRECT_PAGE_SIZE") {
            config.direct_page_size = n;
        }
        if let Some(n) = parse_positive(&lookup, "PARLEY_GROUP_PAGE_SIZE") {
            config.group_page_size = n;
        }
        if let Some(n) = parse_positive(&lookup, "PARLEY_HTTP_TIMEOUT_SECS") {
            config.http_timeout = Duration::from_secs(n as u64);
        }
        if let Some(n) = parse_positive(&lookup, "PARLEY_CHANNEL_CAPACITY") {
            config.channel_capacity = n;
        }

        if let Some(val) = lookup("PARLEY_CHAT_LIST_POLL_SECS") {
            match val.parse::<u64>() {
                Ok(0) => config.chat_list_poll = None,
                Ok(secs) => config.chat_list_poll = Some(Duration::from_secs(secs)),
                Err(_) => {
                    tracing::warn!(value = %val, "Invalid PARLEY_CHAT_LIST_POLL_SECS, polling disabled");
                }
            }
        }

        if let Some(val) = lookup("PARLEY_NOT_FOUND_REDIRECT_MS") {
            match val.parse::<u64>() {
                Ok(ms) => config.not_found_redirect = Duration::from_millis(ms),
                Err(_) => {
                    tracing::warn!(value = %val, "Invalid PARLEY_NOT_FOUND_REDIRECT_MS, using default");
                }
            }
        }

        if let Some(val) = lookup("PARLEY_SCROLL_TOP_THRESHOLD_PX") {
            match val.parse::<f64>() {
                Ok(px) if px.is_finite() && px >= 0.0 => config.scroll_top_threshold_px = px,
                _ => {
                    tracing::warn!(value = %val, "Invalid PARLEY_SCROLL_TOP_THRESHOLD_PX, using default");
                }
            }
        }

        if let Some(n) = parse_positive(&lookup, "PARLEY_RECONNECT_BASE_MS") {
            config.reconnect.base_delay = Duration::from_millis(n as u64);
        }
        if let Some(n) = parse_positive(&lookup, "PARLEY_RECONNECT_MAX_MS") {
            config.reconnect.max_delay = Duration::from_millis(n as u64);
        }
        if config.reconnect.max_delay < config.reconnect.base_delay {
            tracing::warn!("PARLEY_RECONNECT_MAX_MS below base delay, raising it");
            config.reconnect.max_delay = config.reconnect.base_delay;
        }

        if let Some(val) = lookup("PARLEY_RECONNECT_MAX_ATTEMPTS") {
            match val.parse::<u32>() {
                Ok(0) => config.reconnect.max_attempts = None,
                Ok(n) => config.reconnect.max_attempts = Some(n),
                Err(_) => {
                    tracing::warn!(value = %val, "Invalid PARLEY_RECONNECT_MAX_ATTEMPTS, retrying forever");
                }
            }
        }

        config
    }
}

fn parse_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<usize> {
    let val = lookup(key)?;
    match val.parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            tracing::warn!(key, value = %val, "Invalid value, using default");
            None
        }
    }
}
