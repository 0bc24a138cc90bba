// Network edge of the messaging session: the realtime channel and the REST history API.

pub mod history;
pub mod http;
pub mod transport;
pub mod websocket;

pub use history::{HistoryApi, HistoryFetcher, HistoryPage, HistoryQuery};
pub use http::HttpApiClient;
pub use transport::{channel, Transport};
pub use websocket::{spawn_websocket_transport, ReconnectPolicy};
