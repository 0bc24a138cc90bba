pub mod chat_list;
pub mod config;
pub mod controller;
pub mod cursor;
pub mod events;
pub mod message_log;
pub mod scroll;
pub mod session_bridge;
pub mod state;

use tracing_subscriber::{fmt, EnvFilter};

pub use chat_list::ChatList;
pub use config::SessionConfig;
pub use controller::{
    FetchKind, FetchOutcome, FetchTicket, PendingDeletion, ReceiveOutcome, RoomPhase, SessionController,
    SessionSnapshot,
};
pub use cursor::PaginationCursor;
pub use events::SessionUpdate;
pub use message_log::{MessageLog, Reconciliation, Removal};
pub use scroll::{ScrollCoordinator, Viewport};
pub use session_bridge::{connect_session, start_session_bridge, SessionCommand};
pub use state::SessionContext;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("parley_session=debug,parley_net=debug,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();

    tracing::info!(app = parley_shared::constants::APP_NAME, "Tracing initialised");
}
