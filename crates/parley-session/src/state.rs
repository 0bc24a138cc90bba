//! Explicit per-session context.
//!
//! The signed-in user is handed to the session at construction time instead
//! of being looked up from ambient state. The room is passed to each
//! `open_room` call.

use parley_shared::error::ValidationError;
use parley_shared::types::UserId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// The signed-in user; sender of every outgoing message.
    pub user: UserId,
}

impl SessionContext {
    pub fn new(user_id: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            user: UserId::parse(user_id)?,
        })
    }
}
