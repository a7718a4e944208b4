//! Session struct definition
//!
//! Per-connection runtime state owned by its connection handler.

use crate::error::{AppError, SendError};
use crate::message::ServerMessage;
use crate::registry::{ConnectionHandle, Registry};
use crate::types::{SessionId, SlotId};

/// Connection handler states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, no slot yet
    Connecting,
    /// Slot reserved, waiting for a free username
    Authenticating,
    /// Username bound, processing commands
    Active,
    /// Terminal
    Closed,
}

/// Connected session information
///
/// Only the owning handler writes these fields. The registry sees the
/// session through its slot and a clone of `sender`.
#[derive(Debug)]
pub struct Session {
    /// Unique identifier for this connection
    pub id: SessionId,
    /// Registry slot (None until reserved)
    pub slot: Option<SlotId>,
    /// Username (None before authentication)
    pub username: Option<String>,
    /// Current handler state
    pub state: SessionState,
    /// Outbound queue to this connection's writer task
    pub sender: ConnectionHandle,
}

impl Session {
    /// Create a session for a freshly accepted connection
    pub fn new(id: SessionId, sender: ConnectionHandle) -> Self {
        Self {
            id,
            slot: None,
            username: None,
            state: SessionState::Connecting,
            sender,
        }
    }

    /// Claim a registry slot and move on to authentication
    ///
    /// On `CapacityExceeded` the session goes straight to `Closed`.
    pub fn reserve(&mut self, registry: &Registry) -> Result<SlotId, AppError> {
        match registry.reserve(self.id) {
            Ok(slot) => {
                self.slot = Some(slot);
                self.state = SessionState::Authenticating;
                Ok(slot)
            }
            Err(e) => {
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    /// Queue a message for this connection
    ///
    /// Returns an error if the writer task has stopped.
    pub async fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Get the display name for this session
    ///
    /// Returns the username if set, otherwise "Unknown".
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("Unknown")
    }

    /// Record a successful authentication
    pub fn activate(&mut self, username: String) {
        self.username = Some(username);
        self.state = SessionState::Active;
    }

    /// Mark the session as finished
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }
}
