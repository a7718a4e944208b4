//! Error types for the chat server
//!
//! Defines application-level errors for both the server and the client.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

use crate::types::SlotId;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// business errors (send error message to client).
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing error (fatal unless it is an over-long line)
    #[error("Framing error: {0}")]
    Codec(#[from] LinesCodecError),

    /// Channel send error (fatal - outbound queue closed)
    #[error("Channel send error")]
    ChannelSend,

    /// Every registry slot is occupied
    #[error("Registry capacity exceeded")]
    CapacityExceeded,

    /// Another authenticated session already holds this username
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    /// Username candidate failed validation
    #[error("Invalid username: {0}")]
    InvalidUsername(&'static str),

    /// Authenticate was called on a slot that is not in the reserved state
    #[error("Slot {0} is not reserved")]
    SlotNotReserved(SlotId),

    /// No authenticated user with the given name
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Target went away between lookup and delivery
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// Command was neither the listing token nor `target:body`
    #[error("Invalid message format")]
    InvalidFormat,

    /// Incoming line exceeded the configured maximum length
    #[error("Line too long (max {0} bytes)")]
    LineTooLong(usize),

    /// Peer closed the connection
    #[error("Disconnected")]
    Disconnected,
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

impl From<SendError> for AppError {
    fn from(_: SendError) -> Self {
        AppError::ChannelSend
    }
}
