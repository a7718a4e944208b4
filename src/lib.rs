//! Direct-Message TCP Chat Server Library
//!
//! A multi-client chat service over plain TCP: clients claim a unique
//! username, list who is online, and send direct messages to each other.
//!
//! # Features
//! - Capacity-bounded client registry
//! - Username handshake with conflict rejection
//! - `LIST` command for online users
//! - `username:message` direct messages
//! - Companion terminal client
//!
//! # Architecture
//! - `ChatServer` accepts sockets and spawns one handler task each
//! - Each handler owns its `Session` and drives the state machine
//! - `Registry` is the only shared state, guarded by a single mutex that
//!   is never held across I/O
//! - `Router` looks up a target's outbound queue and delivers to it
//! - All traffic is newline-delimited text (`LinesCodec`)
//!
//! # Example
//! ```ignore
//! use direct_chat::{ChatServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = ChatServer::bind(ServerConfig::default()).await.unwrap();
//!     server.run().await;
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use client::{ChatClient, LocalCommand};
pub use config::{ClientConfig, ServerConfig};
pub use error::{AppError, SendError};
pub use handler::handle_connection;
pub use message::{ClientCommand, ErrorCode, ServerMessage};
pub use registry::{ConnectionHandle, Registry};
pub use router::{RouteOutcome, Router};
pub use server::ChatServer;
pub use session::{Session, SessionState};
pub use types::{SessionId, SlotId};
