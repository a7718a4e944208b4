//! Message router
//!
//! Resolves a target username to its connection handle and queues the
//! formatted message on it. The registry lock is released before the
//! send is awaited.

use std::sync::Arc;

use tracing::debug;

use crate::message::ServerMessage;
use crate::registry::Registry;

/// Result of a single routing attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Queued on the target's connection
    Delivered,
    /// No authenticated user with that name
    NotFound,
    /// Target disconnected between lookup and delivery
    Failed,
}

/// Direct-message router over the shared registry
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<Registry>,
}

impl Router {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Deliver `"<from>: <body>"` to `target`
    ///
    /// Waits for room in the target's outbound queue, which stalls only
    /// the calling connection if the target is slow to drain.
    pub async fn route(&self, target: &str, from: &str, body: &str) -> RouteOutcome {
        let Some(handle) = self.registry.lookup(target) else {
            return RouteOutcome::NotFound;
        };

        let msg = ServerMessage::Chat {
            from: from.to_string(),
            content: body.to_string(),
        };

        match handle.send(msg).await {
            Ok(()) => {
                debug!("Routed message from '{}' to '{}'", from, target);
                RouteOutcome::Delivered
            }
            Err(_) => {
                debug!("Target '{}' went away before delivery", target);
                RouteOutcome::Failed
            }
        }
    }
}
