//! Connection acceptor
//!
//! Owns the TCP listener and the shared registry, and spawns one handler
//! task per accepted connection.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::registry::Registry;

/// The chat server
pub struct ChatServer {
    listener: TcpListener,
    registry: Arc<Registry>,
    config: Arc<ServerConfig>,
}

impl ChatServer {
    /// Bind the listener
    ///
    /// Failure here is the only process-fatal error.
    pub async fn bind(config: ServerConfig) -> Result<Self, AppError> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        let registry = Arc::new(Registry::new(config.capacity));

        info!(
            "Chat server listening on {} (capacity {})",
            listener.local_addr()?,
            config.capacity
        );

        Ok(Self {
            listener,
            registry,
            config: Arc::new(config),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared registry handle
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Accept connections for the lifetime of the process
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let registry = Arc::clone(&self.registry);
                    let config = Arc::clone(&self.config);

                    // Spawn handler task for each connection
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, registry, config).await {
                            warn!("Connection {} ended with error: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}
