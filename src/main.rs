//! Direct-message chat server - Entry Point
//!
//! Binds the fixed port and accepts connections until interrupted.

use tracing_subscriber::EnvFilter;

use direct_chat::{ChatServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=direct_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("direct_chat=info")),
        )
        .init();

    // Bind failure is fatal and exits with an error
    let server = ChatServer::bind(ServerConfig::default()).await?;
    server.run().await;

    Ok(())
}
