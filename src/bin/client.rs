//! Direct-message chat client - Entry Point
//!
//! Connects to the local server, claims a username, then forwards
//! `LIST` and `SEND username:message` commands typed on stdin.

use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use direct_chat::{AppError, ChatClient, ClientConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with the chat display
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("direct_chat=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut client = ChatClient::connect(&ClientConfig::default()).await?;
    println!("Connected to server");

    let mut input = BufReader::new(io::stdin()).lines();

    if client.handshake(&mut input).await?.is_none() {
        return Ok(());
    }

    match client.run(input).await {
        Ok(()) => Ok(()),
        // "Server disconnected" was already printed by the receiver
        Err(AppError::Disconnected) => std::process::exit(1),
        Err(e) => Err(e.into()),
    }
}
