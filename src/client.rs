//! Companion chat client
//!
//! Performs the username handshake, then runs a receiver task that prints
//! everything the server sends alongside a foreground loop that turns local
//! input into protocol lines.
//!
//! Local input is any `AsyncBufRead` so the binary can hand in stdin and
//! tests can hand in a byte slice.

use std::io::Write;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufRead, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::AppError;
use crate::message::{ServerMessage, AUTH_CONFIRMATION, LIST_COMMAND};

/// Prefix of the local send command
pub const SEND_PREFIX: &str = "SEND ";

/// Prompt shown before each command
pub const COMMAND_PROMPT: &str = "Enter command(LIST/SEND username:message): ";

const USERNAME_PROMPT: &str = "Enter username: ";

/// A line typed by the local user, after the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalCommand {
    /// Forward the listing token
    List,
    /// Forward the `username:message` payload
    Send(String),
    /// Rejected locally, nothing sent
    Invalid,
}

impl LocalCommand {
    pub fn parse(input: &str) -> Self {
        if input == LIST_COMMAND {
            LocalCommand::List
        } else if let Some(payload) = input.strip_prefix(SEND_PREFIX) {
            LocalCommand::Send(payload.to_string())
        } else {
            LocalCommand::Invalid
        }
    }
}

/// Connected client
pub struct ChatClient {
    reader: FramedRead<OwnedReadHalf, LinesCodec>,
    writer: FramedWrite<OwnedWriteHalf, LinesCodec>,
}

impl ChatClient {
    /// Connect to the server
    pub async fn connect(config: &ClientConfig) -> Result<Self, AppError> {
        let stream = TcpStream::connect(&config.server_addr).await?;
        debug!("Connected to {}", config.server_addr);

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: FramedRead::new(
                read_half,
                LinesCodec::new_with_max_length(config.max_line_length),
            ),
            writer: FramedWrite::new(
                write_half,
                LinesCodec::new_with_max_length(config.max_line_length),
            ),
        })
    }

    /// Claim a username, retrying until the server confirms one
    ///
    /// Returns `Ok(None)` if local input ends first, and `Disconnected`
    /// if the server turns the connection away for lack of capacity.
    pub async fn handshake<R>(&mut self, input: &mut Lines<R>) -> Result<Option<String>, AppError>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            prompt(USERNAME_PROMPT);
            let Some(username) = input.next_line().await? else {
                return Ok(None);
            };

            self.writer.send(username.as_str()).await?;

            let reply = self.reader.next().await.ok_or(AppError::Disconnected)??;
            if reply == AUTH_CONFIRMATION {
                println!("Authentication successful");
                return Ok(Some(username));
            }
            if reply == ServerMessage::ServerFull.to_string() {
                // The server closes the socket right after this reply
                println!("{}", reply);
                return Err(AppError::Disconnected);
            }
            println!("Authentication failed: {}", reply);
        }
    }

    /// Run the receiver task and the command loop
    ///
    /// Ends with `Disconnected` when the server goes away, or `Ok` when
    /// local input is exhausted.
    pub async fn run<R>(self, input: Lines<R>) -> Result<(), AppError>
    where
        R: AsyncBufRead + Unpin,
    {
        let Self { reader, mut writer } = self;
        let mut receiver = tokio::spawn(receive_messages(reader));

        tokio::select! {
            _ = &mut receiver => Err(AppError::Disconnected),
            result = command_loop(&mut writer, input) => {
                receiver.abort();
                result
            }
        }
    }
}

/// Print every line from the server until it disconnects
///
/// An over-long line is dropped with a notice; only EOF or an I/O error
/// ends the loop.
async fn receive_messages(mut reader: FramedRead<OwnedReadHalf, LinesCodec>) {
    // FramedRead yields a single None right after a decode error, then
    // resumes reading; that None is not EOF.
    let mut after_decode_error = false;

    loop {
        let Some(frame) = reader.next().await else {
            if std::mem::take(&mut after_decode_error) {
                continue;
            }
            break;
        };
        after_decode_error = false;

        match frame {
            Ok(line) => {
                println!("\n{}", line);
                prompt(COMMAND_PROMPT);
            }
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                after_decode_error = true;
                println!("\n[dropped an over-long message from the server]");
                prompt(COMMAND_PROMPT);
            }
            Err(LinesCodecError::Io(e)) => {
                debug!("Receive error: {}", e);
                break;
            }
        }
    }
    println!("Server disconnected");
}

/// Translate local input into protocol lines
async fn command_loop<R>(
    writer: &mut FramedWrite<OwnedWriteHalf, LinesCodec>,
    mut input: Lines<R>,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        prompt(COMMAND_PROMPT);
        let Some(line) = input.next_line().await? else {
            return Ok(());
        };

        match LocalCommand::parse(&line) {
            LocalCommand::List => writer.send(LIST_COMMAND).await?,
            LocalCommand::Send(payload) => writer.send(payload.as_str()).await?,
            LocalCommand::Invalid => {
                println!("Invalid command. Use LIST or SEND username:message");
            }
        }
    }
}

fn prompt(text: &str) {
    print!("{}", text);
    let _ = std::io::stdout().flush();
}
