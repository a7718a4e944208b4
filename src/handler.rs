//! TCP connection handler
//!
//! Runs the per-connection state machine: reserve a registry slot,
//! handshake for a unique username, then process commands until the peer
//! disconnects.
//!
//! The socket is split in two. The read half is driven inline by this
//! task; the write half belongs to a writer task fed through an mpsc
//! queue. That queue's sender is the connection handle other sessions use
//! to deliver messages, so every write to this socket goes through one
//! place.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::message::{chat_line_len, validate_username, ClientCommand, ServerMessage};
use crate::registry::Registry;
use crate::router::{RouteOutcome, Router};
use crate::session::{Session, SessionState};
use crate::types::{SessionId, SlotId};

type LineReader = FramedRead<OwnedReadHalf, LinesCodec>;

/// Handle a new TCP connection
///
/// Returns once the peer disconnects or the connection is rejected. The
/// reserved slot is released exactly once on the way out.
pub async fn handle_connection(
    stream: TcpStream,
    registry: Arc<Registry>,
    config: Arc<ServerConfig>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let session_id = SessionId::new();
    debug!("Session {} connecting from {}", session_id, peer_addr);

    let (read_half, write_half) = stream.into_split();
    let mut reader = FramedRead::new(
        read_half,
        LinesCodec::new_with_max_length(config.max_line_length),
    );
    let mut writer = FramedWrite::new(
        write_half,
        LinesCodec::new_with_max_length(config.max_line_length),
    );

    // Channel for registry/handler -> socket messages
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(config.outbound_buffer);
    let mut session = Session::new(session_id, msg_tx);

    let slot = match session.reserve(&registry) {
        Ok(slot) => slot,
        Err(e) => {
            warn!("Rejecting {} ({}): {}", peer_addr, session_id, e);
            // Best effort; the socket is closed either way
            let _ = writer.send(ServerMessage::from(e).to_string()).await;
            return Ok(());
        }
    };

    let write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            if writer.send(msg.to_string()).await.is_err() {
                debug!("Socket write failed, ending write task");
                break;
            }
        }
        let _ = SinkExt::<String>::close(&mut writer).await;
    });

    let router = Router::new(Arc::clone(&registry));
    debug!("Session {} reserved slot {}, authenticating", session.id, slot);

    let result = run_session(&mut session, slot, &mut reader, &registry, &router, &config).await;

    registry.release(slot);
    session.close();

    info!("Client {} disconnected", session.display_name());

    // Dropping the last local sender lets the writer flush and close
    drop(session);
    let _ = write_task.await;

    result
}

/// Read lines until EOF, dispatching on the session state
async fn run_session(
    session: &mut Session,
    slot: SlotId,
    reader: &mut LineReader,
    registry: &Registry,
    router: &Router,
    config: &ServerConfig,
) -> Result<(), AppError> {
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

        let line = match frame {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                debug!("Session {} sent an over-long line", session.id);
                after_decode_error = true;
                session
                    .send(AppError::LineTooLong(config.max_line_length).into())
                    .await?;
                continue;
            }
            Err(LinesCodecError::Io(e)) => return Err(e.into()),
        };

        if session.state == SessionState::Active {
            dispatch(session, &line, registry, router, config.max_line_length).await?;
        } else {
            authenticate(session, slot, line, registry).await?;
        }
    }

    Ok(())
}

/// Try one username candidate
///
/// Conflicts and invalid names are reported to the peer and leave the
/// session in `Authenticating`.
async fn authenticate(
    session: &mut Session,
    slot: SlotId,
    candidate: String,
    registry: &Registry,
) -> Result<(), AppError> {
    let attempt = validate_username(&candidate)
        .and_then(|()| registry.authenticate(slot, &candidate, session.sender.clone()));

    match attempt {
        Ok(()) => {
            info!("Client {} authenticated as '{}'", session.id, candidate);
            session.activate(candidate);
            session.send(ServerMessage::Authenticated).await?;
        }
        Err(e) => {
            debug!("Session {} rejected username: {}", session.id, e);
            session.send(e.into()).await?;
        }
    }

    Ok(())
}

/// Handle one command from an active session
///
/// A message whose forwarded line would exceed `max_line_length` is
/// refused, since the recipient reads with the same limit.
async fn dispatch(
    session: &Session,
    line: &str,
    registry: &Registry,
    router: &Router,
    max_line_length: usize,
) -> Result<(), AppError> {
    match ClientCommand::parse(line) {
        ClientCommand::List => {
            let users = registry.list_usernames();
            session.send(ServerMessage::OnlineUsers(users)).await?;
        }
        ClientCommand::Send { target, body } => {
            if chat_line_len(session.display_name(), &body) > max_line_length {
                debug!("Session {} message to '{}' too long to forward", session.id, target);
                session.send(AppError::LineTooLong(max_line_length).into()).await?;
                return Ok(());
            }

            match router.route(&target, session.display_name(), &body).await {
                RouteOutcome::Delivered => {}
                RouteOutcome::NotFound => {
                    session.send(AppError::UserNotFound(target).into()).await?;
                }
                RouteOutcome::Failed => {
                    session.send(AppError::DeliveryFailed(target).into()).await?;
                }
            }
        }
        ClientCommand::Malformed => {
            session.send(AppError::InvalidFormat.into()).await?;
        }
    }

    Ok(())
}
