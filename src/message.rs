//! Message protocol definitions
//!
//! Newline-delimited text protocol. Every logical message is exactly one
//! line; framing is handled by `LinesCodec`, so the types here only deal
//! with the text of a single line.

use std::fmt;

use crate::error::AppError;

/// Listing command token
pub const LIST_COMMAND: &str = "LIST";

/// Separator between target username and message body
pub const COMMAND_SEPARATOR: char = ':';

/// Reply sent when a username is accepted
pub const AUTH_CONFIRMATION: &str = "Authenticated";

/// Prefix of the listing reply
pub const ONLINE_PREFIX: &str = "Online clients: ";

/// Longest username accepted during the handshake
pub const MAX_USERNAME_LENGTH: usize = 50;

/// Client → Server command (after authentication)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// List authenticated users
    List,
    /// Direct message to another user
    Send { target: String, body: String },
    /// Neither of the above
    Malformed,
}

impl ClientCommand {
    /// Tokenize one command line
    ///
    /// Splits on the first separator only, so the body may itself
    /// contain `:`. An empty target or body is malformed.
    pub fn parse(line: &str) -> Self {
        if line == LIST_COMMAND {
            return ClientCommand::List;
        }

        match line.split_once(COMMAND_SEPARATOR) {
            Some((target, body)) if !target.is_empty() && !body.is_empty() => {
                ClientCommand::Send {
                    target: target.to_string(),
                    body: body.to_string(),
                }
            }
            _ => ClientCommand::Malformed,
        }
    }
}

/// Length in bytes of the line a routed message is delivered as
pub fn chat_line_len(from: &str, content: &str) -> usize {
    from.len() + ": ".len() + content.len()
}

/// Check a username candidate from the handshake
pub fn validate_username(candidate: &str) -> Result<(), AppError> {
    if candidate.is_empty() {
        return Err(AppError::InvalidUsername("must not be empty"));
    }
    if candidate.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AppError::InvalidUsername("too long"));
    }
    if candidate.contains(COMMAND_SEPARATOR) {
        return Err(AppError::InvalidUsername("must not contain ':'"));
    }
    if candidate.chars().any(char::is_whitespace) {
        return Err(AppError::InvalidUsername("must not contain whitespace"));
    }
    Ok(())
}

/// Server → Client message
///
/// `Display` renders the exact line written to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Username accepted
    Authenticated,
    /// No free registry slot; the connection is closed after this
    ServerFull,
    /// Snapshot of authenticated usernames in slot order
    OnlineUsers(Vec<String>),
    /// Routed direct message
    Chat { from: String, content: String },
    /// Error occurred
    Error { code: ErrorCode, message: String },
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Authenticated => f.write_str(AUTH_CONFIRMATION),
            ServerMessage::ServerFull => f.write_str("Server is full"),
            ServerMessage::OnlineUsers(users) => {
                write!(f, "{}{}", ONLINE_PREFIX, users.join(", "))
            }
            ServerMessage::Chat { from, content } => write!(f, "{}: {}", from, content),
            ServerMessage::Error { message, .. } => f.write_str(message),
        }
    }
}

/// Error codes for ServerMessage::Error
///
/// Not sent on the wire; only the message text is. Lets callers tell
/// error replies apart without matching on text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Username held by another session
    UsernameTaken,
    /// Username failed validation
    InvalidUsername,
    /// Send target is not online
    UserNotFound,
    /// Send target disconnected mid-delivery
    DeliveryFailed,
    /// Invalid command format
    InvalidFormat,
    /// Line exceeded the maximum length
    LineTooLong,
    /// Anything else
    Internal,
}

/// Convert AppError to ServerMessage for client notification
impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        let (code, message) = match &err {
            AppError::CapacityExceeded => return ServerMessage::ServerFull,
            AppError::UsernameTaken(_) => {
                (ErrorCode::UsernameTaken, "Username already taken".to_string())
            }
            AppError::InvalidUsername(reason) => {
                (ErrorCode::InvalidUsername, format!("Invalid username: {}", reason))
            }
            AppError::UserNotFound(target) => (
                ErrorCode::UserNotFound,
                format!("User {} not found or not online", target),
            ),
            AppError::DeliveryFailed(target) => (
                ErrorCode::DeliveryFailed,
                format!("Failed to deliver message to {}", target),
            ),
            AppError::InvalidFormat => (
                ErrorCode::InvalidFormat,
                "Invalid message format. Use username:message".to_string(),
            ),
            AppError::LineTooLong(max) => (
                ErrorCode::LineTooLong,
                format!("Message too long (max {} bytes)", max),
            ),
            // Fatal errors are not typically converted (connection closes)
            _ => (ErrorCode::Internal, "Internal error".to_string()),
        };
        ServerMessage::Error { code, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        assert_eq!(ClientCommand::parse("LIST"), ClientCommand::List);
        // The token is case-sensitive and must match exactly
        assert_eq!(ClientCommand::parse("list"), ClientCommand::Malformed);
        assert_eq!(ClientCommand::parse("LIST "), ClientCommand::Malformed);
    }

    #[test]
    fn test_parse_send_splits_on_first_separator() {
        assert_eq!(
            ClientCommand::parse("bob:see you at 10:30"),
            ClientCommand::Send {
                target: "bob".to_string(),
                body: "see you at 10:30".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(ClientCommand::parse("hello"), ClientCommand::Malformed);
        assert_eq!(ClientCommand::parse(""), ClientCommand::Malformed);
        assert_eq!(ClientCommand::parse("bob:"), ClientCommand::Malformed);
        assert_eq!(ClientCommand::parse(":hi"), ClientCommand::Malformed);
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("a:b").is_err());
        assert!(validate_username("two words").is_err());
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LENGTH)).is_ok());
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_server_message_lines() {
        assert_eq!(ServerMessage::Authenticated.to_string(), "Authenticated");
        assert_eq!(
            ServerMessage::Chat {
                from: "a".to_string(),
                content: "hello".to_string(),
            }
            .to_string(),
            "a: hello"
        );
        assert_eq!(
            ServerMessage::OnlineUsers(vec!["a".to_string(), "b".to_string()]).to_string(),
            "Online clients: a, b"
        );
    }

    #[test]
    fn test_chat_line_len_matches_rendered_line() {
        let msg = ServerMessage::Chat {
            from: "alice".to_string(),
            content: "héllo".to_string(),
        };
        assert_eq!(chat_line_len("alice", "héllo"), msg.to_string().len());
    }

    #[test]
    fn test_error_conversion() {
        let msg: ServerMessage = AppError::UserNotFound("bob".to_string()).into();
        assert_eq!(msg.to_string(), "User bob not found or not online");
        assert!(matches!(
            msg,
            ServerMessage::Error {
                code: ErrorCode::UserNotFound,
                ..
            }
        ));

        let taken: ServerMessage = AppError::UsernameTaken("a".to_string()).into();
        assert_ne!(taken.to_string(), AUTH_CONFIRMATION);

        let full: ServerMessage = AppError::CapacityExceeded.into();
        assert_eq!(full, ServerMessage::ServerFull);
    }
}
