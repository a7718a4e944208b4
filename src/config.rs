//! Server and client configuration
//!
//! Neither binary takes arguments; both run with the defaults below.
//! Tests construct the structs directly to bind an ephemeral port or
//! shrink the registry.

/// Default server bind address (all interfaces, fixed port)
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Default address the client connects to
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8080";

/// Default number of registry slots
pub const DEFAULT_CAPACITY: usize = 4;

/// Default maximum length of one framed line, in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Default per-connection outbound queue depth
pub const DEFAULT_OUTBOUND_BUFFER: usize = 32;

/// Server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind_addr: String,
    /// Registry capacity (maximum concurrent sessions)
    pub capacity: usize,
    /// Maximum accepted line length
    pub max_line_length: usize,
    /// Outbound queue depth per connection
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            capacity: DEFAULT_CAPACITY,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

/// Client settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address to connect to
    pub server_addr: String,
    /// Maximum accepted line length
    pub max_line_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}
