//! Core error types for rcon-hub

use rh_protocol::ProtocolError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Marker carried by the error text of a link that was closed locally
pub const CLOSED_CONNECTION_MARKER: &str = "use of closed network connection";

/// Remote console link errors
#[derive(Error, Debug)]
pub enum LinkError {
    /// The link was closed on this side
    #[error("use of closed network connection")]
    Closed,

    /// The console rejected the password
    #[error("Authentication failed")]
    AuthFailed,

    /// Could not reach the console
    #[error("Failed to dial {address}: {source}")]
    Dial {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The console went quiet for longer than the configured deadline
    #[error("No response within {0:?}")]
    Timeout(Duration),

    /// The console closed the connection
    #[error("Connection closed by remote console")]
    RemoteClosed,

    /// Wire protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl LinkError {
    /// Whether this failure is the expected result of closing the link locally
    pub fn is_closed(&self) -> bool {
        matches!(self, LinkError::Closed) || self.to_string().contains(CLOSED_CONNECTION_MARKER)
    }
}

/// Terminal (output sink) errors
#[derive(Error, Debug)]
pub enum ShellError {
    /// The SSH channel behind the terminal is gone
    #[error("Terminal channel closed")]
    Closed,
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Malformed `name=password@host:port` entry
    #[error("Invalid connection '{entry}': {reason} (expected name=password@host:port)")]
    InvalidConnection { entry: String, reason: &'static str },

    /// No SSH users configured
    #[error("No users declared")]
    NoUsers,

    /// No console connections configured
    #[error("No connections declared")]
    NoConnections,
}
