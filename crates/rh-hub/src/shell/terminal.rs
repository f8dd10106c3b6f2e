//! Byte-level terminal transport

use async_trait::async_trait;
use russh::server::Handle;
use russh::{ChannelId, CryptoVec};

use rh_core::ShellError;

/// Where a shell's rendered bytes go
#[async_trait]
pub trait Terminal: Send + Sync {
    /// Send bytes to the operator's terminal
    async fn write(&self, bytes: &[u8]) -> Result<(), ShellError>;

    /// Report an exit status and close the terminal
    async fn exit(&self, status: u32) -> Result<(), ShellError>;
}

/// Terminal backed by an SSH session channel
pub struct ChannelTerminal {
    handle: Handle,
    channel: ChannelId,
}

impl ChannelTerminal {
    /// Wrap an SSH channel
    pub fn new(handle: Handle, channel: ChannelId) -> Self {
        Self { handle, channel }
    }
}

#[async_trait]
impl Terminal for ChannelTerminal {
    async fn write(&self, bytes: &[u8]) -> Result<(), ShellError> {
        self.handle
            .data(self.channel, CryptoVec::from_slice(bytes))
            .await
            .map_err(|_| ShellError::Closed)
    }

    async fn exit(&self, status: u32) -> Result<(), ShellError> {
        self.handle
            .exit_status_request(self.channel, status)
            .await
            .map_err(|_| ShellError::Closed)?;
        self.handle
            .eof(self.channel)
            .await
            .map_err(|_| ShellError::Closed)?;
        self.handle
            .close(self.channel)
            .await
            .map_err(|_| ShellError::Closed)
    }
}
