//! Remote console link traits

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::ConnectionSpec;
use crate::error::LinkError;

/// An open, authenticated channel to one backend console
///
/// `read` and `write` may be called concurrently from different tasks.
#[async_trait]
pub trait ConsoleLink: Send + Sync {
    /// Send one command line to the console
    async fn write(&self, command: &str) -> Result<(), LinkError>;

    /// Wait for the next unit of console output
    ///
    /// Must return `LinkError::Closed` promptly once `close` was called.
    async fn read(&self) -> Result<String, LinkError>;

    /// Close the link, unblocking any pending `read`
    async fn close(&self) -> Result<(), LinkError>;

    /// Address of the console as seen by the socket
    fn remote_addr(&self) -> String;
}

/// Opens console links
#[async_trait]
pub trait Connector: Send + Sync {
    /// Dial and authenticate against the console described by `spec`
    async fn open(&self, spec: &ConnectionSpec) -> Result<Arc<dyn ConsoleLink>, LinkError>;
}
