//! SSH server listener
//!
//! Accepts incoming operator connections and runs a handler for each.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use russh_keys::key::KeyPair;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::server::handler::{ClientHandler, ServerConfig};
use crate::state::HubState;

/// SSH server that listens for operator connections
pub struct SshServer {
    /// Server configuration
    config: ServerConfig,
    /// Shared hub state
    state: Arc<HubState>,
    /// Cancellation token for graceful shutdown
    cancel: CancellationToken,
}

impl SshServer {
    /// Create a new SSH server
    pub fn new(host_key: KeyPair, state: Arc<HubState>, cancel: CancellationToken) -> Self {
        Self {
            config: ServerConfig::new(host_key),
            state,
            cancel,
        }
    }

    /// Bind `bind_addr` and serve until cancelled
    pub async fn run(&self, bind_addr: &str) -> Result<()> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("Failed to bind to {}", bind_addr))?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until cancelled
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!("SSH server listening on {}", local_addr);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("SSH server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((socket, peer_addr)) => self.handle_connection(socket, peer_addr),
                        Err(e) => tracing::error!("Failed to accept connection: {}", e),
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        tracing::info!("New connection from {}", peer_addr);

        let config = Arc::clone(&self.config.ssh_config);
        let handler = ClientHandler::new(Arc::clone(&self.state), Some(peer_addr));
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let connection = async {
                let running = russh::server::run_stream(config, socket, handler).await?;
                running.await
            };

            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Connection handler cancelled for {}", peer_addr);
                    return;
                }
                result = connection => result,
            };

            match result {
                Ok(()) => tracing::info!("Connection from {} closed normally", peer_addr),
                Err(e) => tracing::warn!("Connection from {} closed with error: {}", peer_addr, e),
            }
        });
    }
}

/// Load the host key from `path`, or generate a throwaway one
pub fn load_host_key(path: Option<&Path>) -> Result<KeyPair> {
    let key = match path {
        Some(path) => {
            tracing::info!("Loading host key from {:?}", path);
            russh_keys::load_secret_key(path, None)
                .with_context(|| format!("Failed to load host key from {:?}", path))?
        }
        None => {
            tracing::warn!("No host key file configured, generating a temporary Ed25519 key");
            KeyPair::generate_ed25519()
                .ok_or_else(|| anyhow::anyhow!("Failed to generate Ed25519 key"))?
        }
    };

    match key.clone_public_key() {
        Ok(public) => tracing::info!("Host key fingerprint: {}", public.fingerprint()),
        Err(e) => tracing::warn!("Failed to derive host public key: {}", e),
    }
    Ok(key)
}
