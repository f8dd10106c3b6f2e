//! SSH client handler implementation
//!
//! Implements the russh server handler for operator connections: password
//! authentication, one shell per session channel, and keystroke delivery
//! to the session task.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::server::{Auth, Handler, Msg, Session};
use russh::{Channel, ChannelId, MethodSet, Pty};
use tokio::sync::mpsc;

use crate::session::{Commander, SessionRunner};
use crate::shell::{ChannelTerminal, Shell, ShellReader, TerminalInput};
use crate::state::HubState;

/// Keystroke chunks buffered per channel before the handler waits
const INPUT_BUFFER: usize = 256;

/// A session channel and the way to reach its session task
struct SessionChannel {
    input_tx: mpsc::Sender<TerminalInput>,
    /// Taken when the shell starts
    input_rx: Option<mpsc::Receiver<TerminalInput>>,
}

/// Handler for a single SSH client connection
pub struct ClientHandler {
    /// Shared hub state
    state: Arc<HubState>,
    /// Peer address of the connecting client
    peer_addr: Option<SocketAddr>,
    /// Authenticated user name
    user: Option<String>,
    /// Open session channels
    channels: HashMap<ChannelId, SessionChannel>,
}

impl ClientHandler {
    /// Create a handler for a freshly accepted connection
    pub fn new(state: Arc<HubState>, peer_addr: Option<SocketAddr>) -> Self {
        Self {
            state,
            peer_addr,
            user: None,
            channels: HashMap::new(),
        }
    }

    /// Start the session task for `channel`
    fn start_session(&mut self, channel: ChannelId, session: &mut Session) -> bool {
        let Some(input_rx) = self
            .channels
            .get_mut(&channel)
            .and_then(|entry| entry.input_rx.take())
        else {
            tracing::warn!("Shell requested twice on {:?}", channel);
            return false;
        };

        let user = self.user.clone().unwrap_or_default();
        let terminal = Arc::new(ChannelTerminal::new(session.handle(), channel));
        let shell = Arc::new(Shell::new(terminal, self.state.history_size()));
        let reader = ShellReader::new(Arc::clone(&shell), input_rx);
        let commander = Commander::new(
            Arc::clone(&self.state.registry),
            Arc::clone(&self.state.connector),
            shell.clone(),
        );

        let runner = SessionRunner::new(shell, reader, commander, user, self.peer_addr);
        tokio::spawn(runner.run());
        true
    }

    /// Hand input to the channel's session task
    async fn deliver(&self, channel: ChannelId, input: TerminalInput) {
        let Some(entry) = self.channels.get(&channel) else {
            return;
        };
        if entry.input_tx.send(input).await.is_err() {
            tracing::debug!("Session on {:?} already ended", channel);
        }
    }
}

#[async_trait]
impl Handler for ClientHandler {
    type Error = anyhow::Error;

    /// Check the user name and password against the configured users
    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        if self.state.users.verify(user, password) {
            tracing::info!("User {} authenticated from {:?}", user, self.peer_addr);
            self.user = Some(user.to_string());
            return Ok(Auth::Accept);
        }

        tracing::warn!(
            "Authentication REJECTED for {} from {:?}",
            user,
            self.peer_addr
        );
        Ok(Auth::Reject {
            proceed_with_methods: None,
        })
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        let channel_id = channel.id();
        tracing::debug!("Channel opened: {:?}", channel_id);

        let (input_tx, input_rx) = mpsc::channel(INPUT_BUFFER);
        self.channels.insert(
            channel_id,
            SessionChannel {
                input_tx,
                input_rx: Some(input_rx),
            },
        );
        Ok(true)
    }

    /// Accept any terminal; the editor only needs a byte stream
    #[allow(clippy::too_many_arguments)]
    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        tracing::debug!(
            "PTY requested on {:?}: {} {}x{}",
            channel,
            term,
            col_width,
            row_height
        );
        session.channel_success(channel);
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        if self.start_session(channel, session) {
            session.channel_success(channel);
        } else {
            session.channel_failure(channel);
        }
        Ok(())
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        tracing::trace!("Received {} bytes on channel {:?}", data.len(), channel);
        self.deliver(channel, TerminalInput::Data(data.to_vec()))
            .await;
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        tracing::debug!("Channel EOF: {:?}", channel);
        self.deliver(channel, TerminalInput::Closed).await;
        Ok(())
    }

    async fn channel_close(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        tracing::debug!("Channel closed: {:?}", channel);
        // Dropping the sender ends the session's input
        self.channels.remove(&channel);
        Ok(())
    }
}

/// Configuration for the SSH server
#[derive(Clone)]
pub struct ServerConfig {
    /// russh server configuration
    pub ssh_config: Arc<russh::server::Config>,
}

impl ServerConfig {
    /// Password-only server configuration with the given host key
    pub fn new(host_key: russh_keys::key::KeyPair) -> Self {
        let config = russh::server::Config {
            methods: MethodSet::PASSWORD,
            keys: vec![host_key],
            auth_rejection_time: Duration::from_secs(1),
            auth_rejection_time_initial: Some(Duration::from_secs(0)),
            ..Default::default()
        };

        Self {
            ssh_config: Arc::new(config),
        }
    }
}
