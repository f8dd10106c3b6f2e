//! Session loop

use std::net::SocketAddr;
use std::sync::Arc;

use rh_core::traits::OutputSink;
use rh_core::ShellError;

use super::commander::{Commander, Flow, IDLE_PROMPT};
use crate::shell::{ReadOutcome, Shell, ShellReader};

/// Drives one operator session from first prompt to exit status
pub struct SessionRunner {
    shell: Arc<Shell>,
    reader: ShellReader,
    commander: Commander,
    user: String,
    peer: Option<SocketAddr>,
}

impl SessionRunner {
    pub fn new(
        shell: Arc<Shell>,
        reader: ShellReader,
        commander: Commander,
        user: impl Into<String>,
        peer: Option<SocketAddr>,
    ) -> Self {
        Self {
            shell,
            reader,
            commander,
            user: user.into(),
            peer,
        }
    }

    /// Run until the operator leaves or the terminal fails
    ///
    /// Every attached console is closed before returning. The exit status
    /// sent to the client is 0 on a normal exit and 1 after a terminal
    /// failure. Returns the status.
    pub async fn run(mut self) -> u32 {
        tracing::info!("Session started for {} from {:?}", self.user, self.peer);

        let result = self.serve().await;
        self.commander.close_all().await;

        let status = match result {
            Ok(()) => 0,
            Err(e) => {
                tracing::warn!("Session for {} ended with error: {}", self.user, e);
                // The terminal is probably gone; try anyway
                let _ = self.shell.output_line("").await;
                let _ = self.shell.output_line(&e.to_string()).await;
                1
            }
        };

        if let Err(e) = self.shell.exit(status).await {
            tracing::debug!("Failed to close terminal for {}: {}", self.user, e);
        }
        tracing::info!("Session ended for {} (status {})", self.user, status);
        status
    }

    async fn serve(&mut self) -> Result<(), ShellError> {
        self.shell.set_prompt(IDLE_PROMPT).await?;

        loop {
            let flow = match self.reader.read_line().await? {
                ReadOutcome::Line(line) => {
                    tracing::debug!("{}: {}", self.user, line);
                    self.commander.process(&line).await?
                }
                ReadOutcome::EndOfInput => self.commander.handle_end_of_input().await?,
            };

            if flow == Flow::EndSession {
                return Ok(());
            }
        }
    }
}
