//! Per-session console multiplexer
//!
//! The commander owns the consoles attached in one operator session. While
//! no console is active, input lines are hub commands (`list`, `connect`,
//! ...). After a successful `connect` the console becomes active and every
//! line is forwarded to it verbatim until the operator detaches with
//! Ctrl-D. Each attached console has a background reader that prints its
//! output, prefixed with the console name unless it is the active one.

use std::sync::Arc;
use std::time::Duration;

use rh_core::traits::{Connector, OutputSink};
use rh_core::{ConnectionRegistry, ShellError};

use super::console::{AttachedConsole, ConsoleReader, SessionConsoles};

/// Prompt shown while no console is active
pub const IDLE_PROMPT: &str = "> ";

/// How long teardown waits for background readers to notice their link closed
pub const TEARDOWN_GRACE: Duration = Duration::from_secs(2);

const COMMANDS: &[&str] = &[
    "list",
    "connect <connection>",
    "disconnect <connection>",
    "exit|quit",
    "help|?",
];

/// What the session loop should do after a call into the commander
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading input
    Continue,
    /// The operator is done; close the session normally
    EndSession,
}

/// Console multiplexer for one operator session
///
/// Only terminal output failures are returned as errors; they end the
/// session because nothing more can be shown to the operator. Console
/// failures of any kind are reported in the terminal and the session goes
/// on.
pub struct Commander {
    registry: Arc<ConnectionRegistry>,
    connector: Arc<dyn Connector>,
    sink: Arc<dyn OutputSink>,
    consoles: Arc<SessionConsoles>,
}

impl Commander {
    /// Create a commander writing to `sink`
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        connector: Arc<dyn Connector>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            registry,
            connector,
            sink,
            consoles: Arc::new(SessionConsoles::default()),
        }
    }

    /// Name of the console receiving input, if any
    pub fn active(&self) -> Option<String> {
        self.consoles.lock().active.clone()
    }

    /// Names of all attached consoles, sorted
    pub fn attached(&self) -> Vec<String> {
        let mut names: Vec<String> = self.consoles.lock().attached.keys().cloned().collect();
        names.sort();
        names
    }

    /// Handle one line of operator input
    pub async fn process(&self, line: &str) -> Result<Flow, ShellError> {
        if line.is_empty() {
            return Ok(Flow::Continue);
        }

        let active = self.consoles.lock().active_link();
        if let Some((name, link)) = active {
            if let Err(e) = link.write(line).await {
                tracing::warn!("Failed to forward command to {}: {}", name, e);
                self.sink.output_line(&format!("Failed to send: {}", e)).await?;
            }
            return Ok(Flow::Continue);
        }

        let mut parts = line.split_whitespace();
        let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = parts.collect();

        match verb.as_str() {
            "list" => self.list().await?,
            "connect" => self.connect(&args).await?,
            "disconnect" => self.disconnect(&args).await?,
            "exit" | "quit" => {
                self.close_all().await;
                return Ok(Flow::EndSession);
            }
            _ => self.show_help().await?,
        }

        Ok(Flow::Continue)
    }

    /// Handle the operator closing input (Ctrl-D / Ctrl-C)
    ///
    /// While attached this detaches and the session continues; while idle
    /// it ends the session.
    pub async fn handle_end_of_input(&self) -> Result<Flow, ShellError> {
        if self.active().is_some() {
            self.detach().await?;
            Ok(Flow::Continue)
        } else {
            self.close_all().await;
            Ok(Flow::EndSession)
        }
    }

    /// Move the active console to the background, or close it when its
    /// connection is configured to auto-disconnect
    pub async fn detach(&self) -> Result<(), ShellError> {
        let detached = {
            let mut table = self.consoles.lock();
            match table.active.clone() {
                None => None,
                Some(name) => {
                    let auto_disconnect = self
                        .registry
                        .get(&name)
                        .is_some_and(|spec| spec.auto_disconnect);
                    let closing = if auto_disconnect {
                        table.remove(&name).map(|(console, _)| console)
                    } else {
                        table.active = None;
                        None
                    };
                    Some((name, closing))
                }
            }
        };

        match detached {
            None => {
                self.sink.bell().await?;
                self.sink.output_line("Not connected").await?;
                return Ok(());
            }
            Some((name, Some(console))) => {
                tracing::info!("Detached from {} (auto-disconnect)", name);
                self.close_console(&name, console).await?;
            }
            Some((name, None)) => {
                tracing::info!("Detached from {}", name);
                self.sink
                    .output_line(&format!(
                        "Detached. Use 'disconnect {}' to stop receiving",
                        name
                    ))
                    .await?;
            }
        }

        self.consoles.sync_prompt(self.sink.as_ref()).await
    }

    /// Close every attached console
    ///
    /// Waits up to [`TEARDOWN_GRACE`] for the background readers to finish
    /// and aborts any that are still running after that.
    pub async fn close_all(&self) {
        let consoles = self.consoles.lock().drain();
        if consoles.is_empty() {
            return;
        }

        let mut readers = Vec::new();
        for (name, console) in consoles {
            if let Err(e) = console.link.close().await {
                tracing::error!(
                    "Failed to close console connection to {} ({}): {}",
                    name,
                    console.link.remote_addr(),
                    e
                );
            }
            readers.extend(console.reader);
        }

        let aborts: Vec<_> = readers.iter().map(|reader| reader.abort_handle()).collect();
        if tokio::time::timeout(TEARDOWN_GRACE, futures::future::join_all(readers))
            .await
            .is_err()
        {
            tracing::warn!("Console readers still running after teardown, aborting");
            for abort in aborts {
                abort.abort();
            }
        }
    }

    async fn show_help(&self) -> Result<(), ShellError> {
        self.sink.output_line("Available commands:").await?;
        for command in COMMANDS {
            self.sink.output_line(command).await?;
        }
        Ok(())
    }

    async fn list(&self) -> Result<(), ShellError> {
        self.sink.output_line("Configured connections:").await?;
        for spec in self.registry.iter() {
            self.sink
                .output_line(&format!("  {} -> {}", spec.name, spec.address))
                .await?;
        }

        let mut connected: Vec<(String, String)> = {
            let table = self.consoles.lock();
            table
                .attached
                .iter()
                .map(|(name, console)| (name.clone(), console.link.remote_addr()))
                .collect()
        };
        if connected.is_empty() {
            return Ok(());
        }
        connected.sort();

        self.sink.output_line("Connected consoles:").await?;
        for (name, addr) in connected {
            self.sink
                .output_line(&format!("  {} -> {}", name, addr))
                .await?;
        }
        Ok(())
    }

    async fn connect(&self, args: &[&str]) -> Result<(), ShellError> {
        let name = match args {
            [] => return self.sink.output_line("Missing args").await,
            [name] => *name,
            _ => return self.sink.output_line("Too many args").await,
        };

        let Some(spec) = self.registry.get(name) else {
            return self.sink.output_line("Unknown connection").await;
        };

        let link = match self.connector.open(&spec).await {
            Ok(link) => link,
            Err(e) => {
                tracing::warn!("Failed to connect to {} at {}: {}", name, spec.address, e);
                return self
                    .sink
                    .output_line(&format!("Failed to connect: {}", e))
                    .await;
            }
        };
        tracing::info!("Connected to {} at {}", name, link.remote_addr());

        self.sink.output_line("Connected!").await?;
        self.sink.output_line("Use Control-D to detach").await?;

        let (id, replaced) = self.consoles.lock().attach(name, Arc::clone(&link));
        if let Some(old) = replaced {
            tracing::debug!("Replacing previous attachment of {}", name);
            self.close_console(name, old).await?;
        }

        let reader = ConsoleReader {
            name: name.to_string(),
            id,
            link,
            consoles: Arc::clone(&self.consoles),
            sink: Arc::clone(&self.sink),
        };
        let handle = tokio::spawn(reader.run());
        self.consoles.lock().set_reader(name, id, handle);

        self.consoles.sync_prompt(self.sink.as_ref()).await
    }

    async fn disconnect(&self, args: &[&str]) -> Result<(), ShellError> {
        let name = match args {
            [] => {
                return self
                    .sink
                    .output_line("Missing connection name to disconnect")
                    .await
            }
            [name] => *name,
            _ => return self.sink.output_line("Too many args").await,
        };

        let removed = self.consoles.lock().remove(name);
        let Some((console, was_active)) = removed else {
            return self
                .sink
                .output_line(&format!("Connection {} is not attached", name))
                .await;
        };

        if was_active {
            self.consoles.sync_prompt(self.sink.as_ref()).await?;
        }
        self.close_console(name, console).await
    }

    /// Close a console that was already taken out of the table
    ///
    /// Its reader notices the closed link and prints the disconnect notice.
    async fn close_console(&self, name: &str, console: AttachedConsole) -> Result<(), ShellError> {
        if let Err(e) = console.link.close().await {
            tracing::warn!("Failed to close console {}: {}", name, e);
            self.sink
                .output_line(&format!("Failed to disconnect: {}", e))
                .await?;
        }
        Ok(())
    }
}
