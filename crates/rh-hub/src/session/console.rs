//! Attached consoles and their background readers

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tokio::task::JoinHandle;

use rh_core::traits::{ConsoleLink, OutputSink};
use rh_core::{LinkError, ShellError};

use super::commander::IDLE_PROMPT;

/// A console link registered in a session
pub(crate) struct AttachedConsole {
    /// Distinguishes this attachment from a later one under the same name
    pub id: u64,
    pub link: Arc<dyn ConsoleLink>,
    /// Background read task, set right after spawning
    pub reader: Option<JoinHandle<()>>,
}

/// Per-session attach table
///
/// Shared by the session loop and every background reader behind one
/// mutex. The mutex is never held across I/O.
#[derive(Default)]
pub(crate) struct ConsoleTable {
    pub attached: HashMap<String, AttachedConsole>,
    /// Console receiving forwarded input; always a key of `attached`
    pub active: Option<String>,
    /// Longest name (in chars) attached so far this session; only ever grows
    pub max_name_seen: usize,
    next_id: u64,
}

impl ConsoleTable {
    /// Register a console and make it active
    ///
    /// Returns the new attachment id and whatever was attached under the
    /// same name before.
    pub fn attach(&mut self, name: &str, link: Arc<dyn ConsoleLink>) -> (u64, Option<AttachedConsole>) {
        self.next_id += 1;
        let id = self.next_id;
        let replaced = self.attached.insert(
            name.to_string(),
            AttachedConsole {
                id,
                link,
                reader: None,
            },
        );
        self.active = Some(name.to_string());
        self.max_name_seen = self.max_name_seen.max(name.chars().count());
        (id, replaced)
    }

    /// Record the reader task of an attachment that is still present
    pub fn set_reader(&mut self, name: &str, id: u64, reader: JoinHandle<()>) {
        if let Some(console) = self.attached.get_mut(name) {
            if console.id == id {
                console.reader = Some(reader);
            }
        }
    }

    /// Remove a console by name, clearing `active` if it pointed at it
    ///
    /// The flag tells whether the removed console was the active one.
    pub fn remove(&mut self, name: &str) -> Option<(AttachedConsole, bool)> {
        let console = self.attached.remove(name)?;
        let was_active = self.active.as_deref() == Some(name);
        if was_active {
            self.active = None;
        }
        Some((console, was_active))
    }

    /// Remove a specific attachment; leaves a newer one under the same name alone
    pub fn remove_attachment(&mut self, name: &str, id: u64) -> Option<(AttachedConsole, bool)> {
        match self.attached.get(name) {
            Some(console) if console.id == id => self.remove(name),
            _ => None,
        }
    }

    /// Whether the given attachment is the active console
    pub fn is_active(&self, name: &str, id: u64) -> bool {
        self.active.as_deref() == Some(name)
            && self.attached.get(name).is_some_and(|console| console.id == id)
    }

    /// Name and link of the active console
    pub fn active_link(&self) -> Option<(String, Arc<dyn ConsoleLink>)> {
        let name = self.active.as_ref()?;
        let console = self.attached.get(name)?;
        Some((name.clone(), Arc::clone(&console.link)))
    }

    /// Detach everything, returning the consoles so they can be closed
    pub fn drain(&mut self) -> Vec<(String, AttachedConsole)> {
        self.active = None;
        self.attached.drain().collect()
    }
}

/// Attach table of one session plus the lock ordering prompt updates
#[derive(Default)]
pub(crate) struct SessionConsoles {
    table: Mutex<ConsoleTable>,
    /// Held from reading `active` until the matching prompt is written
    prompt: tokio::sync::Mutex<()>,
}

impl SessionConsoles {
    pub fn lock(&self) -> MutexGuard<'_, ConsoleTable> {
        self.table.lock()
    }

    /// Show the prompt for whatever console is active right now
    ///
    /// Updates are serialized, so the last one to run always reflects the
    /// latest table state.
    pub async fn sync_prompt(&self, sink: &dyn OutputSink) -> Result<(), ShellError> {
        let _ordered = self.prompt.lock().await;
        let prompt = {
            let table = self.table.lock();
            match table.active.as_deref() {
                Some(name) => format!("{}> ", name),
                None => IDLE_PROMPT.to_string(),
            }
        };
        sink.set_prompt(&prompt).await
    }
}

/// Background task pumping one console's output into the shell
pub(crate) struct ConsoleReader {
    pub name: String,
    pub id: u64,
    pub link: Arc<dyn ConsoleLink>,
    pub consoles: Arc<SessionConsoles>,
    pub sink: Arc<dyn OutputSink>,
}

impl ConsoleReader {
    pub async fn run(self) {
        tracing::debug!("Reader started for console {}", self.name);
        loop {
            match self.link.read().await {
                Ok(response) => {
                    if let Err(e) = self.deliver(&response).await {
                        tracing::warn!("Failed to output to shell for {}: {}", self.name, e);
                        break;
                    }
                }
                Err(err) => {
                    self.finish(err).await;
                    break;
                }
            }
        }
        tracing::debug!("Reader stopped for console {}", self.name);
    }

    /// Write one response, one burst per response
    async fn deliver(&self, response: &str) -> Result<(), ShellError> {
        let (active, width) = {
            let table = self.consoles.lock();
            (table.is_active(&self.name, self.id), table.max_name_seen)
        };

        let lines: Vec<String> = if active {
            response
                .lines()
                .flat_map(|line| [String::new(), line.to_string()])
                .collect()
        } else {
            response
                .lines()
                .map(|line| format!("{:>width$} | {}", self.name, line, width = width))
                .collect()
        };

        self.sink.output_burst(&lines).await
    }

    /// Drop this console after its link failed and tell the operator why
    async fn finish(&self, err: LinkError) {
        let removed = self.consoles.lock().remove_attachment(&self.name, self.id);
        if let Some((_, true)) = removed {
            if let Err(e) = self.consoles.sync_prompt(self.sink.as_ref()).await {
                tracing::debug!("Failed to reset prompt: {}", e);
            }
        }

        let notice = if err.is_closed() {
            tracing::info!("Disconnected from console {}", self.name);
            format!("Disconnected from {}", self.name)
        } else {
            tracing::warn!("Remote error on console {}: {}", self.name, err);
            format!("Remote error: {}", err)
        };

        if let Err(e) = self.sink.output_line(&notice).await {
            tracing::debug!("Failed to output to shell: {}", e);
        }
    }
}
