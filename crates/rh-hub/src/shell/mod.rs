//! Operator shell
//!
//! [`Shell`] is the output side of a session: every writer (command
//! responses and console output alike) goes through its lock, so one
//! caller's lines are never split by another's. [`ShellReader`] is the
//! input side, owned by the session loop.

mod editor;
mod terminal;

pub use editor::{LineEditor, ReadOutcome};
pub use terminal::{ChannelTerminal, Terminal};

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use rh_core::traits::OutputSink;
use rh_core::ShellError;

/// Input delivered from the SSH channel to a session
#[derive(Debug)]
pub enum TerminalInput {
    /// Raw bytes typed by the operator
    Data(Vec<u8>),
    /// The client sent EOF or closed the channel
    Closed,
}

/// Line-oriented terminal for one operator session
pub struct Shell {
    terminal: Arc<dyn Terminal>,
    editor: Mutex<LineEditor>,
}

impl Shell {
    /// Create a shell over `terminal` with an empty prompt
    pub fn new(terminal: Arc<dyn Terminal>, history_size: usize) -> Self {
        Self {
            terminal,
            editor: Mutex::new(LineEditor::new("", history_size)),
        }
    }

    /// Report an exit status and close the terminal
    pub async fn exit(&self, status: u32) -> Result<(), ShellError> {
        self.terminal.exit(status).await
    }

    /// Run `f` against the editor and send whatever it rendered, all under
    /// the output lock
    async fn with_editor<F, R>(&self, f: F) -> Result<R, ShellError>
    where
        F: FnOnce(&mut LineEditor, &mut Vec<u8>) -> R + Send,
        R: Send,
    {
        let mut editor = self.editor.lock().await;
        let mut out = Vec::new();
        let result = f(&mut editor, &mut out);
        if !out.is_empty() {
            self.terminal.write(&out).await?;
        }
        Ok(result)
    }
}

#[async_trait]
impl OutputSink for Shell {
    async fn output_line(&self, line: &str) -> Result<(), ShellError> {
        self.with_editor(|editor, out| editor.output_lines(&[line], out))
            .await
    }

    async fn output_burst(&self, lines: &[String]) -> Result<(), ShellError> {
        self.with_editor(|editor, out| {
            editor.output_lines(lines, out);
            editor.refresh(out);
        })
        .await
    }

    async fn set_prompt(&self, prompt: &str) -> Result<(), ShellError> {
        self.with_editor(|editor, out| editor.set_prompt(prompt, out))
            .await
    }

    async fn bell(&self) -> Result<(), ShellError> {
        self.with_editor(|editor, out| editor.bell(out)).await
    }

    async fn refresh(&self) -> Result<(), ShellError> {
        self.with_editor(|editor, out| editor.refresh(out)).await
    }
}

/// Reads edited lines for the session loop
pub struct ShellReader {
    shell: Arc<Shell>,
    input: mpsc::Receiver<TerminalInput>,
    closed: bool,
}

impl ShellReader {
    /// Read from `input`, echoing through `shell`
    pub fn new(shell: Arc<Shell>, input: mpsc::Receiver<TerminalInput>) -> Self {
        Self {
            shell,
            input,
            closed: false,
        }
    }

    /// Wait for the next line or end of input
    ///
    /// Once the channel has closed every further call returns
    /// [`ReadOutcome::EndOfInput`].
    pub async fn read_line(&mut self) -> Result<ReadOutcome, ShellError> {
        if self.closed {
            return Ok(ReadOutcome::EndOfInput);
        }

        let mut data = Vec::new();
        loop {
            let outcome = self
                .shell
                .with_editor(|editor, out| {
                    editor.show_prompt(out);
                    editor.feed(&data, out)
                })
                .await?;
            if let Some(outcome) = outcome {
                return Ok(outcome);
            }

            match self.input.recv().await {
                Some(TerminalInput::Data(bytes)) => data = bytes,
                Some(TerminalInput::Closed) | None => {
                    self.closed = true;
                    return Ok(ReadOutcome::EndOfInput);
                }
            }
        }
    }
}
