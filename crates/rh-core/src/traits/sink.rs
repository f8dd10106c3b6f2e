//! Terminal output trait

use async_trait::async_trait;

use crate::error::ShellError;

/// Line-oriented terminal the operator is looking at
///
/// Implementations serialize concurrent callers; every method call is
/// written to the terminal as one uninterrupted unit.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Print one line above the prompt
    async fn output_line(&self, line: &str) -> Result<(), ShellError>;

    /// Print several lines and redraw the prompt, without interleaving
    async fn output_burst(&self, lines: &[String]) -> Result<(), ShellError>;

    /// Replace the prompt shown in front of the input line
    async fn set_prompt(&self, prompt: &str) -> Result<(), ShellError>;

    /// Ring the terminal bell
    async fn bell(&self) -> Result<(), ShellError>;

    /// Redraw the prompt and any partially typed input
    async fn refresh(&self) -> Result<(), ShellError>;
}
