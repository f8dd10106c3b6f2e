//! Test doubles for links, sinks and terminals

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use rh_core::config::ConnectionSpec;
use rh_core::traits::{ConsoleLink, Connector, OutputSink};
use rh_core::{LinkError, ShellError};

use crate::shell::Terminal;

/// Poll `condition` until it holds, failing the test after two seconds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 2s");
}

/// Terminal that records every write
#[derive(Default)]
pub struct RecordingTerminal {
    writes: Mutex<Vec<Vec<u8>>>,
    exit_status: Mutex<Option<u32>>,
    fail: AtomicBool,
}

impl RecordingTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.writes.lock().concat()).into_owned()
    }

    pub fn exit_status(&self) -> Option<u32> {
        *self.exit_status.lock()
    }

    pub fn fail_writes(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Terminal for RecordingTerminal {
    async fn write(&self, bytes: &[u8]) -> Result<(), ShellError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ShellError::Closed);
        }
        self.writes.lock().push(bytes.to_vec());
        Ok(())
    }

    async fn exit(&self, status: u32) -> Result<(), ShellError> {
        *self.exit_status.lock() = Some(status);
        Ok(())
    }
}

/// Output sink that records lines, prompt changes and bells
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
    prompt: Mutex<String>,
    bells: AtomicUsize,
    refreshes: AtomicUsize,
    fail: AtomicBool,
    /// Prompt whose update is held back, and for how long
    slow_prompt: Mutex<Option<(String, Duration)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }

    pub fn prompt(&self) -> String {
        self.prompt.lock().clone()
    }

    pub fn bells(&self) -> usize {
        self.bells.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Make every update to `prompt` take `delay` before it lands
    pub fn slow_prompt(&self, prompt: &str, delay: Duration) {
        *self.slow_prompt.lock() = Some((prompt.to_string(), delay));
    }

    fn check(&self) -> Result<(), ShellError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(ShellError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl OutputSink for RecordingSink {
    async fn output_line(&self, line: &str) -> Result<(), ShellError> {
        self.check()?;
        self.lines.lock().push(line.to_string());
        Ok(())
    }

    async fn output_burst(&self, lines: &[String]) -> Result<(), ShellError> {
        self.check()?;
        self.lines.lock().extend(lines.iter().cloned());
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_prompt(&self, prompt: &str) -> Result<(), ShellError> {
        self.check()?;
        let delay = match &*self.slow_prompt.lock() {
            Some((slow, delay)) if slow == prompt => Some(*delay),
            _ => None,
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        *self.prompt.lock() = prompt.to_string();
        Ok(())
    }

    async fn bell(&self) -> Result<(), ShellError> {
        self.check()?;
        self.bells.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn refresh(&self) -> Result<(), ShellError> {
        self.check()?;
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Scripted console link
pub struct MockLink {
    name: String,
    writes: Mutex<Vec<String>>,
    responses_tx: mpsc::UnboundedSender<Result<String, LinkError>>,
    responses_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<String, LinkError>>>,
    cancel: CancellationToken,
    close_calls: AtomicUsize,
    fail_writes: AtomicBool,
    fail_close: AtomicBool,
}

impl MockLink {
    pub fn new(name: &str) -> Self {
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        Self {
            name: name.to_string(),
            writes: Mutex::new(Vec::new()),
            responses_tx,
            responses_rx: tokio::sync::Mutex::new(responses_rx),
            cancel: CancellationToken::new(),
            close_calls: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
        }
    }

    /// Queue console output for the next `read`
    pub fn respond(&self, text: &str) {
        let _ = self.responses_tx.send(Ok(text.to_string()));
    }

    /// Make the next `read` fail
    pub fn fail_read(&self, err: LinkError) {
        let _ = self.responses_tx.send(Err(err));
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsoleLink for MockLink {
    async fn write(&self, command: &str) -> Result<(), LinkError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LinkError::RemoteClosed);
        }
        if self.cancel.is_cancelled() {
            return Err(LinkError::Closed);
        }
        self.writes.lock().push(command.to_string());
        Ok(())
    }

    async fn read(&self) -> Result<String, LinkError> {
        let mut responses = self.responses_rx.lock().await;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(LinkError::Closed),
            next = responses.recv() => next.unwrap_or(Err(LinkError::RemoteClosed)),
        }
    }

    async fn close(&self) -> Result<(), LinkError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(LinkError::Timeout(Duration::from_secs(1)));
        }
        Ok(())
    }

    fn remote_addr(&self) -> String {
        format!("{}.test:25575", self.name)
    }
}

/// Connector handing out [`MockLink`]s
#[derive(Default)]
pub struct MockConnector {
    opened: Mutex<Vec<(String, Arc<MockLink>)>>,
    refused: Mutex<HashSet<String>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make opening `name` fail with a dial error
    pub fn refuse(&self, name: &str) {
        self.refused.lock().insert(name.to_string());
    }

    /// Most recently opened link for `name`
    pub fn link(&self, name: &str) -> Arc<MockLink> {
        self.opened
            .lock()
            .iter()
            .rev()
            .find(|(opened, _)| opened == name)
            .map(|(_, link)| Arc::clone(link))
            .unwrap_or_else(|| panic!("no link opened for {}", name))
    }

    pub fn opened_count(&self) -> usize {
        self.opened.lock().len()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, spec: &ConnectionSpec) -> Result<Arc<dyn ConsoleLink>, LinkError> {
        if self.refused.lock().contains(&spec.name) {
            return Err(LinkError::Dial {
                address: spec.address.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ),
            });
        }
        let link = Arc::new(MockLink::new(&spec.name));
        self.opened
            .lock()
            .push((spec.name.clone(), Arc::clone(&link)));
        Ok(link)
    }
}
