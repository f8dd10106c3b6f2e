//! RCON console link
//!
//! Dials a console over TCP, authenticates with its password and then
//! carries commands out and console output back. Reads and writes use
//! separate halves of the socket so the background reader never blocks an
//! operator's command.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use rh_core::config::ConnectionSpec;
use rh_core::traits::{ConsoleLink, Connector};
use rh_core::LinkError;
use rh_protocol::{Packet, PacketType, ProtocolError, RconCodec};

/// Time allowed for the TCP dial and for the auth exchange, each
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens [`RconLink`]s
#[derive(Debug, Clone)]
pub struct RconConnector {
    dial_timeout: Duration,
}

impl RconConnector {
    /// Create a connector with the default dial timeout
    pub fn new() -> Self {
        Self {
            dial_timeout: DIAL_TIMEOUT,
        }
    }

    /// Create a connector with a custom dial timeout
    pub fn with_dial_timeout(dial_timeout: Duration) -> Self {
        Self { dial_timeout }
    }
}

impl Default for RconConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for RconConnector {
    async fn open(&self, spec: &ConnectionSpec) -> Result<Arc<dyn ConsoleLink>, LinkError> {
        tracing::debug!("Dialing console {} at {}", spec.name, spec.address);
        let link = RconLink::connect(
            &spec.address,
            &spec.password,
            self.dial_timeout,
            spec.read_timeout,
        )
        .await?;
        Ok(Arc::new(link))
    }
}

/// An authenticated RCON connection
pub struct RconLink {
    /// Peer address reported by the socket
    remote_addr: String,
    /// Inbound packets; held by the background reader while it waits
    reader: Mutex<FramedRead<OwnedReadHalf, RconCodec>>,
    /// Outbound packets
    writer: Mutex<FramedWrite<OwnedWriteHalf, RconCodec>>,
    /// Next request id to send
    next_id: AtomicI32,
    /// Deadline for console output, if any
    read_timeout: Option<Duration>,
    /// Cancelled by `close` to unblock a pending read
    cancel: CancellationToken,
}

impl RconLink {
    /// Dial `address` and authenticate with `password`
    pub async fn connect(
        address: &str,
        password: &str,
        dial_timeout: Duration,
        read_timeout: Option<Duration>,
    ) -> Result<Self, LinkError> {
        let stream = match tokio::time::timeout(dial_timeout, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(LinkError::Dial {
                    address: address.to_string(),
                    source,
                })
            }
            Err(_) => return Err(LinkError::Timeout(dial_timeout)),
        };

        let remote_addr = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| address.to_string());
        let (read_half, write_half) = stream.into_split();

        let link = Self {
            remote_addr,
            reader: Mutex::new(FramedRead::new(read_half, RconCodec::new())),
            writer: Mutex::new(FramedWrite::new(write_half, RconCodec::new())),
            next_id: AtomicI32::new(1),
            read_timeout,
            cancel: CancellationToken::new(),
        };

        match tokio::time::timeout(dial_timeout, link.authenticate(password)).await {
            Ok(result) => result?,
            Err(_) => return Err(LinkError::Timeout(dial_timeout)),
        }

        tracing::info!("Authenticated with console at {}", link.remote_addr);
        Ok(link)
    }

    fn next_request_id(&self) -> i32 {
        // Never hand out the reserved -1
        self.next_id.fetch_add(1, Ordering::Relaxed) & i32::MAX
    }

    async fn authenticate(&self, password: &str) -> Result<(), LinkError> {
        let id = self.next_request_id();
        self.writer.lock().await.send(Packet::auth(id, password)).await?;

        let mut reader = self.reader.lock().await;
        loop {
            let packet = reader.next().await.ok_or(LinkError::RemoteClosed)??;
            if packet.is_auth_failure() {
                return Err(LinkError::AuthFailed);
            }

            match packet.kind {
                PacketType::AUTH_RESPONSE => return Ok(()),
                // Source servers send an empty value packet ahead of the auth response
                PacketType::RESPONSE_VALUE => continue,
                other => {
                    return Err(ProtocolError::UnexpectedPacket {
                        id: packet.id,
                        kind: other.as_i32(),
                    }
                    .into())
                }
            }
        }
    }

    async fn next_packet(
        reader: &mut FramedRead<OwnedReadHalf, RconCodec>,
        deadline: Option<Duration>,
    ) -> Result<Packet, LinkError> {
        let next = match deadline {
            Some(limit) => tokio::time::timeout(limit, reader.next())
                .await
                .map_err(|_| LinkError::Timeout(limit))?,
            None => reader.next().await,
        };

        match next {
            Some(packet) => Ok(packet?),
            None => Err(LinkError::RemoteClosed),
        }
    }
}

#[async_trait]
impl ConsoleLink for RconLink {
    async fn write(&self, command: &str) -> Result<(), LinkError> {
        if self.cancel.is_cancelled() {
            return Err(LinkError::Closed);
        }

        let packet = Packet::exec(self.next_request_id(), command);
        tracing::trace!("Sending request {} to {}", packet.id, self.remote_addr);
        self.writer.lock().await.send(packet).await?;
        Ok(())
    }

    async fn read(&self) -> Result<String, LinkError> {
        let mut reader = self.reader.lock().await;
        loop {
            let packet = tokio::select! {
                _ = self.cancel.cancelled() => return Err(LinkError::Closed),
                packet = Self::next_packet(&mut reader, self.read_timeout) => packet?,
            };

            if packet.kind == PacketType::RESPONSE_VALUE {
                return Ok(packet.body_text());
            }
            tracing::debug!(
                "Ignoring packet type {} from {}",
                packet.kind,
                self.remote_addr
            );
        }
    }

    async fn close(&self) -> Result<(), LinkError> {
        if self.cancel.is_cancelled() {
            return Ok(());
        }
        self.cancel.cancel();

        let mut writer = self.writer.lock().await;
        writer.close().await?;
        tracing::debug!("Closed console link to {}", self.remote_addr);
        Ok(())
    }

    fn remote_addr(&self) -> String {
        self.remote_addr.clone()
    }
}
