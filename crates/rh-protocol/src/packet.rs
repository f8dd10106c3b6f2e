//! RCON packet layout
//!
//! Every packet is framed as:
//! - size: 4 bytes (i32, little-endian), counts the bytes that follow
//! - id: 4 bytes (i32, little-endian), echoed back by the server
//! - type: 4 bytes (i32, little-endian)
//! - body: NUL-terminated ASCII/UTF-8 text
//! - padding: one more NUL byte

use bytes::Bytes;
use std::fmt;

/// Bytes occupied by the leading size field
pub const SIZE_FIELD_LEN: usize = 4;

/// Smallest legal value of the size field (id + type + two terminators)
pub const MIN_PACKET_SIZE: usize = 10;

/// Largest size field accepted from a peer.
///
/// Servers advertise 4096 byte bodies but several of them split long
/// responses less strictly than that, so leave some headroom.
pub const MAX_PACKET_SIZE: usize = 16 * 1024;

/// Request id the server answers with when the password is wrong
pub const AUTH_FAILED_ID: i32 = -1;

/// RCON packet type.
///
/// The numeric values are direction dependent: `2` is a command when sent
/// by the client and an auth response when sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketType(pub i32);

impl PacketType {
    /// Server to client: command output
    pub const RESPONSE_VALUE: PacketType = PacketType(0);
    /// Client to server: execute a command
    pub const EXEC_COMMAND: PacketType = PacketType(2);
    /// Server to client: result of an auth request
    pub const AUTH_RESPONSE: PacketType = PacketType(2);
    /// Client to server: authenticate with the console password
    pub const AUTH: PacketType = PacketType(3);

    /// Get the raw type value
    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single RCON packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Client chosen request id
    pub id: i32,
    /// Packet type
    pub kind: PacketType,
    /// Body without the trailing terminators
    pub body: Bytes,
}

impl Packet {
    /// Create a new packet
    pub fn new(id: i32, kind: PacketType, body: impl Into<Bytes>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    /// Authentication request carrying the console password
    pub fn auth(id: i32, password: &str) -> Self {
        Self::new(id, PacketType::AUTH, Bytes::copy_from_slice(password.as_bytes()))
    }

    /// Command execution request
    pub fn exec(id: i32, command: &str) -> Self {
        Self::new(
            id,
            PacketType::EXEC_COMMAND,
            Bytes::copy_from_slice(command.as_bytes()),
        )
    }

    /// Value of the size field for this packet
    pub fn wire_size(&self) -> usize {
        self.body.len() + MIN_PACKET_SIZE
    }

    /// Body decoded as text, replacing invalid UTF-8
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Whether this is the server's "wrong password" answer
    pub fn is_auth_failure(&self) -> bool {
        self.kind == PacketType::AUTH_RESPONSE && self.id == AUTH_FAILED_ID
    }
}
