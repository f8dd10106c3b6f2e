//! Protocol error types

use thiserror::Error;

/// Errors that can occur while encoding or decoding RCON packets
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Declared packet size is smaller than the fixed fields
    #[error("Invalid packet size: {0}")]
    InvalidSize(i32),

    /// Packet exceeds the maximum accepted size
    #[error("Packet too large: {size} bytes exceeds maximum of {max} bytes")]
    PacketTooLarge { size: usize, max: usize },

    /// Peer sent a packet type that is not valid at this point
    #[error("Unexpected packet type {kind} (id {id})")]
    UnexpectedPacket { id: i32, kind: i32 },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
