//! rh-protocol: RCON wire protocol for rcon-hub
//!
//! This crate defines the packet format spoken by Source-style remote
//! consoles (Minecraft, Source engine games, Factorio, ...) and a tokio
//! codec for reading and writing it over a TCP stream.

pub mod codec;
pub mod error;
pub mod packet;

pub use codec::RconCodec;
pub use error::ProtocolError;
pub use packet::{Packet, PacketType, AUTH_FAILED_ID, MAX_PACKET_SIZE, MIN_PACKET_SIZE};
