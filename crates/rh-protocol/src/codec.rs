//! Tokio codec for RCON packets

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::packet::{Packet, PacketType, MAX_PACKET_SIZE, MIN_PACKET_SIZE, SIZE_FIELD_LEN};

/// Codec for encoding/decoding RCON packets
#[derive(Debug, Default)]
pub struct RconCodec {
    /// Size field of the packet being decoded (if already read)
    pending_size: Option<usize>,
}

impl RconCodec {
    /// Create a new codec
    pub fn new() -> Self {
        Self { pending_size: None }
    }
}

impl Decoder for RconCodec {
    type Item = Packet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let size = match self.pending_size.take() {
            Some(size) => size,
            None => {
                if src.len() < SIZE_FIELD_LEN {
                    return Ok(None);
                }

                let raw = src.get_i32_le();
                if raw < MIN_PACKET_SIZE as i32 {
                    return Err(ProtocolError::InvalidSize(raw));
                }
                let size = raw as usize;
                if size > MAX_PACKET_SIZE {
                    return Err(ProtocolError::PacketTooLarge {
                        size,
                        max: MAX_PACKET_SIZE,
                    });
                }
                size
            }
        };

        if src.len() < size {
            src.reserve(size - src.len());
            self.pending_size = Some(size);
            return Ok(None);
        }

        let mut packet = src.split_to(size);
        let id = packet.get_i32_le();
        let kind = PacketType(packet.get_i32_le());

        // Body is terminated by one NUL and padded with another; some servers
        // are sloppy about the second one, so strip whatever trails.
        let mut body_len = packet.len();
        while body_len > 0 && packet[body_len - 1] == 0 {
            body_len -= 1;
        }
        packet.truncate(body_len);

        Ok(Some(Packet {
            id,
            kind,
            body: packet.freeze(),
        }))
    }
}

impl Encoder<Packet> for RconCodec {
    type Error = ProtocolError;

    fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let size = packet.wire_size();
        if size > MAX_PACKET_SIZE {
            return Err(ProtocolError::PacketTooLarge {
                size,
                max: MAX_PACKET_SIZE,
            });
        }

        dst.reserve(SIZE_FIELD_LEN + size);
        dst.put_i32_le(size as i32);
        dst.put_i32_le(packet.id);
        dst.put_i32_le(packet.kind.as_i32());
        dst.extend_from_slice(&packet.body);
        dst.put_u8(0);
        dst.put_u8(0);

        Ok(())
    }
}
