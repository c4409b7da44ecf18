use crate::channel::Channel;
use crate::error::{ParseResult, ProtocolError};

// wire layout : length LSB, length MSB, channel, sequence, then cargo

pub const HEADER_SIZE: usize = 4;
pub const MAX_PAYLOAD_SIZE: usize = 128;
pub const MAX_WIRE_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE;

/// Bit 15 of the length word marks the continuation of an earlier transfer.
pub const CONTINUATION_FLAG: u16 = 0x8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Total packet length in bytes, header included, continuation bit masked.
    pub length: u16,
    /// Raw channel byte. Unknown values are kept so callers can still see
    /// that data arrived.
    pub channel: u8,
    pub sequence: u8,
    pub continuation: bool,
}

impl PacketHeader {
    pub fn new(channel: Channel, sequence: u8, payload_len: usize) -> Self {
        debug_assert!(
            payload_len <= MAX_PAYLOAD_SIZE,
            "payload exceeds the packet buffer"
        );
        Self {
            length: (payload_len + HEADER_SIZE) as u16,
            channel: channel as u8,
            sequence,
            continuation: false,
        }
    }

    pub fn from_array(bytes: [u8; HEADER_SIZE]) -> Self {
        let raw = u16::from_le_bytes([bytes[0], bytes[1]]);
        Self {
            length: raw & !CONTINUATION_FLAG,
            channel: bytes[2],
            sequence: bytes[3],
            continuation: raw & CONTINUATION_FLAG != 0,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> ParseResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(ProtocolError::InsufficientData {
                needed: HEADER_SIZE,
                available: bytes.len(),
            });
        }

        Ok(Self::from_array([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut raw = self.length & !CONTINUATION_FLAG;
        if self.continuation {
            raw |= CONTINUATION_FLAG;
        }

        let len_le = raw.to_le_bytes();
        [len_le[0], len_le[1], self.channel, self.sequence]
    }

    pub fn payload_len(&self) -> usize {
        (self.length as usize).saturating_sub(HEADER_SIZE)
    }

    /// A zero or header-only length means the hub had nothing queued.
    pub fn is_empty(&self) -> bool {
        self.length as usize <= HEADER_SIZE
    }
}

/// An outbound packet with its cargo in a fixed buffer.
pub struct Packet {
    pub header: PacketHeader,
    pub payload: [u8; MAX_PAYLOAD_SIZE],
}

impl Packet {
    pub fn new(channel: Channel, sequence: u8, payload: &[u8]) -> ParseResult<Self> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        buf[..payload.len()].copy_from_slice(payload);

        Ok(Self {
            header: PacketHeader::new(channel, sequence, payload.len()),
            payload: buf,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> ParseResult<Self> {
        let header = PacketHeader::from_bytes(bytes)?;

        let total_len = header.length as usize;
        if bytes.len() < total_len {
            return Err(ProtocolError::InsufficientData {
                needed: total_len,
                available: bytes.len(),
            });
        }

        let payload_len = header.payload_len();
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut payload = [0u8; MAX_PAYLOAD_SIZE];
        payload[..payload_len].copy_from_slice(&bytes[HEADER_SIZE..HEADER_SIZE + payload_len]);

        Ok(Self { header, payload })
    }

    pub fn wire_len(&self) -> usize {
        self.header.length as usize
    }

    pub fn to_bytes(&self) -> [u8; MAX_WIRE_SIZE] {
        let mut bytes = [0u8; MAX_WIRE_SIZE];

        let header_bytes = self.header.to_bytes();
        bytes[..HEADER_SIZE].copy_from_slice(&header_bytes);

        let payload_len = self.header.payload_len();
        bytes[HEADER_SIZE..HEADER_SIZE + payload_len]
            .copy_from_slice(&self.payload[..payload_len]);

        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let header = PacketHeader::new(Channel::Control, 7, 17);
        let bytes = header.to_bytes();
        assert_eq!(bytes, [21, 0, 2, 7]);

        let parsed = PacketHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.payload_len(), 17);
        assert!(!parsed.is_empty());
    }

    #[test]
    fn header_accepts_a_full_payload() {
        let header = PacketHeader::new(Channel::Reports, 0, MAX_PAYLOAD_SIZE);
        assert_eq!(header.length as usize, MAX_WIRE_SIZE);
        assert_eq!(header.payload_len(), MAX_PAYLOAD_SIZE);
    }

    #[test]
    #[should_panic(expected = "exceeds the packet buffer")]
    fn header_refuses_an_oversized_payload() {
        let _ = PacketHeader::new(Channel::Reports, 0, MAX_PAYLOAD_SIZE + 1);
    }

    #[test]
    fn continuation_bit_is_masked_but_remembered() {
        // 0x8014 = continuation of a 20-byte packet
        let parsed = PacketHeader::from_array([0x14, 0x80, 3, 9]);
        assert_eq!(parsed.length, 20);
        assert!(parsed.continuation);
        assert_eq!(parsed.payload_len(), 16);
    }

    #[test]
    fn zero_and_header_only_lengths_are_empty() {
        assert!(PacketHeader::from_array([0, 0, 0, 0]).is_empty());
        assert!(PacketHeader::from_array([4, 0, 2, 1]).is_empty());
        assert!(!PacketHeader::from_array([5, 0, 2, 1]).is_empty());
    }

    #[test]
    fn short_header_is_rejected() {
        assert_eq!(
            PacketHeader::from_bytes(&[1, 2]),
            Err(ProtocolError::InsufficientData {
                needed: HEADER_SIZE,
                available: 2,
            })
        );
    }

    #[test]
    fn packet_round_trip() {
        let packet = Packet::new(Channel::Executable, 3, &[0x01]).unwrap();
        assert_eq!(packet.wire_len(), 5);

        let bytes = packet.to_bytes();
        assert_eq!(&bytes[..5], &[5, 0, 1, 3, 1]);

        let parsed = Packet::from_bytes(&bytes[..5]).unwrap();
        assert_eq!(parsed.header, packet.header);
        assert_eq!(parsed.payload[..1], packet.payload[..1]);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let cargo = [0u8; MAX_PAYLOAD_SIZE + 1];
        let err = Packet::new(Channel::Reports, 0, &cargo).map(|_| ()).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::PayloadTooLarge {
                size: MAX_PAYLOAD_SIZE + 1,
                max: MAX_PAYLOAD_SIZE,
            }
        );
    }
}
