//! Packet framing over a transaction-oriented bus.
//!
//! The hub prefixes every read transaction with a fresh 4-byte header,
//! so pulling one packet means probing for its header first and then
//! re-reading the cargo in transaction-sized chunks, dropping the
//! repeated header at the front of each chunk.

use gimbal_core::Packet;
use gimbal_core::packet::{HEADER_SIZE, MAX_PAYLOAD_SIZE, MAX_WIRE_SIZE, PacketHeader};

use crate::error::SessionError;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Inbound {
    /// The hub had nothing to say.
    Empty,
    Packet(InboundPacket),
}

/// One received packet. The cargo itself lands in the caller's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InboundPacket {
    pub channel: u8,
    pub sequence: u8,
    /// Cargo bytes retained in the buffer. Less than the advertised
    /// length when the packet overflowed it.
    pub payload_len: usize,
    pub overflow: bool,
    pub continuation: bool,
}

pub(crate) fn read_packet<T: Transport>(
    bus: &mut T,
    transaction_limit: usize,
    payload: &mut [u8; MAX_PAYLOAD_SIZE],
) -> Result<Inbound, SessionError<T::Error>> {
    let mut probe = [0u8; HEADER_SIZE];
    bus.read_exact(&mut probe).map_err(SessionError::Bus)?;

    let header = PacketHeader::from_array(probe);
    if header.is_empty() {
        return Ok(Inbound::Empty);
    }

    let mut chunk = [0u8; MAX_WIRE_SIZE];
    // a transaction must carry at least one cargo byte past its header
    let limit = transaction_limit.clamp(HEADER_SIZE + 1, chunk.len());

    let mut remaining = header.payload_len();
    let mut stored = 0usize;
    let mut overflow = false;

    while remaining > 0 {
        let take = remaining.min(limit - HEADER_SIZE);
        let transaction = &mut chunk[..HEADER_SIZE + take];
        bus.read_exact(transaction)
            .map_err(|source| SessionError::Truncated {
                expected: remaining,
                source,
            })?;

        // every chunk restates a header; only the bytes after it are cargo
        let keep = take.min(MAX_PAYLOAD_SIZE - stored);
        payload[stored..stored + keep].copy_from_slice(&chunk[HEADER_SIZE..HEADER_SIZE + keep]);
        stored += keep;
        if keep < take {
            overflow = true;
        }
        remaining -= take;
    }

    Ok(Inbound::Packet(InboundPacket {
        channel: header.channel,
        sequence: header.sequence,
        payload_len: stored,
        overflow,
        continuation: header.continuation,
    }))
}

pub(crate) fn write_packet<T: Transport>(
    bus: &mut T,
    packet: &Packet,
) -> Result<(), SessionError<T::Error>> {
    let wire = packet.to_bytes();
    bus.write(&wire[..packet.wire_len()])
        .map_err(SessionError::Bus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Plays back scripted read transactions; `None` injects a fault.
    struct ScriptBus {
        reads: VecDeque<Option<Vec<u8>>>,
        sizes: Vec<usize>,
        fail_writes: bool,
    }

    impl ScriptBus {
        fn new(reads: Vec<Option<Vec<u8>>>) -> Self {
            Self {
                reads: reads.into(),
                sizes: Vec::new(),
                fail_writes: false,
            }
        }
    }

    impl Transport for ScriptBus {
        type Error = std::io::Error;

        fn write(&mut self, _bytes: &[u8]) -> Result<(), Self::Error> {
            if self.fail_writes {
                return Err(std::io::Error::other("injected bus fault"));
            }
            Ok(())
        }

        fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
            self.sizes.push(buf.len());
            match self.reads.pop_front() {
                Some(Some(step)) => {
                    assert_eq!(step.len(), buf.len(), "script step does not match read size");
                    buf.copy_from_slice(&step);
                    Ok(())
                }
                Some(None) => Err(std::io::Error::other("injected bus fault")),
                None => panic!("script exhausted"),
            }
        }
    }

    fn header(total: u16, channel: u8, sequence: u8) -> Vec<u8> {
        vec![total as u8, (total >> 8) as u8, channel, sequence]
    }

    /// Scripts the hub side of one packet delivery under `limit`.
    fn delivery(channel: u8, sequence: u8, cargo: &[u8], limit: usize) -> Vec<Option<Vec<u8>>> {
        let total = (cargo.len() + HEADER_SIZE) as u16;
        let mut steps = vec![Some(header(total, channel, sequence))];

        let mut offset = 0;
        while offset < cargo.len() {
            let take = (cargo.len() - offset).min(limit - HEADER_SIZE);
            let mut chunk = header(total | 0x8000, channel, sequence);
            chunk.extend_from_slice(&cargo[offset..offset + take]);
            steps.push(Some(chunk));
            offset += take;
        }
        steps
    }

    #[test]
    fn header_only_lengths_are_quiet() {
        for total in [0u16, HEADER_SIZE as u16] {
            let mut bus = ScriptBus::new(vec![Some(header(total, 2, 0))]);
            let mut payload = [0u8; MAX_PAYLOAD_SIZE];
            let inbound = read_packet(&mut bus, 32, &mut payload).unwrap();
            assert_eq!(inbound, Inbound::Empty);
            assert_eq!(bus.sizes, vec![HEADER_SIZE]);
        }
    }

    #[test]
    fn short_packet_takes_one_chunk() {
        let cargo: Vec<u8> = (0..10).collect();
        let mut bus = ScriptBus::new(delivery(3, 7, &cargo, 32));
        let mut payload = [0u8; MAX_PAYLOAD_SIZE];

        let inbound = read_packet(&mut bus, 32, &mut payload).unwrap();

        assert_eq!(
            inbound,
            Inbound::Packet(InboundPacket {
                channel: 3,
                sequence: 7,
                payload_len: 10,
                overflow: false,
                continuation: false,
            })
        );
        assert_eq!(&payload[..10], &cargo[..]);
        assert_eq!(bus.sizes, vec![4, 14]);
    }

    #[test]
    fn long_packet_is_reassembled_across_chunks() {
        let cargo: Vec<u8> = (0..60).collect();
        let mut bus = ScriptBus::new(delivery(3, 1, &cargo, 32));
        let mut payload = [0u8; MAX_PAYLOAD_SIZE];

        let inbound = read_packet(&mut bus, 32, &mut payload).unwrap();

        match inbound {
            Inbound::Packet(packet) => {
                assert_eq!(packet.payload_len, 60);
                assert!(!packet.overflow);
            }
            other => panic!("expected a packet, got {other:?}"),
        }
        assert_eq!(&payload[..60], &cargo[..]);
        assert_eq!(bus.sizes, vec![4, 32, 32, 8]);
    }

    #[test]
    fn oversized_cargo_is_drained_and_flagged() {
        let cargo: Vec<u8> = (0..140).map(|n| n as u8).collect();
        let mut bus = ScriptBus::new(delivery(3, 0, &cargo, 32));
        let mut payload = [0u8; MAX_PAYLOAD_SIZE];

        let inbound = read_packet(&mut bus, 32, &mut payload).unwrap();

        match inbound {
            Inbound::Packet(packet) => {
                assert_eq!(packet.payload_len, MAX_PAYLOAD_SIZE);
                assert!(packet.overflow);
            }
            other => panic!("expected a packet, got {other:?}"),
        }
        // the bus was drained to the end of the advertised length
        assert_eq!(bus.sizes, vec![4, 32, 32, 32, 32, 32]);
        assert_eq!(&payload[..], &cargo[..MAX_PAYLOAD_SIZE]);
    }

    #[test]
    fn continuation_flag_is_recorded_from_the_probe() {
        let cargo = [0xAB; 6];
        let total = (cargo.len() + HEADER_SIZE) as u16;
        let mut steps = delivery(4, 9, &cargo, 32);
        steps[0] = Some(header(total | 0x8000, 4, 9));
        let mut bus = ScriptBus::new(steps);
        let mut payload = [0u8; MAX_PAYLOAD_SIZE];

        let inbound = read_packet(&mut bus, 32, &mut payload).unwrap();

        match inbound {
            Inbound::Packet(packet) => {
                assert!(packet.continuation);
                assert_eq!(packet.payload_len, 6);
            }
            other => panic!("expected a packet, got {other:?}"),
        }
    }

    #[test]
    fn probe_fault_is_a_bus_error() {
        let mut bus = ScriptBus::new(vec![None]);
        let mut payload = [0u8; MAX_PAYLOAD_SIZE];
        let err = read_packet(&mut bus, 32, &mut payload).unwrap_err();
        assert!(matches!(err, SessionError::Bus(_)));
    }

    #[test]
    fn write_fault_is_a_bus_error() {
        let mut bus = ScriptBus::new(Vec::new());
        bus.fail_writes = true;
        let packet = Packet::new(gimbal_core::Channel::Executable, 0, &[0x01]).unwrap();

        let err = write_packet(&mut bus, &packet).unwrap_err();
        assert!(matches!(err, SessionError::Bus(_)));
    }

    #[test]
    fn chunk_fault_reports_outstanding_cargo() {
        let mut bus = ScriptBus::new(vec![Some(header(14, 3, 0)), None]);
        let mut payload = [0u8; MAX_PAYLOAD_SIZE];

        match read_packet(&mut bus, 32, &mut payload) {
            Err(SessionError::Truncated { expected, .. }) => assert_eq!(expected, 10),
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn tiny_transaction_limits_are_widened() {
        // limit below one cargo byte per chunk would never progress
        let cargo = [1, 2, 3];
        let mut bus = ScriptBus::new(delivery(2, 0, &cargo, HEADER_SIZE + 1));
        let mut payload = [0u8; MAX_PAYLOAD_SIZE];

        let inbound = read_packet(&mut bus, 2, &mut payload).unwrap();

        match inbound {
            Inbound::Packet(packet) => assert_eq!(packet.payload_len, 3),
            other => panic!("expected a packet, got {other:?}"),
        }
        assert_eq!(bus.sizes, vec![4, 5, 5, 5]);
    }
}
