use crate::error::ProtocolError;

pub const CHANNEL_COUNT: usize = 6;

/// Logical SHTP channels multiplexed over the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Command = 0,
    Executable = 1,
    Control = 2,
    Reports = 3,
    WakeReports = 4,
    GyroRotationVector = 5,
}

impl TryFrom<u8> for Channel {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Channel::Command),
            1 => Ok(Channel::Executable),
            2 => Ok(Channel::Control),
            3 => Ok(Channel::Reports),
            4 => Ok(Channel::WakeReports),
            5 => Ok(Channel::GyroRotationVector),
            _ => Err(ProtocolError::InvalidChannel(value)),
        }
    }
}

/// Outbound sequence counters, one per channel.
///
/// Counters advance once per transmitted packet and wrap modulo 256.
/// Inbound sequence numbers are never checked against these.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceNumbers {
    counters: [u8; CHANNEL_COUNT],
}

impl SequenceNumbers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sequence number for the next packet on `channel` and
    /// advances the counter.
    pub fn next(&mut self, channel: Channel) -> u8 {
        let counter = &mut self.counters[channel as usize];
        let value = *counter;
        *counter = counter.wrapping_add(1);
        value
    }

    pub fn peek(&self, channel: Channel) -> u8 {
        self.counters[channel as usize]
    }

    /// Clears every counter, mirroring the hub side after a soft reset.
    pub fn reset(&mut self) {
        self.counters = [0; CHANNEL_COUNT];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_round_trip() {
        for raw in 0u8..6 {
            let channel = Channel::try_from(raw).unwrap();
            assert_eq!(channel as u8, raw);
        }
        assert_eq!(
            Channel::try_from(6),
            Err(ProtocolError::InvalidChannel(6))
        );
    }

    #[test]
    fn counters_are_independent() {
        let mut seq = SequenceNumbers::new();
        assert_eq!(seq.next(Channel::Control), 0);
        assert_eq!(seq.next(Channel::Control), 1);
        assert_eq!(seq.next(Channel::Executable), 0);
        assert_eq!(seq.peek(Channel::Control), 2);
        assert_eq!(seq.peek(Channel::Reports), 0);
    }

    #[test]
    fn counter_wraps_modulo_256() {
        let mut seq = SequenceNumbers::new();
        for _ in 0..255 {
            seq.next(Channel::Reports);
        }
        assert_eq!(seq.next(Channel::Reports), 255);
        assert_eq!(seq.next(Channel::Reports), 0);
    }

    #[test]
    fn reset_clears_all_counters() {
        let mut seq = SequenceNumbers::new();
        seq.next(Channel::Control);
        seq.next(Channel::Executable);
        seq.reset();
        assert_eq!(seq.peek(Channel::Control), 0);
        assert_eq!(seq.peek(Channel::Executable), 0);
    }
}
