use std::collections::VecDeque;

use gimbal_core::channel::CHANNEL_COUNT;
use gimbal_core::packet::HEADER_SIZE;
use gimbal_core::report::{
    BASE_TIMESTAMP, PRODUCT_ID_REQUEST, PRODUCT_ID_RESPONSE, SET_FEATURE_COMMAND, SensorReportId,
};
use gimbal_core::{Channel, Packet};
use gimbal_link::Transport;
use rand::Rng;
use tracing::{debug, trace};

/// Fault injected by the simulated bus.
#[derive(Debug, thiserror::Error)]
#[error("injected bus fault")]
pub struct HubFault;

struct HubPacket {
    channel: u8,
    sequence: u8,
    payload: Vec<u8>,
}

/// A motion hub behind the bus interface, for exercising a session
/// without hardware.
///
/// The hub honors soft resets, answers the product id request and
/// streams synthesized readings for every enabled report. Reads behave
/// like the real part: every transaction restates a header, and the
/// continuation flag marks re-reads of a partially served packet.
pub struct SimulatedHub {
    fault_rate: f64,
    jitter: f32,
    queue: VecDeque<HubPacket>,
    /// Partially served packet and the cargo offset to resume at.
    cursor: Option<(HubPacket, usize)>,
    sequences: [u8; CHANNEL_COUNT],
    /// Enabled streams with their report interval in microseconds.
    enabled: Vec<(SensorReportId, u32)>,
    next_stream: usize,
    tick: u32,
    angle: f32,
}

impl SimulatedHub {
    pub fn new(fault_rate: f64, jitter: f32) -> Self {
        Self {
            fault_rate,
            jitter,
            queue: VecDeque::new(),
            cursor: None,
            sequences: [0; CHANNEL_COUNT],
            enabled: Vec::new(),
            next_stream: 0,
            tick: 0,
            angle: 0.0,
        }
    }

    fn stamp(&mut self, channel: Channel, payload: Vec<u8>) -> HubPacket {
        let index = channel as usize;
        let sequence = self.sequences[index];
        self.sequences[index] = sequence.wrapping_add(1);
        HubPacket {
            channel: channel as u8,
            sequence,
            payload,
        }
    }

    fn queue_packet(&mut self, channel: Channel, payload: Vec<u8>) {
        let packet = self.stamp(channel, payload);
        self.queue.push_back(packet);
    }

    fn reset(&mut self) {
        debug!("hub reset");
        self.queue.clear();
        self.cursor = None;
        self.enabled.clear();
        self.next_stream = 0;
        self.sequences = [0; CHANNEL_COUNT];
        self.queue_packet(Channel::Command, advertisement());
        self.queue_packet(Channel::Executable, vec![0x01]);
    }

    fn enable_stream(&mut self, payload: &[u8]) {
        if payload.len() < 9 {
            return;
        }
        let Ok(report_id) = SensorReportId::try_from(payload[1]) else {
            trace!(report_id = payload[1], "set-feature for an unknown report");
            return;
        };
        let interval_us = u32::from_le_bytes([payload[5], payload[6], payload[7], payload[8]]);
        debug!(report = ?report_id, interval_us, "stream enabled");

        if let Some(slot) = self.enabled.iter_mut().find(|(id, _)| *id == report_id) {
            slot.1 = interval_us;
        } else {
            self.enabled.push((report_id, interval_us));
        }
    }

    fn serve(&mut self, buf: &mut [u8]) {
        buf.fill(0);
        if buf.len() < HEADER_SIZE {
            return;
        }

        let (packet, offset, resumed) = match self.cursor.take() {
            Some((packet, offset)) => (packet, offset, true),
            None => match self.next_packet() {
                Some(packet) => (packet, 0, false),
                // an idle bus answers all zeroes
                None => return,
            },
        };

        let total = (packet.payload.len() + HEADER_SIZE) as u16;
        let length = if resumed { total | 0x8000 } else { total };
        buf[0] = length as u8;
        buf[1] = (length >> 8) as u8;
        buf[2] = packet.channel;
        buf[3] = packet.sequence;

        let room = buf.len() - HEADER_SIZE;
        if room == 0 {
            // header probe, the cargo is still owed
            self.cursor = Some((packet, offset));
            return;
        }

        let take = (packet.payload.len() - offset).min(room);
        buf[HEADER_SIZE..HEADER_SIZE + take]
            .copy_from_slice(&packet.payload[offset..offset + take]);
        if offset + take < packet.payload.len() {
            self.cursor = Some((packet, offset + take));
        }
    }

    fn next_packet(&mut self) -> Option<HubPacket> {
        if let Some(packet) = self.queue.pop_front() {
            return Some(packet);
        }
        self.synthesize()
    }

    /// Emits one report from the next enabled stream, cycling round-robin.
    fn synthesize(&mut self) -> Option<HubPacket> {
        if self.enabled.is_empty() {
            return None;
        }
        let (report_id, interval_us) = self.enabled[self.next_stream % self.enabled.len()];
        self.next_stream = self.next_stream.wrapping_add(1);
        self.tick = self.tick.wrapping_add(1);

        let payload = self.input_report(report_id, interval_us)?;
        Some(self.stamp(Channel::Reports, payload))
    }

    fn input_report(&mut self, report_id: SensorReportId, interval_us: u32) -> Option<Vec<u8>> {
        let mut payload = Vec::with_capacity(24);
        payload.push(BASE_TIMESTAMP);
        payload.extend_from_slice(&interval_us.to_le_bytes());
        payload.push(report_id as u8);
        payload.push(self.tick as u8);
        payload.push(0x03);
        payload.push(0x00);

        match report_id {
            SensorReportId::Accelerometer => {
                self.push_word(&mut payload, 0.0, 256.0);
                self.push_word(&mut payload, 0.0, 256.0);
                self.push_word(&mut payload, 9.80665, 256.0);
            }
            SensorReportId::LinearAcceleration => {
                self.push_word(&mut payload, 0.1, 256.0);
                self.push_word(&mut payload, 0.0, 256.0);
                self.push_word(&mut payload, 0.0, 256.0);
            }
            SensorReportId::Gyroscope => {
                self.push_word(&mut payload, 0.01, 512.0);
                self.push_word(&mut payload, 0.0, 512.0);
                self.push_word(&mut payload, 0.0, 512.0);
            }
            SensorReportId::MagneticField => {
                self.push_word(&mut payload, 22.0, 16.0);
                self.push_word(&mut payload, 5.0, 16.0);
                self.push_word(&mut payload, -43.0, 16.0);
            }
            SensorReportId::RotationVector => {
                self.push_quaternion(&mut payload);
                // roughly 0.02 rad of heading uncertainty
                push_i16(&mut payload, 328);
            }
            SensorReportId::GameRotationVector => {
                self.push_quaternion(&mut payload);
            }
            SensorReportId::StepCounter => {
                payload.extend_from_slice(&[0, 0, 0, 0]);
                let steps = (self.tick / 50) as u16;
                payload.extend_from_slice(&steps.to_le_bytes());
            }
            SensorReportId::StabilityClassifier => {
                payload.push(0x03);
                payload.push(0x00);
            }
            SensorReportId::PersonalActivityClassifier => {
                payload.push(0x00);
                payload.push(0x04);
                payload.extend_from_slice(&[2, 5, 8, 10, 80, 3, 1, 1, 0]);
            }
            _ => return None,
        }
        Some(payload)
    }

    fn push_word(&mut self, payload: &mut Vec<u8>, value: f32, scale: f32) {
        let mut rng = rand::rng();
        let spread = self.jitter.abs().max(f32::EPSILON);
        let noise = rng.random_range(-spread..=spread);
        push_i16(payload, (value * (1.0 + noise) * scale) as i16);
    }

    /// A slow rotation about the vertical axis.
    fn push_quaternion(&mut self, payload: &mut Vec<u8>) {
        self.angle += 0.02;
        let half = self.angle / 2.0;
        push_i16(payload, 0);
        push_i16(payload, 0);
        push_i16(payload, (half.sin() * 16384.0) as i16);
        push_i16(payload, (half.cos() * 16384.0) as i16);
    }
}

impl Transport for SimulatedHub {
    type Error = HubFault;

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        let Ok(packet) = Packet::from_bytes(bytes) else {
            trace!(len = bytes.len(), "discarding malformed host packet");
            return Ok(());
        };
        let payload = &packet.payload[..packet.header.payload_len()];

        if packet.header.channel == Channel::Executable as u8 {
            if payload.first() == Some(&0x01) {
                self.reset();
            }
        } else if packet.header.channel == Channel::Control as u8 {
            match payload.first() {
                Some(&SET_FEATURE_COMMAND) => self.enable_stream(payload),
                Some(&PRODUCT_ID_REQUEST) => self.queue_packet(Channel::Control, product_id()),
                _ => trace!("unhandled control request"),
            }
        }
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        let mut rng = rand::rng();
        if self.fault_rate > 0.0 && rng.random_bool(self.fault_rate.min(1.0)) {
            return Err(HubFault);
        }
        self.serve(buf);
        Ok(())
    }
}

fn push_i16(payload: &mut Vec<u8>, value: i16) {
    payload.extend_from_slice(&value.to_le_bytes());
}

/// Resembles the tag-length-value capability blob a hub advertises
/// after reset. Long enough to need chunked reads.
fn advertisement() -> Vec<u8> {
    let mut blob = vec![0x00, 0x01];
    blob.extend_from_slice(&[0x04, 0x00, 0x00, 0x00]);
    blob.extend_from_slice(b"SHTP");
    blob.extend_from_slice(&[0x02, 0x08]);
    blob.extend_from_slice(&[0x00; 36]);
    blob
}

fn product_id() -> Vec<u8> {
    let mut payload = vec![PRODUCT_ID_RESPONSE, 0x01, 0x03, 0x02];
    payload.extend_from_slice(&0x1234_5678_u32.to_le_bytes());
    payload.extend_from_slice(&42_u32.to_le_bytes());
    payload.extend_from_slice(&7_u16.to_le_bytes());
    payload.extend_from_slice(&[0, 0]);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use gimbal_link::{Poll, Session, SessionConfig, SessionPhase};

    #[test]
    fn session_opens_and_streams_against_the_hub() {
        let hub = SimulatedHub::new(0.0, 0.0);
        let mut session = Session::new(hub, SessionConfig::default());

        session.open().unwrap();
        assert_eq!(session.phase(), SessionPhase::Ready);

        session.enable_rotation_vector(10).unwrap();
        session.enable_step_counter(100).unwrap();

        let mut updates = 0;
        for _ in 0..32 {
            if let Poll::Updated(_) = session.poll().unwrap() {
                updates += 1;
            }
        }

        assert!(updates > 0);
        let reading = session.state().rotation_vector.expect("reading stored");
        assert!(reading.real > 0.9);
        assert!(session.state().steps.is_some());
    }

    #[test]
    fn reset_drops_enabled_streams() {
        let mut hub = SimulatedHub::new(0.0, 0.0);
        let mut session = Session::new(hub, SessionConfig::default());
        session.open().unwrap();
        session.enable_accelerometer(20).unwrap();

        assert_eq!(session.poll().unwrap(), Poll::Updated(gimbal_link::ReportKind::Accelerometer));

        hub = session.into_inner();
        assert_eq!(hub.enabled.len(), 1);
        hub.reset();
        assert!(hub.enabled.is_empty());
        assert!(!hub.queue.is_empty());
    }
}
