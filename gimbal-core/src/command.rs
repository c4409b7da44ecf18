use crate::report::{PRODUCT_ID_REQUEST, SET_FEATURE_COMMAND, SensorReportId};

/// Command id for the motion-engine calibration command family.
pub const ME_CALIBRATE: u8 = 0x07;

const SET_FEATURE_LEN: usize = 17;

/// A set-feature command that turns one sensor report stream on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureCommand {
    pub report_id: SensorReportId,
    pub interval_ms: u32,
    pub specific_config: u32,
}

impl FeatureCommand {
    pub fn new(report_id: SensorReportId, interval_ms: u32) -> Self {
        Self {
            report_id,
            interval_ms,
            specific_config: 0,
        }
    }

    pub fn with_config(report_id: SensorReportId, interval_ms: u32, specific_config: u32) -> Self {
        Self {
            report_id,
            interval_ms,
            specific_config,
        }
    }

    /// Encodes the command for the control channel. The hub takes the
    /// report interval in microseconds.
    pub fn to_bytes(&self) -> [u8; SET_FEATURE_LEN] {
        let interval_us = self.interval_ms.wrapping_mul(1000);

        let mut bytes = [0u8; SET_FEATURE_LEN];
        bytes[0] = SET_FEATURE_COMMAND;
        bytes[1] = self.report_id as u8;
        bytes[5..9].copy_from_slice(&interval_us.to_le_bytes());
        // batch interval stays zero, bytes 9..13
        bytes[13..17].copy_from_slice(&self.specific_config.to_le_bytes());
        bytes
    }
}

/// Payload of the soft reset request, sent on the executable channel.
pub fn soft_reset() -> [u8; 1] {
    [0x01]
}

/// Payload of the product id request, sent on the control channel.
pub fn product_id_request() -> [u8; 2] {
    [PRODUCT_ID_REQUEST, 0x00]
}
