use crate::cursor::PayloadCursor;
use crate::error::{ParseResult, ProtocolError};

// control channel report ids
pub const COMMAND_RESPONSE: u8 = 0xF1;
pub const COMMAND_REQUEST: u8 = 0xF2;
pub const PRODUCT_ID_RESPONSE: u8 = 0xF8;
pub const PRODUCT_ID_REQUEST: u8 = 0xF9;
pub const BASE_TIMESTAMP: u8 = 0xFB;
pub const SET_FEATURE_COMMAND: u8 = 0xFD;

/// Streamable sensor reports addressed by the set-feature command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorReportId {
    Accelerometer = 0x01,
    Gyroscope = 0x02,
    MagneticField = 0x03,
    LinearAcceleration = 0x04,
    RotationVector = 0x05,
    Gravity = 0x06,
    GameRotationVector = 0x08,
    GeomagneticRotationVector = 0x09,
    TapDetector = 0x10,
    StepCounter = 0x11,
    StabilityClassifier = 0x13,
    PersonalActivityClassifier = 0x1E,
}

impl TryFrom<u8> for SensorReportId {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(SensorReportId::Accelerometer),
            0x02 => Ok(SensorReportId::Gyroscope),
            0x03 => Ok(SensorReportId::MagneticField),
            0x04 => Ok(SensorReportId::LinearAcceleration),
            0x05 => Ok(SensorReportId::RotationVector),
            0x06 => Ok(SensorReportId::Gravity),
            0x08 => Ok(SensorReportId::GameRotationVector),
            0x09 => Ok(SensorReportId::GeomagneticRotationVector),
            0x10 => Ok(SensorReportId::TapDetector),
            0x11 => Ok(SensorReportId::StepCounter),
            0x13 => Ok(SensorReportId::StabilityClassifier),
            0x1E => Ok(SensorReportId::PersonalActivityClassifier),
            _ => Err(ProtocolError::InvalidReportId(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawVector {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawQuaternion {
    pub i: i16,
    pub j: i16,
    pub k: i16,
    pub real: i16,
    pub radian_accuracy: i16,
}

/// Body of one input report, still in fixed-point wire units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportBody {
    Accelerometer(RawVector),
    Gyroscope(RawVector),
    MagneticField(RawVector),
    LinearAcceleration(RawVector),
    RotationVector(RawQuaternion),
    GameRotationVector(RawQuaternion),
    StepCounter { steps: u16 },
    Stability { class: u8 },
    Activity { most_likely: u8, confidence: [u8; 9] },
    /// A report id this decoder does not track. Kept so new hub firmware
    /// does not break older hosts.
    Unrecognized { report_id: u8 },
}

/// One decoded report from the report channel, prefixed by its base
/// timestamp block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputReport {
    /// Microseconds between the hub timebase and this batch.
    pub timestamp_delta_us: u32,
    pub report_id: u8,
    pub sequence: u8,
    /// Low two status bits, the accuracy classification.
    pub status: u8,
    pub delay: u8,
    pub body: ReportBody,
}

/// Parses an input report payload. The caller has already matched the
/// leading base timestamp marker.
pub fn parse_input_report(payload: &[u8]) -> ParseResult<InputReport> {
    // the body starts after the 5-byte timestamp block
    let body_len = payload.len().saturating_sub(5);

    let mut cursor = PayloadCursor::new(payload);
    cursor.skip(1)?; // base timestamp marker
    let timestamp_delta_us = cursor.read_u32()?;

    let report_id = cursor.read_u8()?;
    let sequence = cursor.read_u8()?;
    let status = cursor.read_u8()? & 0x03;
    let delay = cursor.read_u8()?;

    let body = match SensorReportId::try_from(report_id) {
        Ok(SensorReportId::Accelerometer) => {
            ReportBody::Accelerometer(read_vector(&mut cursor)?)
        }
        Ok(SensorReportId::Gyroscope) => ReportBody::Gyroscope(read_vector(&mut cursor)?),
        Ok(SensorReportId::MagneticField) => {
            ReportBody::MagneticField(read_vector(&mut cursor)?)
        }
        Ok(SensorReportId::LinearAcceleration) => {
            ReportBody::LinearAcceleration(read_vector(&mut cursor)?)
        }
        Ok(SensorReportId::RotationVector) => {
            ReportBody::RotationVector(read_quaternion(&mut cursor, body_len)?)
        }
        Ok(SensorReportId::GameRotationVector) => {
            ReportBody::GameRotationVector(read_quaternion(&mut cursor, body_len)?)
        }
        Ok(SensorReportId::StepCounter) => {
            // the count travels in the third data word
            cursor.skip(4)?;
            ReportBody::StepCounter {
                steps: cursor.read_u16()?,
            }
        }
        Ok(SensorReportId::StabilityClassifier) => ReportBody::Stability {
            class: cursor.read_u8()?,
        },
        Ok(SensorReportId::PersonalActivityClassifier) => {
            cursor.skip(1)?; // page number
            let most_likely = cursor.read_u8()?;
            let mut confidence = [0u8; 9];
            for slot in &mut confidence {
                *slot = cursor.read_u8()?;
            }
            ReportBody::Activity {
                most_likely,
                confidence,
            }
        }
        Ok(SensorReportId::Gravity)
        | Ok(SensorReportId::GeomagneticRotationVector)
        | Ok(SensorReportId::TapDetector)
        | Err(_) => ReportBody::Unrecognized { report_id },
    };

    Ok(InputReport {
        timestamp_delta_us,
        report_id,
        sequence,
        status,
        delay,
        body,
    })
}

fn read_vector(cursor: &mut PayloadCursor<'_>) -> ParseResult<RawVector> {
    Ok(RawVector {
        x: cursor.read_i16()?,
        y: cursor.read_i16()?,
        z: cursor.read_i16()?,
    })
}

fn read_quaternion(cursor: &mut PayloadCursor<'_>, body_len: usize) -> ParseResult<RawQuaternion> {
    let i = cursor.read_i16()?;
    let j = cursor.read_i16()?;
    let k = cursor.read_i16()?;

    // the real and radian-accuracy words only travel in the longer variants
    let has_quaternion_real = body_len > 9;
    let has_radian_accuracy = body_len > 11;

    let real = if has_quaternion_real {
        cursor.read_i16_or_zero()
    } else {
        0
    };
    let radian_accuracy = if has_radian_accuracy {
        cursor.read_i16_or_zero()
    } else {
        0
    };

    Ok(RawQuaternion {
        i,
        j,
        k,
        real,
        radian_accuracy,
    })
}

/// Decoded control-channel response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlResponse {
    /// Product id report, the handshake acknowledgement.
    ProductId,
    /// Command response carrying the command id and its first result byte.
    Command { command: u8, r0: u8 },
    Unrecognized { report_id: u8 },
}

pub fn parse_control_response(payload: &[u8]) -> ParseResult<ControlResponse> {
    let mut cursor = PayloadCursor::new(payload);
    let report_id = cursor.read_u8()?;

    match report_id {
        PRODUCT_ID_RESPONSE => Ok(ControlResponse::ProductId),
        COMMAND_RESPONSE => {
            cursor.skip(1)?; // report sequence
            let command = cursor.read_u8()?;
            cursor.skip(2)?; // command sequence, response sequence
            let r0 = cursor.read_u8()?;
            Ok(ControlResponse::Command { command, r0 })
        }
        _ => Ok(ControlResponse::Unrecognized { report_id }),
    }
}
