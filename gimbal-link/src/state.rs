use gimbal_core::qpoint::{QPoints, q_to_f32};
use gimbal_core::report::{InputReport, RawQuaternion, RawVector, ReportBody};

/// Accuracy classification carried in the low status bits of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    Unreliable,
    Low,
    Medium,
    High,
}

impl Accuracy {
    pub(crate) fn from_status(status: u8) -> Self {
        match status & 0x03 {
            0 => Accuracy::Unreliable,
            1 => Accuracy::Low,
            2 => Accuracy::Medium,
            _ => Accuracy::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorReading {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub accuracy: Accuracy,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuaternionReading {
    pub i: f32,
    pub j: f32,
    pub k: f32,
    pub real: f32,
    /// Estimated heading error in radians. Zero when the hub omits it.
    pub radian_accuracy: f32,
    pub accuracy: Accuracy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityReading {
    pub most_likely: u8,
    pub confidence: [u8; 9],
}

/// Which reading a poll refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Accelerometer,
    Gyroscope,
    MagneticField,
    LinearAcceleration,
    RotationVector,
    GameRotationVector,
    StepCounter,
    Stability,
    Activity,
    CalibrationStatus,
}

/// Latest decoded readings, one slot per report family.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub accelerometer: Option<VectorReading>,
    pub linear_acceleration: Option<VectorReading>,
    pub gyroscope: Option<VectorReading>,
    pub magnetic_field: Option<VectorReading>,
    pub rotation_vector: Option<QuaternionReading>,
    pub game_rotation_vector: Option<QuaternionReading>,
    pub steps: Option<u16>,
    pub stability: Option<u8>,
    pub activity: Option<ActivityReading>,
    pub calibration_status: Option<u8>,
    /// Microsecond offset of the latest report batch against the hub
    /// timebase.
    pub timestamp_delta_us: u32,
}

impl SessionState {
    /// Folds one input report into the state. The base timestamp updates
    /// even when the report body is unrecognized.
    pub(crate) fn apply_input(&mut self, report: &InputReport, q: &QPoints) -> Option<ReportKind> {
        self.timestamp_delta_us = report.timestamp_delta_us;
        let accuracy = Accuracy::from_status(report.status);

        match report.body {
            ReportBody::Accelerometer(raw) => {
                self.accelerometer = Some(vector(raw, q.accelerometer, accuracy));
                Some(ReportKind::Accelerometer)
            }
            ReportBody::Gyroscope(raw) => {
                self.gyroscope = Some(vector(raw, q.gyroscope, accuracy));
                Some(ReportKind::Gyroscope)
            }
            ReportBody::MagneticField(raw) => {
                self.magnetic_field = Some(vector(raw, q.magnetic_field, accuracy));
                Some(ReportKind::MagneticField)
            }
            ReportBody::LinearAcceleration(raw) => {
                self.linear_acceleration = Some(vector(raw, q.linear_acceleration, accuracy));
                Some(ReportKind::LinearAcceleration)
            }
            ReportBody::RotationVector(raw) => {
                self.rotation_vector = Some(quaternion(raw, q.rotation_vector, accuracy));
                Some(ReportKind::RotationVector)
            }
            ReportBody::GameRotationVector(raw) => {
                self.game_rotation_vector = Some(quaternion(raw, q.rotation_vector, accuracy));
                Some(ReportKind::GameRotationVector)
            }
            ReportBody::StepCounter { steps } => {
                self.steps = Some(steps);
                Some(ReportKind::StepCounter)
            }
            ReportBody::Stability { class } => {
                self.stability = Some(class);
                Some(ReportKind::Stability)
            }
            ReportBody::Activity {
                most_likely,
                confidence,
            } => {
                self.activity = Some(ActivityReading {
                    most_likely,
                    confidence,
                });
                Some(ReportKind::Activity)
            }
            ReportBody::Unrecognized { .. } => None,
        }
    }
}

fn vector(raw: RawVector, q: u8, accuracy: Accuracy) -> VectorReading {
    VectorReading {
        x: q_to_f32(raw.x, q),
        y: q_to_f32(raw.y, q),
        z: q_to_f32(raw.z, q),
        accuracy,
    }
}

fn quaternion(raw: RawQuaternion, q: u8, accuracy: Accuracy) -> QuaternionReading {
    QuaternionReading {
        i: q_to_f32(raw.i, q),
        j: q_to_f32(raw.j, q),
        k: q_to_f32(raw.k, q),
        real: q_to_f32(raw.real, q),
        radian_accuracy: q_to_f32(raw.radian_accuracy, q),
        accuracy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(body: ReportBody, status: u8) -> InputReport {
        InputReport {
            timestamp_delta_us: 2500,
            report_id: 0,
            sequence: 0,
            status,
            delay: 0,
            body,
        }
    }

    #[test]
    fn accuracy_comes_from_the_low_bits() {
        assert_eq!(Accuracy::from_status(0), Accuracy::Unreliable);
        assert_eq!(Accuracy::from_status(1), Accuracy::Low);
        assert_eq!(Accuracy::from_status(2), Accuracy::Medium);
        assert_eq!(Accuracy::from_status(3), Accuracy::High);
    }

    #[test]
    fn accelerometer_report_fills_its_slot() {
        let mut state = SessionState::default();
        let raw = RawVector { x: 100, y: 200, z: 300 };

        let kind = state.apply_input(&report(ReportBody::Accelerometer(raw), 1), &QPoints::default());

        assert_eq!(kind, Some(ReportKind::Accelerometer));
        let reading = state.accelerometer.unwrap();
        assert_eq!(reading.x, 0.390625);
        assert_eq!(reading.y, 0.78125);
        assert_eq!(reading.z, 1.171875);
        assert_eq!(reading.accuracy, Accuracy::Low);
        assert_eq!(state.timestamp_delta_us, 2500);
        assert!(state.rotation_vector.is_none());
    }

    #[test]
    fn unrecognized_body_still_updates_the_timestamp() {
        let mut state = SessionState::default();

        let kind = state.apply_input(
            &report(ReportBody::Unrecognized { report_id: 0x10 }, 0),
            &QPoints::default(),
        );

        assert_eq!(kind, None);
        assert_eq!(state.timestamp_delta_us, 2500);
        assert!(state.accelerometer.is_none());
    }

    #[test]
    fn quaternion_words_share_the_rotation_vector_scale() {
        let mut state = SessionState::default();
        let raw = RawQuaternion {
            i: 8192,
            j: -8192,
            k: 0,
            real: 16384,
            radian_accuracy: 164,
        };

        state.apply_input(&report(ReportBody::RotationVector(raw), 3), &QPoints::default());

        let reading = state.rotation_vector.unwrap();
        assert_eq!(reading.i, 0.5);
        assert_eq!(reading.j, -0.5);
        assert_eq!(reading.real, 1.0);
        assert_eq!(reading.radian_accuracy, 164.0 / 16384.0);
        assert_eq!(reading.accuracy, Accuracy::High);
    }
}
