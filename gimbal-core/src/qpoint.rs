use serde::Deserialize;

/// Converts a fixed-point sensor word with the given Q exponent.
pub fn q_to_f32(raw: i16, q: u8) -> f32 {
    raw as f32 * (2.0_f32).powi(-(q as i32))
}

/// Q exponents used to dequantize each report family.
///
/// These are fixed per-sensor constants supplied by configuration, never
/// discovered from the hub at runtime. The defaults match the BNO08x
/// datasheet values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QPoints {
    pub rotation_vector: u8,
    pub accelerometer: u8,
    pub linear_acceleration: u8,
    pub gyroscope: u8,
    pub magnetic_field: u8,
}

impl Default for QPoints {
    fn default() -> Self {
        Self {
            rotation_vector: 14,
            accelerometer: 8,
            linear_acceleration: 8,
            gyroscope: 9,
            magnetic_field: 4,
        }
    }
}
