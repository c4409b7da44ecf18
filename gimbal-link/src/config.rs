use gimbal_core::QPoints;
use serde::Deserialize;

/// Tunables for one hub session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Largest single bus transaction in bytes, header included.
    pub transaction_limit: usize,
    /// Consecutive poll failures tolerated before the session resets
    /// the hub and replays its feature ledger.
    pub reset_threshold: u32,
    /// Receive attempts granted to the product id handshake.
    pub handshake_attempts: u32,
    /// Fixed-point scaling per report family.
    pub q_points: QPoints,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transaction_limit: 32,
            reset_threshold: 3,
            handshake_attempts: 16,
            q_points: QPoints::default(),
        }
    }
}
