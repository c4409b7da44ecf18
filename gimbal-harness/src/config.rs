use std::path::Path;

use gimbal_core::SensorReportId;
use gimbal_link::SessionConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub session: SessionConfig,
    pub hub: HubConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Probability that a single bus transaction faults.
    pub fault_rate: f64,
    /// Relative noise applied to synthesized readings.
    pub jitter: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of poll iterations before the harness reports and exits.
    pub polls: u32,
    pub poll_interval_ms: u64,
    /// Report streams enabled after the session opens.
    pub features: Vec<FeatureSetting>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeatureSetting {
    pub report: FeatureKind,
    pub interval_ms: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKind {
    Accelerometer,
    LinearAcceleration,
    Gyroscope,
    Magnetometer,
    RotationVector,
    GameRotationVector,
    StepCounter,
    StabilityClassifier,
    ActivityClassifier,
}

impl From<FeatureKind> for SensorReportId {
    fn from(kind: FeatureKind) -> Self {
        match kind {
            FeatureKind::Accelerometer => SensorReportId::Accelerometer,
            FeatureKind::LinearAcceleration => SensorReportId::LinearAcceleration,
            FeatureKind::Gyroscope => SensorReportId::Gyroscope,
            FeatureKind::Magnetometer => SensorReportId::MagneticField,
            FeatureKind::RotationVector => SensorReportId::RotationVector,
            FeatureKind::GameRotationVector => SensorReportId::GameRotationVector,
            FeatureKind::StepCounter => SensorReportId::StepCounter,
            FeatureKind::StabilityClassifier => SensorReportId::StabilityClassifier,
            FeatureKind::ActivityClassifier => SensorReportId::PersonalActivityClassifier,
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            fault_rate: 0.0,
            jitter: 0.02,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            polls: 200,
            poll_interval_ms: 2,
            features: vec![
                FeatureSetting {
                    report: FeatureKind::RotationVector,
                    interval_ms: 10,
                },
                FeatureSetting {
                    report: FeatureKind::Accelerometer,
                    interval_ms: 20,
                },
                FeatureSetting {
                    report: FeatureKind::StepCounter,
                    interval_ms: 100,
                },
            ],
        }
    }
}

impl HarnessConfig {
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HarnessConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_settings_parse_from_kebab_case() {
        let config: HarnessConfig = toml::from_str(
            r#"
            [hub]
            fault_rate = 0.05

            [[run.features]]
            report = "rotation-vector"
            interval_ms = 5

            [[run.features]]
            report = "activity-classifier"
            interval_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.hub.fault_rate, 0.05);
        assert_eq!(config.hub.jitter, 0.02);
        assert_eq!(config.run.features.len(), 2);
        assert_eq!(
            SensorReportId::from(config.run.features[1].report),
            SensorReportId::PersonalActivityClassifier
        );
        assert_eq!(config.session.reset_threshold, 3);
    }
}
