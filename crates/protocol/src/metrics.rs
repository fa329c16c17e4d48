//! Live metric channels and their push payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named live data feed deliverable via push subscription.
///
/// Kinesis is the legacy trained-thought channel; it is parameterized by the
/// label used during training (`leftArm`, `rightIndexFinger`, ...), and each
/// label is its own logical channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetricChannel {
    Calm,
    Focus,
    Accelerometer,
    Kinesis(String),
}

impl MetricChannel {
    /// Channel name as used in backend subscription paths.
    pub fn name(&self) -> String {
        match self {
            MetricChannel::Calm => "calm".to_string(),
            MetricChannel::Focus => "focus".to_string(),
            MetricChannel::Accelerometer => "accelerometer".to_string(),
            MetricChannel::Kinesis(label) => format!("kinesis:{label}"),
        }
    }
}

impl fmt::Display for MetricChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Probability-style payload pushed on the calm, focus, and kinesis channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityPayload {
    /// Score in [0, 1].
    pub probability: f32,
}

/// Payload pushed on the accelerometer channel.
///
/// `x` maps to roll and `y` to pitch; the backend does not provide yaw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccelerometerUpdate {
    pub acceleration: f32,
    pub inclination: f32,
    pub orientation: f32,
    pub pitch: f32,
    pub roll: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Typed update delivered to a metric sink by the remote client.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricUpdate {
    Calm(f32),
    Focus(f32),
    Accelerometer(AccelerometerUpdate),
    Kinesis { label: String, probability: f32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_match_backend_paths() {
        assert_eq!(MetricChannel::Calm.name(), "calm");
        assert_eq!(MetricChannel::Focus.name(), "focus");
        assert_eq!(MetricChannel::Accelerometer.name(), "accelerometer");
        assert_eq!(MetricChannel::Kinesis("leftArm".into()).name(), "kinesis:leftArm");
    }

    #[test]
    fn accelerometer_update_parses_push_payload() {
        let json = r#"{"acceleration": 0.2, "inclination": 12.5, "orientation": 3.0, "pitch": 1.5, "roll": -0.5, "x": 0.1, "y": 0.2, "z": 0.9}"#;
        let update: AccelerometerUpdate = serde_json::from_str(json).unwrap();

        assert_eq!(update.inclination, 12.5);
        assert_eq!(update.roll, -0.5);
        assert_eq!(update.z, 0.9);
    }
}
