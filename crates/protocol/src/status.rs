//! Device status snapshot payloads.

use std::fmt;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Coarse operational state reported under `devices/{id}/status`.
///
/// States added by newer firmware deserialize to [`DeviceState::Unknown`]
/// rather than failing the whole snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceState {
    Online,
    #[default]
    Offline,
    Booting,
    ShuttingOff,
    Charging,
    Updating,
    Unknown,
}

impl DeviceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Online => "Online",
            DeviceState::Offline => "Offline",
            DeviceState::Booting => "Booting",
            DeviceState::ShuttingOff => "ShuttingOff",
            DeviceState::Charging => "Charging",
            DeviceState::Updating => "Updating",
            DeviceState::Unknown => "Unknown",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "Online" => DeviceState::Online,
            "Offline" => DeviceState::Offline,
            "Booting" => DeviceState::Booting,
            "ShuttingOff" => DeviceState::ShuttingOff,
            "Charging" => DeviceState::Charging,
            "Updating" => DeviceState::Updating,
            _ => DeviceState::Unknown,
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DeviceState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeviceState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(DeviceState::from_str(&s))
    }
}

/// Backend-provided explanation for why the device is not streaming.
///
/// The backend serializes the "no reason" case either as JSON `null` or as
/// the literal string `"Null"`; both deserialize to [`SleepModeReason::Null`].
/// Reasons added by newer firmware deserialize to [`SleepModeReason::Unknown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SleepModeReason {
    #[default]
    Null,
    Charging,
    Updating,
    PoweringOff,
    Unknown,
}

impl SleepModeReason {
    /// Returns `true` for any reason other than the `Null` sentinel.
    pub fn is_present(&self) -> bool {
        !matches!(self, SleepModeReason::Null)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SleepModeReason::Null => "Null",
            SleepModeReason::Charging => "Charging",
            SleepModeReason::Updating => "Updating",
            SleepModeReason::PoweringOff => "PoweringOff",
            SleepModeReason::Unknown => "Unknown",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "Null" => SleepModeReason::Null,
            "Charging" => SleepModeReason::Charging,
            "Updating" => SleepModeReason::Updating,
            "PoweringOff" => SleepModeReason::PoweringOff,
            _ => SleepModeReason::Unknown,
        }
    }
}

impl fmt::Display for SleepModeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SleepModeReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SleepModeReason {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(s.map(|s| SleepModeReason::from_str(&s)).unwrap_or_default())
    }
}

/// One-time read of `devices/{id}/status`.
///
/// Fetched fresh on every poll; never cached across polls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawStatusSnapshot {
    /// Battery percentage, 0 to 100.
    pub battery: f32,
    pub state: DeviceState,
    pub sleep_mode: bool,
    pub sleep_mode_reason: SleepModeReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_parses_camel_case_fields() {
        let json = r#"{"battery": 80.0, "state": "Online", "sleepMode": false, "sleepModeReason": null}"#;
        let snapshot: RawStatusSnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.battery, 80.0);
        assert_eq!(snapshot.state, DeviceState::Online);
        assert!(!snapshot.sleep_mode);
        assert_eq!(snapshot.sleep_mode_reason, SleepModeReason::Null);
    }

    #[test]
    fn snapshot_accepts_string_null_reason() {
        let json = r#"{"battery": 45, "state": "Offline", "sleepMode": true, "sleepModeReason": "Null"}"#;
        let snapshot: RawStatusSnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.sleep_mode_reason, SleepModeReason::Null);
        assert!(!snapshot.sleep_mode_reason.is_present());
    }

    #[test]
    fn snapshot_tolerates_missing_fields() {
        let snapshot: RawStatusSnapshot = serde_json::from_str(r#"{"battery": 12}"#).unwrap();

        assert_eq!(snapshot.battery, 12.0);
        assert_eq!(snapshot.state, DeviceState::Offline);
        assert_eq!(snapshot.sleep_mode_reason, SleepModeReason::Null);
    }

    #[test]
    fn unknown_state_and_reason_are_tolerated() {
        let json = r#"{"battery": 1, "state": "Hibernating", "sleepMode": true, "sleepModeReason": "Thermal"}"#;
        let snapshot: RawStatusSnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.state, DeviceState::Unknown);
        assert_eq!(snapshot.sleep_mode_reason, SleepModeReason::Unknown);
        assert!(snapshot.sleep_mode_reason.is_present());
    }

    #[test]
    fn state_round_trips_through_display() {
        for state in [DeviceState::Online, DeviceState::Charging, DeviceState::ShuttingOff] {
            assert_eq!(DeviceState::from_str(&state.to_string()), state);
        }
    }
}
