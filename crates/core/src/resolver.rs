//! Status resolution: raw snapshot fields to one presentation label.
//!
//! Precedence is fixed. A concrete sleep-mode reason names the label and
//! stops metric streaming regardless of anything else in the snapshot; a
//! bare sleep flag reports the (sentinel) reason but leaves metrics alone;
//! otherwise the device state speaks for itself.

use crown_protocol::RawStatusSnapshot;

/// Resolved, display-ready status derived from one raw snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedStatus {
    /// Label for the presentation layer ("Online", "Charging", "Sleep Mode").
    pub label: String,
    pub battery_percent: f32,
    /// When set, metric scores must be zeroed for this cycle.
    pub suppress_metrics: bool,
}

/// Applies the three-rule precedence to a raw snapshot.
pub fn resolve_status(snapshot: &RawStatusSnapshot) -> NormalizedStatus {
    let (label, suppress_metrics) = if snapshot.sleep_mode_reason.is_present() {
        (snapshot.sleep_mode_reason.to_string(), true)
    } else if snapshot.sleep_mode {
        (snapshot.sleep_mode_reason.to_string(), false)
    } else {
        (snapshot.state.to_string(), false)
    };

    NormalizedStatus { label, battery_percent: snapshot.battery, suppress_metrics }
}
