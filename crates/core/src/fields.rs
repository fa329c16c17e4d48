//! Observable output fields consumed by a presentation layer.
//!
//! The controller and its push sinks are the only writers. Every write is
//! tagged with the logout generation current when the writing operation
//! began; a logout bumps the generation before any of its own awaits, so
//! results from polls or pushes that were already in flight land stale and
//! are discarded instead of resurrecting cleared state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crown_protocol::MetricUpdate;

use crate::profile::NOT_SELECTED;
use crate::resolver::NormalizedStatus;

/// Accelerometer-derived scores, updated as a unit per push.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccelerometerScores {
    pub acceleration: f32,
    pub inclination: f32,
    pub orientation: f32,
    pub pitch: f32,
    pub roll: f32,
    /// Raw 3-axis vector; `x` is roll, `y` is pitch, yaw is not provided.
    pub vector: (f32, f32, f32),
}

/// Per-channel metric scores, zeroed on logout and on non-streaming sleep.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricScores {
    /// Calm probability in [0, 1].
    pub calm: f32,
    /// Focus probability in [0, 1].
    pub focus: f32,
    pub accelerometer: AccelerometerScores,
}

/// Snapshot of the presentation surface at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub is_logged_in: bool,
    pub is_subscribed: bool,
    /// Backend device identifier, or [`NOT_SELECTED`].
    pub selected_device_id: String,
    /// Normalized status label ("Online", "Charging", ...). Empty until the
    /// first successful poll.
    pub status_label: String,
    pub battery_percent: f32,
    pub metrics: MetricScores,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            is_logged_in: false,
            is_subscribed: false,
            selected_device_id: NOT_SELECTED.to_string(),
            status_label: String::new(),
            battery_percent: 0.0,
            metrics: MetricScores::default(),
        }
    }
}

#[derive(Default)]
struct Inner {
    view: SessionView,
    kinesis: HashMap<String, f32>,
}

/// Shared field store; writers are generation-checked.
#[derive(Default)]
pub struct FieldStore {
    inner: Mutex<Inner>,
    generation: AtomicU64,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation current right now; captured by operations before they
    /// suspend and presented back with their writes.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Invalidates all in-flight writes. Called by logout before it awaits.
    pub fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Clones the current presentation surface.
    pub fn view(&self) -> SessionView {
        self.inner.lock().view.clone()
    }

    /// Last pushed probability for a trained kinesis label, if any.
    pub fn kinesis_score(&self, label: &str) -> Option<f32> {
        self.inner.lock().kinesis.get(label).copied()
    }

    pub(crate) fn set_logged_in(&self, logged_in: bool) {
        self.inner.lock().view.is_logged_in = logged_in;
    }

    pub(crate) fn set_subscribed(&self, subscribed: bool) {
        self.inner.lock().view.is_subscribed = subscribed;
    }

    pub(crate) fn set_selected_device(&self, device_id: &str) {
        self.inner.lock().view.selected_device_id = device_id.to_string();
    }

    /// Zeroes metric scores unconditionally (device switch, logout reset).
    pub(crate) fn clear_metrics(&self) {
        let mut inner = self.inner.lock();
        inner.view.metrics = MetricScores::default();
        inner.kinesis.clear();
    }

    /// Writes a resolved status, zeroing metrics when the resolver says the
    /// device is in a non-streaming sleep state. Returns `false` when the
    /// write is stale.
    pub(crate) fn apply_status(&self, generation: u64, status: &NormalizedStatus) -> bool {
        let mut inner = self.inner.lock();
        if self.generation() != generation {
            return false;
        }
        inner.view.status_label = status.label.clone();
        inner.view.battery_percent = status.battery_percent;
        if status.suppress_metrics {
            inner.view.metrics = MetricScores::default();
            inner.kinesis.clear();
        }
        true
    }

    /// Writes one pushed metric update. Returns `false` when stale.
    pub(crate) fn apply_metric(&self, generation: u64, update: MetricUpdate) -> bool {
        let mut inner = self.inner.lock();
        if self.generation() != generation {
            return false;
        }
        match update {
            MetricUpdate::Calm(probability) => inner.view.metrics.calm = probability,
            MetricUpdate::Focus(probability) => inner.view.metrics.focus = probability,
            MetricUpdate::Accelerometer(a) => {
                let scores = &mut inner.view.metrics.accelerometer;
                scores.acceleration = a.acceleration;
                scores.inclination = a.inclination;
                scores.orientation = a.orientation;
                scores.pitch = a.pitch;
                scores.roll = a.roll;
                scores.vector = (a.x, a.y, a.z);
            }
            MetricUpdate::Kinesis { label, probability } => {
                inner.kinesis.insert(label, probability);
            }
        }
        true
    }

    /// Logout reset: everything back to the zero/empty state.
    pub(crate) fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.view = SessionView::default();
        inner.kinesis.clear();
    }
}
