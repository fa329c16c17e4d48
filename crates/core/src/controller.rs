//! The session state machine.
//!
//! One [`SessionController`] owns one device session end to end: login,
//! device selection, push subscriptions, the periodic status poll, and
//! teardown. All observable output goes through the [`FieldStore`]; callers
//! read it via [`SessionController::view`].
//!
//! Locking discipline: the state and profile mutexes are parking_lot and are
//! never held across an await. Anything that must survive a suspension point
//! is cloned out first, and writes that land after a suspension are checked
//! against the logout generation.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crown_protocol::{DeviceInfo, MetricChannel, RawStatusSnapshot};

use crate::error::{Error, Result};
use crate::fields::{FieldStore, SessionView};
use crate::profile::{DEVICE_ID_MIN_LEN, DeviceProfile, NOT_SELECTED};
use crate::registry::SubscriptionRegistry;
use crate::remote::{MetricSink, RemoteSessionClient};
use crate::resolver::{NormalizedStatus, resolve_status};

/// Which standard channels [`SessionController::subscribe`] starts.
///
/// Kinesis labels are opted into separately via
/// [`SessionController::subscribe_kinesis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionConfig {
    pub calm: bool,
    pub focus: bool,
    pub accelerometer: bool,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self { calm: true, focus: true, accelerometer: true }
    }
}

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The snapshot was fetched, resolved, and written to the output fields.
    Updated(NormalizedStatus),
    /// The cycle was abandoned; the output fields are untouched.
    Skipped(SkipReason),
}

/// Why a poll cycle wrote nothing. Never an error: the next tick retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A previous poll is still suspended on its fetch.
    PollInFlight,
    NotLoggedIn,
    DeviceNotSelected,
    /// The selected identifier is too short to be backend-issued.
    InvalidDeviceId,
    FetchFailed,
    /// The status node does not exist on the backend.
    SnapshotAbsent,
    /// The status node exists but is not a parseable snapshot document.
    SnapshotUnreadable,
    /// A logout completed while the fetch was in flight.
    StaleGeneration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    LoggedOut,
    Authenticating,
    LoggedIn,
    Selecting,
    LoggingOut,
}

/// Ordered precondition checks run before a poll touches the network.
fn poll_preconditions(state: SessionState, profile: &DeviceProfile) -> Option<SkipReason> {
    if state != SessionState::LoggedIn {
        return Some(SkipReason::NotLoggedIn);
    }
    if profile.device_id == NOT_SELECTED {
        return Some(SkipReason::DeviceNotSelected);
    }
    if !profile.device_id_is_valid() {
        return Some(SkipReason::InvalidDeviceId);
    }
    None
}

/// Client-side manager for one device session.
pub struct SessionController<C: RemoteSessionClient> {
    client: C,
    config: SubscriptionConfig,
    state: parking_lot::Mutex<SessionState>,
    profile: parking_lot::Mutex<DeviceProfile>,
    fields: Arc<FieldStore>,
    registry: SubscriptionRegistry,
    poll_gate: tokio::sync::Mutex<()>,
}

impl<C: RemoteSessionClient> SessionController<C> {
    pub fn new(client: C) -> Self {
        Self::with_config(client, SubscriptionConfig::default())
    }

    pub fn with_config(client: C, config: SubscriptionConfig) -> Self {
        Self {
            client,
            config,
            state: parking_lot::Mutex::new(SessionState::LoggedOut),
            profile: parking_lot::Mutex::new(DeviceProfile::default()),
            fields: Arc::new(FieldStore::new()),
            registry: SubscriptionRegistry::new(),
            poll_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Current presentation surface.
    pub fn view(&self) -> SessionView {
        self.fields.view()
    }

    /// Last pushed probability for a trained kinesis label.
    pub fn kinesis_score(&self, label: &str) -> Option<f32> {
        self.fields.kinesis_score(label)
    }

    /// Opens the remote session and stores the credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != SessionState::LoggedOut {
                return Err(Error::InvalidState("login requires a logged-out session"));
            }
            *state = SessionState::Authenticating;
        }
        debug!(target: "crown.session", email, "logging in");

        match self.client.login(email, password).await {
            Ok(auth) => {
                {
                    let mut profile = self.profile.lock();
                    profile.email = email.to_string();
                    profile.password = password.to_string();
                }
                self.fields.set_logged_in(true);
                *self.state.lock() = SessionState::LoggedIn;
                info!(target: "crown.session", user = %auth.user_id, "logged in");
                Ok(())
            }
            Err(error) => {
                *self.state.lock() = SessionState::LoggedOut;
                Err(Error::Auth(error))
            }
        }
    }

    /// Ends the session and resets every output field.
    ///
    /// Safe to call when already logged out, and safe to call while a poll
    /// or device selection is suspended: the generation bump below makes
    /// their late writes land stale. Remote-side failure is logged and
    /// swallowed; the local reset is unconditional.
    pub async fn logout(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            match *state {
                SessionState::LoggedOut => return Ok(()),
                SessionState::Authenticating | SessionState::LoggingOut => {
                    return Err(Error::InvalidState("logout during another transition"));
                }
                SessionState::LoggedIn | SessionState::Selecting => {
                    *state = SessionState::LoggingOut;
                }
            }
        }
        self.fields.bump_generation();

        self.registry.stop_all(&self.client).await;
        if let Err(error) = self.client.logout().await {
            warn!(target: "crown.session", %error, "remote logout failed; resetting locally");
        }

        self.profile.lock().clear();
        self.fields.reset();
        *self.state.lock() = SessionState::LoggedOut;
        info!(target: "crown.session", "logged out");
        Ok(())
    }

    /// Devices registered to the authenticated account.
    pub async fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        if !self.is_logged_in() {
            return Err(Error::NotLoggedIn);
        }
        Ok(self.client.list_devices().await?)
    }

    /// Resolves `nickname` to a device and binds the session to it.
    ///
    /// The remote session is device-scoped, so a selection re-establishes it
    /// with the stored credentials before the new identifier takes effect.
    /// Standard-channel subscriptions are restarted afterwards. On a failed
    /// lookup the previous selection is left untouched.
    pub async fn select_device(&self, nickname: &str) -> Result<String> {
        {
            let mut state = self.state.lock();
            if *state != SessionState::LoggedIn {
                return Err(Error::InvalidState("select_device requires an idle session"));
            }
            *state = SessionState::Selecting;
        }
        let generation = self.fields.generation();

        let devices = match self.client.list_devices().await {
            Ok(devices) => devices,
            Err(error) => {
                self.finish_selecting(generation);
                return Err(error.into());
            }
        };
        if self.stale(generation) {
            return Err(Error::NotLoggedIn);
        }

        let Some(device) = devices.iter().find(|d| d.device_nickname == nickname) else {
            self.finish_selecting(generation);
            return Err(Error::DeviceNotFound(nickname.to_string()));
        };
        let device_id = device.device_id.clone();
        debug!(
            target: "crown.session",
            nickname,
            device = %device_id,
            "selected device, re-establishing session"
        );

        let (email, password) = {
            let profile = self.profile.lock();
            (profile.email.clone(), profile.password.clone())
        };

        self.registry.stop_all(&self.client).await;
        if self.stale(generation) {
            return Err(Error::NotLoggedIn);
        }
        self.fields.set_subscribed(false);
        self.fields.clear_metrics();

        if let Err(error) = self.client.logout().await {
            warn!(target: "crown.session", %error, "remote logout failed during device switch");
        }
        self.profile.lock().clear();
        if self.stale(generation) {
            return Err(Error::NotLoggedIn);
        }

        if let Err(error) = self.client.login(&email, &password).await {
            self.fields.reset();
            *self.state.lock() = SessionState::LoggedOut;
            return Err(Error::Auth(error));
        }
        if self.stale(generation) {
            return Err(Error::NotLoggedIn);
        }

        {
            let mut profile = self.profile.lock();
            profile.email = email;
            profile.password = password;
            profile.device_id = device_id.clone();
        }
        self.fields.set_selected_device(&device_id);
        self.finish_selecting(generation);
        info!(target: "crown.session", device = %device_id, "session bound to device");

        // A short identifier suppresses all reads; do not start channels on it.
        if device_id.len() >= DEVICE_ID_MIN_LEN {
            self.subscribe().await?;
        }
        Ok(device_id)
    }

    /// Starts the enabled standard channels. No-op for channels already live.
    pub async fn subscribe(&self) -> Result<()> {
        let device_id = self.subscription_target()?;
        let generation = self.fields.generation();

        let mut wanted = Vec::new();
        if self.config.calm {
            wanted.push(MetricChannel::Calm);
        }
        if self.config.focus {
            wanted.push(MetricChannel::Focus);
        }
        if self.config.accelerometer {
            wanted.push(MetricChannel::Accelerometer);
        }

        for channel in wanted {
            self.start_channel(&device_id, generation, channel).await?;
        }
        if !self.registry.is_empty() {
            self.fields.set_subscribed(true);
        }
        Ok(())
    }

    /// Starts the kinesis channel for one trained label.
    pub async fn subscribe_kinesis(&self, label: &str) -> Result<()> {
        let device_id = self.subscription_target()?;
        let generation = self.fields.generation();
        self.start_channel(&device_id, generation, MetricChannel::Kinesis(label.to_string()))
            .await?;
        self.fields.set_subscribed(true);
        Ok(())
    }

    /// Tears down every push subscription without ending the session.
    pub async fn unsubscribe_all(&self) -> Result<()> {
        self.registry.stop_all(&self.client).await;
        self.fields.set_subscribed(false);
        self.fields.clear_metrics();
        Ok(())
    }

    /// One refresh cycle: fetch the status snapshot, resolve it, publish it.
    ///
    /// Never fails; every abandoned cycle reports a [`SkipReason`] and leaves
    /// the output fields exactly as they were.
    pub async fn poll(&self) -> PollOutcome {
        let Ok(_cycle) = self.poll_gate.try_lock() else {
            return PollOutcome::Skipped(SkipReason::PollInFlight);
        };

        let (generation, device_id) = {
            let state = *self.state.lock();
            let profile = self.profile.lock();
            if let Some(reason) = poll_preconditions(state, &profile) {
                return PollOutcome::Skipped(reason);
            }
            (self.fields.generation(), profile.device_id.clone())
        };

        let value = match self.client.status_snapshot(&device_id).await {
            Ok(value) => value,
            Err(error) => {
                debug!(target: "crown.session", %error, "snapshot fetch failed");
                return PollOutcome::Skipped(SkipReason::FetchFailed);
            }
        };
        let Some(value) = value else {
            return PollOutcome::Skipped(SkipReason::SnapshotAbsent);
        };
        let snapshot: RawStatusSnapshot = match serde_json::from_value(value) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                debug!(target: "crown.session", %error, "snapshot unreadable");
                return PollOutcome::Skipped(SkipReason::SnapshotUnreadable);
            }
        };

        let status = resolve_status(&snapshot);
        if !self.fields.apply_status(generation, &status) {
            return PollOutcome::Skipped(SkipReason::StaleGeneration);
        }
        PollOutcome::Updated(status)
    }

    fn is_logged_in(&self) -> bool {
        matches!(*self.state.lock(), SessionState::LoggedIn | SessionState::Selecting)
    }

    fn stale(&self, generation: u64) -> bool {
        self.fields.generation() != generation
    }

    /// Returns the Selecting state to LoggedIn unless a logout took over.
    fn finish_selecting(&self, generation: u64) {
        if self.stale(generation) {
            return;
        }
        let mut state = self.state.lock();
        if *state == SessionState::Selecting {
            *state = SessionState::LoggedIn;
        }
    }

    fn subscription_target(&self) -> Result<String> {
        if *self.state.lock() != SessionState::LoggedIn {
            return Err(Error::NotLoggedIn);
        }
        let profile = self.profile.lock();
        if !profile.device_id_is_valid() {
            return Err(Error::InvalidState("no device selected"));
        }
        Ok(profile.device_id.clone())
    }

    async fn start_channel(
        &self,
        device_id: &str,
        generation: u64,
        channel: MetricChannel,
    ) -> Result<()> {
        if self.registry.contains(&channel) {
            return Ok(());
        }

        let fields = Arc::clone(&self.fields);
        let sink: MetricSink = Arc::new(move |update| {
            let _ = fields.apply_metric(generation, update);
        });

        let handle = self.client.subscribe(device_id, channel.clone(), sink).await?;
        if self.stale(generation) {
            // Logout won the race; this subscription must not outlive it.
            let _ = self.client.unsubscribe(&handle).await;
            return Err(Error::NotLoggedIn);
        }
        if let Some(previous) = self.registry.register(handle) {
            let _ = self.client.unsubscribe(&previous).await;
        }
        debug!(target: "crown.session", %channel, "subscription started");
        Ok(())
    }
}

/// Credential hygiene on teardown: the profile and output fields are cleared
/// synchronously even though remote cleanup cannot run here.
impl<C: RemoteSessionClient> Drop for SessionController<C> {
    fn drop(&mut self) {
        self.fields.bump_generation();
        self.profile.lock().clear();
        self.fields.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_enables_all_standard_channels() {
        let config = SubscriptionConfig::default();
        assert!(config.calm && config.focus && config.accelerometer);
    }

    #[test]
    fn poll_preconditions_are_ordered() {
        let mut profile = DeviceProfile::default();

        assert_eq!(
            poll_preconditions(SessionState::LoggedOut, &profile),
            Some(SkipReason::NotLoggedIn)
        );
        assert_eq!(
            poll_preconditions(SessionState::LoggedIn, &profile),
            Some(SkipReason::DeviceNotSelected)
        );

        profile.device_id = "short-id".to_string();
        assert_eq!(
            poll_preconditions(SessionState::LoggedIn, &profile),
            Some(SkipReason::InvalidDeviceId)
        );

        profile.device_id = "x".repeat(32);
        assert_eq!(poll_preconditions(SessionState::LoggedIn, &profile), None);
    }

    #[test]
    fn selection_in_progress_is_not_pollable() {
        let mut profile = DeviceProfile::default();
        profile.device_id = "x".repeat(32);
        assert_eq!(
            poll_preconditions(SessionState::Selecting, &profile),
            Some(SkipReason::NotLoggedIn)
        );
    }
}
