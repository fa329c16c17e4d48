//! In-memory backend for tests and offline simulation.
//!
//! Everything is scripted through the control surface: seed devices and
//! snapshot documents, inject failures, push metric updates, and inspect
//! call counts afterwards. Snapshot reads can be gated on a semaphore to
//! exercise overlap and cancellation paths deterministically.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crown_protocol::{DeviceInfo, MetricChannel, MetricUpdate};

use super::{AuthHandle, MetricSink, RemoteError, RemoteSessionClient, SubscriptionHandle};

#[derive(Default)]
struct State {
    devices: Vec<DeviceInfo>,
    snapshots: HashMap<String, serde_json::Value>,
    reject_login: bool,
    fail_logout: bool,
    fail_subscribe: bool,
    snapshot_gate: Option<Arc<Semaphore>>,
    logged_in: bool,
    next_handle: u64,
    sinks: HashMap<u64, (MetricChannel, MetricSink)>,
    unsubscribed: Vec<MetricChannel>,
    login_calls: u64,
    logout_calls: u64,
    snapshot_calls: u64,
}

/// Scriptable [`RemoteSessionClient`] with no I/O.
#[derive(Clone, Default)]
pub struct FakeSessionClient {
    state: Arc<Mutex<State>>,
}

impl FakeSessionClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_devices(&self, devices: Vec<DeviceInfo>) {
        self.state.lock().devices = devices;
    }

    /// Seeds the status document returned for `device_id`.
    pub fn set_snapshot(&self, device_id: &str, snapshot: serde_json::Value) {
        self.state.lock().snapshots.insert(device_id.to_string(), snapshot);
    }

    /// Removes the status document so reads report an absent node.
    pub fn clear_snapshot(&self, device_id: &str) {
        self.state.lock().snapshots.remove(device_id);
    }

    pub fn set_reject_login(&self, reject: bool) {
        self.state.lock().reject_login = reject;
    }

    pub fn set_fail_logout(&self, fail: bool) {
        self.state.lock().fail_logout = fail;
    }

    pub fn set_fail_subscribe(&self, fail: bool) {
        self.state.lock().fail_subscribe = fail;
    }

    /// Makes snapshot reads block until permits are added to the returned
    /// semaphore. One permit releases one read.
    pub fn gate_snapshots(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.state.lock().snapshot_gate = Some(Arc::clone(&gate));
        gate
    }

    /// Delivers an update to every live sink on `channel`.
    pub fn push(&self, channel: &MetricChannel, update: MetricUpdate) {
        let sinks: Vec<MetricSink> = self
            .state
            .lock()
            .sinks
            .values()
            .filter(|(c, _)| c == channel)
            .map(|(_, sink)| Arc::clone(sink))
            .collect();
        for sink in sinks {
            sink(update.clone());
        }
    }

    pub fn live_channels(&self) -> Vec<MetricChannel> {
        let mut channels: Vec<MetricChannel> =
            self.state.lock().sinks.values().map(|(c, _)| c.clone()).collect();
        channels.sort_by_key(|c| c.name());
        channels
    }

    pub fn unsubscribed_channels(&self) -> Vec<MetricChannel> {
        self.state.lock().unsubscribed.clone()
    }

    pub fn login_calls(&self) -> u64 {
        self.state.lock().login_calls
    }

    pub fn logout_calls(&self) -> u64 {
        self.state.lock().logout_calls
    }

    pub fn snapshot_calls(&self) -> u64 {
        self.state.lock().snapshot_calls
    }
}

#[async_trait]
impl RemoteSessionClient for FakeSessionClient {
    async fn login(&self, email: &str, _password: &str) -> Result<AuthHandle, RemoteError> {
        let mut state = self.state.lock();
        state.login_calls += 1;
        if state.reject_login {
            return Err(RemoteError::AuthRejected(format!("unknown account {email}")));
        }
        state.logged_in = true;
        Ok(AuthHandle { user_id: format!("user:{email}") })
    }

    async fn logout(&self) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.logout_calls += 1;
        state.logged_in = false;
        if state.fail_logout {
            return Err(RemoteError::Unreachable("connection lost".into()));
        }
        Ok(())
    }

    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, RemoteError> {
        let state = self.state.lock();
        if !state.logged_in {
            return Err(RemoteError::NotConnected);
        }
        Ok(state.devices.clone())
    }

    async fn status_snapshot(
        &self,
        device_id: &str,
    ) -> Result<Option<serde_json::Value>, RemoteError> {
        let gate = {
            let mut state = self.state.lock();
            state.snapshot_calls += 1;
            state.snapshot_gate.as_ref().map(Arc::clone)
        };
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| RemoteError::Unreachable("gate closed".into()))?;
            permit.forget();
        }
        Ok(self.state.lock().snapshots.get(device_id).cloned())
    }

    async fn subscribe(
        &self,
        _device_id: &str,
        channel: MetricChannel,
        sink: MetricSink,
    ) -> Result<SubscriptionHandle, RemoteError> {
        let mut state = self.state.lock();
        if state.fail_subscribe {
            return Err(RemoteError::Unreachable("subscribe refused".into()));
        }
        state.next_handle += 1;
        let id = state.next_handle;
        state.sinks.insert(id, (channel.clone(), sink));
        Ok(SubscriptionHandle { id, channel })
    }

    async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.sinks.remove(&handle.id);
        state.unsubscribed.push(handle.channel.clone());
        Ok(())
    }
}
