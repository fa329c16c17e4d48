//! Backend seam: the trait the session controller drives.
//!
//! Real deployments implement [`RemoteSessionClient`] over the hosted
//! realtime database (the CLI ships a REST/SSE implementation); tests use
//! the in-memory [`fake::FakeSessionClient`].

pub mod fake;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crown_protocol::{DeviceInfo, MetricChannel, MetricUpdate};

/// Callback invoked by the backend for each pushed metric update.
///
/// Sinks are installed at subscribe time and may be called from any task
/// until the matching unsubscribe completes.
pub type MetricSink = Arc<dyn Fn(MetricUpdate) + Send + Sync>;

/// Transport-level failures reported by a backend client.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The backend rejected the presented credentials.
    #[error("credentials rejected: {0}")]
    AuthRejected(String),

    /// The backend could not be reached at all.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// The backend answered with something we could not interpret.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A call that requires an authenticated connection was made without one.
    #[error("not connected")]
    NotConnected,
}

/// Proof of a completed login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHandle {
    /// Backend-assigned account identifier.
    pub user_id: String,
}

/// Identifies one live push subscription for later teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    pub id: u64,
    pub channel: MetricChannel,
}

/// Remote realtime-database backend as seen by the session controller.
///
/// Snapshot reads return the raw JSON document (or `None` when the node is
/// absent); interpreting it is the controller's job so that malformed
/// documents degrade to a skipped cycle rather than a transport error.
#[async_trait]
pub trait RemoteSessionClient: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthHandle, RemoteError>;

    async fn logout(&self) -> Result<(), RemoteError>;

    /// Devices registered to the authenticated account.
    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, RemoteError>;

    /// One-shot read of the device's status document.
    async fn status_snapshot(
        &self,
        device_id: &str,
    ) -> Result<Option<serde_json::Value>, RemoteError>;

    /// Opens a push subscription; `sink` receives every update for `channel`.
    async fn subscribe(
        &self,
        device_id: &str,
        channel: MetricChannel,
        sink: MetricSink,
    ) -> Result<SubscriptionHandle, RemoteError>;

    async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<(), RemoteError>;
}
