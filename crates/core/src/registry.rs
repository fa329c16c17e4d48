//! Bookkeeping for live push subscriptions.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crown_protocol::MetricChannel;

use crate::remote::{RemoteSessionClient, SubscriptionHandle};

/// Tracks which channels have an open push subscription.
///
/// At most one subscription per channel is held; re-registering an already
/// live channel is a no-op at this layer.
#[derive(Default)]
pub struct SubscriptionRegistry {
    handles: Mutex<HashMap<MetricChannel, SubscriptionHandle>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a live subscription. Returns the previous handle if the
    /// channel was already registered (the caller should tear it down).
    pub fn register(&self, handle: SubscriptionHandle) -> Option<SubscriptionHandle> {
        self.handles.lock().insert(handle.channel.clone(), handle)
    }

    pub fn contains(&self, channel: &MetricChannel) -> bool {
        self.handles.lock().contains_key(channel)
    }

    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }

    /// Tears down every live subscription, best effort.
    ///
    /// Handles are drained before the first remote call, so a second
    /// invocation (or a concurrent one) finds nothing to do. Unsubscribe
    /// failures are logged and swallowed; the backend drops server-side
    /// listeners when the session ends anyway.
    pub async fn stop_all<C: RemoteSessionClient + ?Sized>(&self, client: &C) {
        let drained: Vec<SubscriptionHandle> =
            self.handles.lock().drain().map(|(_, handle)| handle).collect();
        if drained.is_empty() {
            return;
        }
        debug!(target: "crown.registry", count = drained.len(), "stopping subscriptions");
        for handle in drained {
            if let Err(error) = client.unsubscribe(&handle).await {
                warn!(
                    target: "crown.registry",
                    channel = %handle.channel,
                    %error,
                    "unsubscribe failed; dropping handle"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: u64, channel: MetricChannel) -> SubscriptionHandle {
        SubscriptionHandle { id, channel }
    }

    #[test]
    fn register_replaces_per_channel() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.register(handle(1, MetricChannel::Calm)).is_none());
        assert!(registry.register(handle(2, MetricChannel::Focus)).is_none());
        assert_eq!(registry.len(), 2);

        let replaced = registry.register(handle(3, MetricChannel::Calm));
        assert_eq!(replaced, Some(handle(1, MetricChannel::Calm)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn kinesis_labels_are_distinct_channels() {
        let registry = SubscriptionRegistry::new();
        registry.register(handle(1, MetricChannel::Kinesis("leftArm".into())));
        registry.register(handle(2, MetricChannel::Kinesis("rightArm".into())));
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&MetricChannel::Kinesis("leftArm".into())));
        assert!(!registry.contains(&MetricChannel::Kinesis("jaw".into())));
    }
}
