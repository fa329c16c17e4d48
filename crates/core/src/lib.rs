//! Client-side session management for the Crown wearable biosensor.
//!
//! This crate owns the device-session state machine: authentication
//! sequencing, device selection, snapshot polling with its ordered guard
//! chain, and push-subscription fan-out to per-channel metric sinks. The
//! remote backend is reached through the [`remote::RemoteSessionClient`]
//! trait; an in-memory fake lives in [`remote::fake`] for tests and
//! simulation.
//!
//! A presentation layer binds to the observable [`fields::SessionView`]
//! produced by [`controller::SessionController`]; nothing in this crate
//! renders anything.

#![forbid(unsafe_code)]

pub mod controller;
pub mod error;
pub mod fields;
pub mod profile;
pub mod registry;
pub mod remote;
pub mod resolver;

pub use controller::{PollOutcome, SessionController, SkipReason, SubscriptionConfig};
pub use error::{Error, Result};
pub use fields::{AccelerometerScores, MetricScores, SessionView};
pub use profile::{DEVICE_ID_MIN_LEN, DeviceProfile, NOT_SELECTED};
pub use registry::SubscriptionRegistry;
pub use remote::{AuthHandle, MetricSink, RemoteError, RemoteSessionClient, SubscriptionHandle};
pub use resolver::{NormalizedStatus, resolve_status};
