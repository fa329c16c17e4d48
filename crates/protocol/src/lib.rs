//! Wire types for the Crown realtime backend.
//!
//! This crate contains the serde-serializable types exchanged with the
//! remote realtime database that fronts the headset: status snapshots,
//! device records, and per-channel metric payloads. These types represent
//! the "protocol layer" - the shapes of data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * 1:1 with the backend: Field names match the backend's camelCase JSON
//! * Stable: Changes only when the backend payloads change
//!
//! Higher-level session logic is built on top of these types in `crown-rs`.

pub mod device;
pub mod metrics;
pub mod status;

pub use device::*;
pub use metrics::*;
pub use status::*;
