//! Error types for the session core.

use thiserror::Error;

use crate::remote::RemoteError;

/// Errors surfaced to callers of [`crate::SessionController`].
///
/// Polling deliberately has no variant here: transient fetch problems degrade
/// to a skipped poll cycle instead of an error (see
/// [`crate::controller::SkipReason`]).
#[derive(Debug, Error)]
pub enum Error {
    /// Credentials rejected or the backend could not be reached during login.
    #[error("authentication failed: {0}")]
    Auth(#[source] RemoteError),

    /// No device with the given nickname exists on the account.
    #[error("no device named {0:?} on this account")]
    DeviceNotFound(String),

    /// Operation requires an authenticated session.
    #[error("not logged in")]
    NotLoggedIn,

    /// Operation is not valid in the session's current state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Remote call failed outside the login path.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

pub type Result<T> = std::result::Result<T, Error>;
