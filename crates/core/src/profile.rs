//! Device profile: account credentials plus the selected device identifier.

/// Sentinel value for [`DeviceProfile::device_id`] when no device is selected.
pub const NOT_SELECTED: &str = "not selected";

/// Minimum length of a real backend-issued device identifier.
///
/// Anything shorter is a placeholder and suppresses all status/metric reads.
pub const DEVICE_ID_MIN_LEN: usize = 30;

/// Mutable credential record owned by the session controller.
///
/// Cleared on logout, on controller teardown, and before completing a device
/// switch; never persisted beyond these fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    pub email: String,
    pub password: String,
    pub device_id: String,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            device_id: NOT_SELECTED.to_string(),
        }
    }
}

impl DeviceProfile {
    /// Resets every field, returning the profile to its logged-out shape.
    pub fn clear(&mut self) {
        self.email.clear();
        self.password.clear();
        self.device_id = NOT_SELECTED.to_string();
    }

    /// Drops the selected device while keeping credentials.
    pub fn clear_device(&mut self) {
        self.device_id = NOT_SELECTED.to_string();
    }

    /// Returns `true` when `device_id` looks like a real backend identifier.
    pub fn device_id_is_valid(&self) -> bool {
        self.device_id.len() >= DEVICE_ID_MIN_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_has_sentinel_device() {
        let profile = DeviceProfile::default();
        assert_eq!(profile.device_id, NOT_SELECTED);
        assert!(!profile.device_id_is_valid());
    }

    #[test]
    fn clear_resets_all_fields() {
        let mut profile = DeviceProfile {
            email: "a@b.com".into(),
            password: "pw".into(),
            device_id: "x".repeat(32),
        };
        assert!(profile.device_id_is_valid());

        profile.clear();
        assert_eq!(profile, DeviceProfile::default());
    }

    #[test]
    fn short_identifiers_are_invalid() {
        let mut profile = DeviceProfile::default();
        profile.device_id = "x".repeat(DEVICE_ID_MIN_LEN - 1);
        assert!(!profile.device_id_is_valid());

        profile.device_id = "x".repeat(DEVICE_ID_MIN_LEN);
        assert!(profile.device_id_is_valid());
    }
}
