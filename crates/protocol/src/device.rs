//! Device records returned by account-level listing.

use serde::{Deserialize, Serialize};

/// One registered device, as returned in bulk by the account listing.
///
/// Used to resolve a human-chosen nickname to the opaque backend identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Opaque, backend-issued identifier uniquely naming the device.
    pub device_id: String,
    /// User-facing nickname chosen at registration time.
    pub device_nickname: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_info_parses_backend_listing() {
        let json = r#"[{"deviceId": "8e3b7f0a2c9d4e5f6a7b8c9d0e1f2a3b", "deviceNickname": "Crown1"}]"#;
        let devices: Vec<DeviceInfo> = serde_json::from_str(json).unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].device_nickname, "Crown1");
        assert_eq!(devices[0].device_id.len(), 32);
    }
}
