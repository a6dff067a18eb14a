// Device response types
//
// Every field is optional on the wire: older firmware builds omit
// telemetry, and probes against foreign HTTP servers must still parse far
// enough for the caller to reject them by `deviceType`.

use serde::{Deserialize, Serialize};

/// Body of `GET /api/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub free_heap: Option<u64>,
    #[serde(default)]
    pub flash_size: Option<u64>,
    #[serde(default)]
    pub chip_model: Option<String>,
}

/// Body of `GET /api/ota/status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtaStatus {
    #[serde(default)]
    pub enabled: bool,
}
