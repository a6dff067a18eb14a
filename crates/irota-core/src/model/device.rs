// ── Device record ──
//
// One entry per physical device. Identity is the hardware id; the socket
// address is rewritten in place whenever the device turns up at a new IP.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use irota_api::DeviceStatus;
use serde::{Deserialize, Serialize};

use super::hardware_id::HardwareId;
use super::update_state::UpdateState;

pub const UNKNOWN_VERSION: &str = "unknown";

/// Informational counters. A field missing from a poll keeps its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telemetry {
    pub free_heap: Option<u64>,
    pub flash_size: Option<u64>,
    pub chip_model: Option<String>,
}

impl Telemetry {
    fn merge(&mut self, status: &DeviceStatus) {
        self.free_heap = status.free_heap.or(self.free_heap);
        self.flash_size = status.flash_size.or(self.flash_size);
        if let Some(chip) = &status.chip_model {
            self.chip_model = Some(chip.clone());
        }
    }
}

impl From<&DeviceStatus> for Telemetry {
    fn from(status: &DeviceStatus) -> Self {
        Self {
            free_heap: status.free_heap,
            flash_size: status.flash_size,
            chip_model: status.chip_model.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub hardware_id: HardwareId,
    pub address: SocketAddr,
    pub display_name: String,
    pub firmware_version: String,
    pub telemetry: Telemetry,
    pub last_seen: DateTime<Utc>,
    pub ota_enabled: bool,
    pub update_state: UpdateState,
    pub available_update: Option<String>,
}

impl DeviceRecord {
    /// Build a fresh record from a status payload received just now.
    pub fn from_status(hardware_id: HardwareId, address: SocketAddr, status: &DeviceStatus) -> Self {
        let display_name = status
            .hostname
            .clone()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| default_display_name(&hardware_id));

        Self {
            display_name,
            address,
            firmware_version: status
                .version
                .clone()
                .unwrap_or_else(|| UNKNOWN_VERSION.into()),
            telemetry: Telemetry::from(status),
            last_seen: Utc::now(),
            ota_enabled: false,
            update_state: UpdateState::Idle,
            available_update: None,
            hardware_id,
        }
    }

    /// Fold a fresh status payload into the record.
    ///
    /// Only reported fields overwrite; anything the payload omits keeps its
    /// previous value.
    pub fn apply_status(&mut self, address: SocketAddr, status: &DeviceStatus) {
        self.address = address;
        if let Some(hostname) = status.hostname.as_ref().filter(|h| !h.trim().is_empty()) {
            self.display_name.clone_from(hostname);
        }
        if let Some(version) = &status.version {
            self.firmware_version.clone_from(version);
        }
        self.telemetry.merge(status);
        self.last_seen = Utc::now();
    }

    /// Online while the last status answer is younger than `window`.
    pub fn is_online(&self, window: Duration) -> bool {
        self.is_online_at(Utc::now(), window)
    }

    pub fn is_online_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let Ok(window) = chrono::Duration::from_std(window) else {
            return true;
        };
        now.signed_duration_since(self.last_seen) < window
    }
}

pub fn default_display_name(id: &HardwareId) -> String {
    format!("IR-Remote-Mini-{}", id.suffix())
}
