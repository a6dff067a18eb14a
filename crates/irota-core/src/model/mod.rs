// ── Domain model ──
//
// Canonical types shared by discovery, polling, the orchestrator and hosts.

pub mod catalog;
pub mod device;
pub mod hardware_id;
pub mod update_state;

pub use catalog::{FirmwareCatalog, FirmwareLocator};
pub use device::{DeviceRecord, Telemetry};
pub use hardware_id::HardwareId;
pub use update_state::UpdateState;
