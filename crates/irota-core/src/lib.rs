//! Discovery, firmware resolution and OTA update orchestration for IR
//! remote devices.
//!
//! - **[`Engine`]** owns the device table, the firmware catalog and the
//!   notification hub, and exposes the host-facing operations: discover,
//!   refresh, check for updates, toggle OTA, update one or all devices,
//!   plus a background [`run`](Engine::run) loop.
//!
//! - **[`DeviceStore`]** is a `DashMap`-backed table keyed by
//!   [`HardwareId`] with a `watch` snapshot for hosts.
//!
//! - **[`FirmwareSource`]** resolves versions from a local directory or a
//!   remote repository (cached listing, verified downloads).
//!
//! - **[`Notifications`]** keeps one notification per key and broadcasts
//!   every emission.

pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod firmware;
pub mod model;
pub mod notify;
pub mod orchestrator;
pub mod poller;
pub mod store;
pub mod version;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{EngineConfig, FirmwareSourceConfig, Timings};
pub use discovery::DiscoveryReport;
pub use engine::Engine;
pub use error::CoreError;
pub use firmware::{FirmwareSource, LocalDirectory, RemoteRepository, SyncReport};
pub use irota_api::{TlsMode, TransportConfig};
pub use model::{
    DeviceRecord, FirmwareCatalog, FirmwareLocator, HardwareId, Telemetry, UpdateState,
};
pub use notify::{Notification, NotificationKind, Notifications};
pub use poller::RefreshSummary;
pub use store::DeviceStore;
