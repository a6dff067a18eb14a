// ── Runtime engine configuration ──
//
// Describes what the engine scans, where firmware comes from and how long
// each step may take. Never touches disk: irota-config (or a test) builds
// an `EngineConfig` and hands it to `Engine::new`.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

pub const DEFAULT_DEVICE_TYPE: &str = "mini";
pub const DEFAULT_MDNS_SERVICE: &str = "_http._tcp.local.";
pub const DEFAULT_MDNS_PREFIX: &str = "IR-Remote-Mini";
pub const DEFAULT_NETWORK_RANGE: &str = "192.168.1.0/24";
pub const DEFAULT_FIRMWARE_DIR: &str = "/config/ir_remote_firmware/";
pub const DEFAULT_REPO_PATH: &str = "firmware";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Where firmware images are resolved from.
#[derive(Debug, Clone, Default)]
pub enum FirmwareSourceConfig {
    /// Scan the firmware directory only.
    #[default]
    Local,
    /// List and download `.bin` files from a repository contents API.
    Remote {
        /// `owner/name`
        repo: String,
        /// Directory inside the repository.
        path: String,
        token: Option<SecretString>,
        api_base: Url,
    },
}

impl FirmwareSourceConfig {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

/// Step budgets and pacing. Tests shrink the delays to zero.
#[derive(Debug, Clone)]
pub struct Timings {
    /// Status probes and OTA toggles.
    pub device_timeout: Duration,
    /// Repository listing and metadata calls.
    pub repo_timeout: Duration,
    /// Streamed firmware downloads.
    pub download_timeout: Duration,
    /// Multipart firmware upload.
    pub upload_timeout: Duration,
    /// How long passive discovery listens for advertisements.
    pub discovery_window: Duration,
    /// Concurrent probes per active-scan batch.
    pub probe_batch: usize,
    /// Wait after a successful upload before re-polling the device.
    pub settle_delay: Duration,
    /// Pause between devices in a batch update.
    pub inter_device_pause: Duration,
    /// Freshness window of the remote listing cache.
    pub cache_ttl: Duration,
    /// A device is online while its last status is younger than this.
    pub online_window: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            device_timeout: Duration::from_secs(10),
            repo_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(90),
            upload_timeout: Duration::from_secs(300),
            discovery_window: Duration::from_secs(5),
            probe_batch: 20,
            settle_delay: Duration::from_secs(10),
            inter_device_pause: Duration::from_secs(2),
            cache_ttl: Duration::from_secs(5 * 60),
            online_window: Duration::from_secs(10 * 60),
        }
    }
}

/// Configuration for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// HTTP port devices listen on.
    pub device_port: u16,
    /// Required `deviceType` in `/api/status`.
    pub device_type: String,
    /// mDNS service type browsed during passive discovery.
    pub mdns_service: String,
    /// Case-insensitive instance-name prefix of our devices.
    pub mdns_prefix: String,
    /// IPv4 CIDR scanned during active discovery.
    pub network_range: String,
    /// Listen for mDNS advertisements before scanning.
    pub auto_discovery: bool,
    /// Local firmware directory (scanned, and the download target).
    pub firmware_dir: PathBuf,
    pub source: FirmwareSourceConfig,
    /// Download missing remote firmware into `firmware_dir`.
    pub auto_download: bool,
    /// Hardware ids skipped by batch updates.
    pub exclude: Vec<String>,
    /// Discovery cadence of the background loop.
    pub scan_interval: Duration,
    /// Refresh + update-check cadence of the background loop.
    pub check_interval: Duration,
    pub timings: Timings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device_port: 80,
            device_type: DEFAULT_DEVICE_TYPE.into(),
            mdns_service: DEFAULT_MDNS_SERVICE.into(),
            mdns_prefix: DEFAULT_MDNS_PREFIX.into(),
            network_range: DEFAULT_NETWORK_RANGE.into(),
            auto_discovery: true,
            firmware_dir: PathBuf::from(DEFAULT_FIRMWARE_DIR),
            source: FirmwareSourceConfig::Local,
            auto_download: true,
            exclude: Vec::new(),
            scan_interval: Duration::from_secs(300),
            check_interval: Duration::from_secs(3600),
            timings: Timings::default(),
        }
    }
}
