//! Configuration for the irota CLI.
//!
//! One TOML file plus `IROTA_`-prefixed environment overrides, repository
//! token resolution (env var, keyring, plaintext), and translation to
//! `irota_core::EngineConfig`. The CLI layers its global flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use irota_core::config::{
    DEFAULT_API_BASE, DEFAULT_DEVICE_TYPE, DEFAULT_FIRMWARE_DIR, DEFAULT_MDNS_PREFIX,
    DEFAULT_MDNS_SERVICE, DEFAULT_NETWORK_RANGE, DEFAULT_REPO_PATH,
};
use irota_core::discovery::scan::validate_scan_range;
use irota_core::{EngineConfig, FirmwareSourceConfig, Timings, TlsMode, TransportConfig};

/// Keyring service name; entries are keyed by `owner/name`.
pub const KEYRING_SERVICE: &str = "irota";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub discovery: DiscoverySettings,

    #[serde(default)]
    pub firmware: FirmwareSettings,

    #[serde(default)]
    pub schedule: Schedule,
}

/// Output and per-request defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Device request timeout in seconds.
    #[serde(default = "default_device_timeout")]
    pub device_timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            device_timeout: default_device_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_device_timeout() -> u64 {
    10
}

/// Where and how devices are found.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DiscoverySettings {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_device_type")]
    pub device_type: String,

    #[serde(default = "default_mdns_service")]
    pub mdns_service: String,

    #[serde(default = "default_mdns_prefix")]
    pub mdns_prefix: String,

    /// IPv4 CIDR scanned after mDNS.
    #[serde(default = "default_network_range")]
    pub network_range: String,

    /// Listen for mDNS advertisements before scanning.
    #[serde(default = "default_true")]
    pub auto_discovery: bool,

    /// Hardware ids never touched by `update-all`.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            device_type: default_device_type(),
            mdns_service: default_mdns_service(),
            mdns_prefix: default_mdns_prefix(),
            network_range: default_network_range(),
            auto_discovery: true,
            exclude: Vec::new(),
        }
    }
}

fn default_port() -> u16 {
    80
}
fn default_device_type() -> String {
    DEFAULT_DEVICE_TYPE.into()
}
fn default_mdns_service() -> String {
    DEFAULT_MDNS_SERVICE.into()
}
fn default_mdns_prefix() -> String {
    DEFAULT_MDNS_PREFIX.into()
}
fn default_network_range() -> String {
    DEFAULT_NETWORK_RANGE.into()
}
fn default_true() -> bool {
    true
}

/// Firmware directory and source.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FirmwareSettings {
    #[serde(default = "default_firmware_dir")]
    pub dir: PathBuf,

    /// Source mode: "local" or "remote".
    #[serde(default = "default_source")]
    pub source: String,

    /// Repository as `owner/name` (remote only).
    pub repo: Option<String>,

    /// Directory inside the repository.
    #[serde(default = "default_repo_path")]
    pub path: String,

    /// Contents API base URL. Defaults to the public GitHub API.
    pub api_base: Option<String>,

    /// Repository token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the token.
    pub token_env: Option<String>,

    /// Download missing remote firmware into `dir`.
    #[serde(default = "default_true")]
    pub auto_download: bool,

    /// Path to a custom CA certificate for the repository API.
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid repository certificates.
    #[serde(default)]
    pub insecure: bool,
}

impl Default for FirmwareSettings {
    fn default() -> Self {
        Self {
            dir: default_firmware_dir(),
            source: default_source(),
            repo: None,
            path: default_repo_path(),
            api_base: None,
            token: None,
            token_env: None,
            auto_download: true,
            ca_cert: None,
            insecure: false,
        }
    }
}

fn default_firmware_dir() -> PathBuf {
    PathBuf::from(DEFAULT_FIRMWARE_DIR)
}
fn default_source() -> String {
    "local".into()
}
fn default_repo_path() -> String {
    DEFAULT_REPO_PATH.into()
}

/// Background loop cadence, in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Schedule {
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            scan_interval: default_scan_interval(),
            check_interval: default_check_interval(),
        }
    }
}

fn default_scan_interval() -> u64 {
    300
}
fn default_check_interval() -> u64 {
    3600
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "irota", "irota").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("irota");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Nested keys use a double underscore: `IROTA_FIRMWARE__REPO`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("IROTA_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Resolve the repository token: `token_env`, then the keyring entry
/// `irota/<repo>`, then the plaintext `token`. `None` means anonymous.
pub fn resolve_token(firmware: &FirmwareSettings) -> Option<SecretString> {
    // 1. Configured env var
    if let Some(ref env_name) = firmware.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Some(ref repo) = firmware.repo {
        if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, repo) {
            if let Ok(secret) = entry.get_password() {
                return Some(SecretString::from(secret));
            }
        }
    }

    // 3. Plaintext in config
    firmware.token.clone().map(SecretString::from)
}

/// Store a repository token in the system keyring.
pub fn store_token(repo: &str, token: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, repo)
        .and_then(|entry| entry.set_password(token))
        .map_err(|e| ConfigError::Validation {
            field: "token".into(),
            reason: format!("keyring write failed: {e}"),
        })
}

// ── Translation ─────────────────────────────────────────────────────

fn source_config(firmware: &FirmwareSettings) -> Result<FirmwareSourceConfig, ConfigError> {
    match firmware.source.as_str() {
        "local" => Ok(FirmwareSourceConfig::Local),
        "remote" => {
            let repo = firmware
                .repo
                .clone()
                .filter(|r| is_repo_slug(r))
                .ok_or_else(|| ConfigError::Validation {
                    field: "firmware.repo".into(),
                    reason: "remote source needs a repository as 'owner/name'".into(),
                })?;
            let raw_base = firmware.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
            let api_base: url::Url = raw_base.parse().map_err(|_| ConfigError::Validation {
                field: "firmware.api_base".into(),
                reason: format!("invalid URL: {raw_base}"),
            })?;
            Ok(FirmwareSourceConfig::Remote {
                repo,
                path: firmware.path.clone(),
                token: resolve_token(firmware),
                api_base,
            })
        }
        other => Err(ConfigError::Validation {
            field: "firmware.source".into(),
            reason: format!("expected 'local' or 'remote', got '{other}'"),
        }),
    }
}

fn is_repo_slug(repo: &str) -> bool {
    matches!(repo.split_once('/'), Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/'))
}

/// Build the engine configuration, validating ranges and the source.
pub fn to_engine_config(cfg: &Config) -> Result<EngineConfig, ConfigError> {
    validate_scan_range(&cfg.discovery.network_range).map_err(|e| ConfigError::Validation {
        field: "discovery.network_range".into(),
        reason: e.to_string(),
    })?;

    let timings = Timings {
        device_timeout: Duration::from_secs(cfg.defaults.device_timeout),
        ..Timings::default()
    };

    Ok(EngineConfig {
        device_port: cfg.discovery.port,
        device_type: cfg.discovery.device_type.clone(),
        mdns_service: cfg.discovery.mdns_service.clone(),
        mdns_prefix: cfg.discovery.mdns_prefix.clone(),
        network_range: cfg.discovery.network_range.clone(),
        auto_discovery: cfg.discovery.auto_discovery,
        firmware_dir: cfg.firmware.dir.clone(),
        source: source_config(&cfg.firmware)?,
        auto_download: cfg.firmware.auto_download,
        exclude: cfg.discovery.exclude.clone(),
        scan_interval: Duration::from_secs(cfg.schedule.scan_interval),
        check_interval: Duration::from_secs(cfg.schedule.check_interval),
        timings,
    })
}

/// TLS settings for the repository client.
pub fn transport_config(cfg: &Config) -> TransportConfig {
    let tls = if cfg.firmware.insecure {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = cfg.firmware.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };
    TransportConfig {
        tls,
        ..TransportConfig::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    #[test]
    fn defaults_translate() {
        let engine = to_engine_config(&Config::default()).unwrap();
        assert_eq!(engine.device_port, 80);
        assert_eq!(engine.device_type, "mini");
        assert!(!engine.source.is_remote());
        assert_eq!(engine.scan_interval, Duration::from_secs(300));
        assert_eq!(engine.check_interval, Duration::from_secs(3600));
        assert_eq!(engine.timings.device_timeout, Duration::from_secs(10));
    }

    #[test]
    fn file_and_env_are_merged() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [discovery]
                network_range = "10.1.0.0/24"
                exclude = ["aa:bb:cc:dd:ee:ff"]

                [firmware]
                source = "remote"
                repo = "acme/ir-firmware"
                "#,
            )?;
            jail.set_env("IROTA_FIRMWARE__PATH", "builds/mini");
            jail.set_env("IROTA_SCHEDULE__SCAN_INTERVAL", "60");

            let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.discovery.network_range, "10.1.0.0/24");
            assert_eq!(cfg.discovery.port, 80);
            assert_eq!(cfg.firmware.path, "builds/mini");
            assert_eq!(cfg.schedule.scan_interval, 60);
            assert_eq!(cfg.discovery.exclude, vec!["aa:bb:cc:dd:ee:ff".to_string()]);
            Ok(())
        });
    }

    #[test]
    fn missing_file_gives_defaults() {
        Jail::expect_with(|_| {
            let cfg = load_config_from(Path::new("absent.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg, Config::default());
            Ok(())
        });
    }

    #[test]
    fn token_env_wins_over_plaintext() {
        Jail::expect_with(|jail| {
            jail.set_env("IROTA_TEST_FW_TOKEN", "from-env");
            let firmware = FirmwareSettings {
                token_env: Some("IROTA_TEST_FW_TOKEN".into()),
                token: Some("plain".into()),
                ..FirmwareSettings::default()
            };
            let token = resolve_token(&firmware).unwrap();
            assert_eq!(token.expose_secret(), "from-env");
            Ok(())
        });
    }

    #[test]
    fn plaintext_token_is_last_resort() {
        let firmware = FirmwareSettings {
            token: Some("plain".into()),
            ..FirmwareSettings::default()
        };
        assert_eq!(resolve_token(&firmware).unwrap().expose_secret(), "plain");
        assert!(resolve_token(&FirmwareSettings::default()).is_none());
    }

    #[test]
    fn remote_source_requires_repo_slug() {
        let mut cfg = Config::default();
        cfg.firmware.source = "remote".into();
        assert!(matches!(
            to_engine_config(&cfg),
            Err(ConfigError::Validation { ref field, .. }) if field == "firmware.repo"
        ));

        cfg.firmware.repo = Some("acme/ir-firmware".into());
        let engine = to_engine_config(&cfg).unwrap();
        match engine.source {
            FirmwareSourceConfig::Remote { repo, path, api_base, .. } => {
                assert_eq!(repo, "acme/ir-firmware");
                assert_eq!(path, "firmware");
                assert_eq!(api_base.as_str(), "https://api.github.com/");
            }
            FirmwareSourceConfig::Local => panic!("expected remote source"),
        }
    }

    #[test]
    fn unknown_source_and_bad_range_are_rejected() {
        let mut cfg = Config::default();
        cfg.firmware.source = "ftp".into();
        assert!(to_engine_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.discovery.network_range = "not-a-range".into();
        assert!(matches!(
            to_engine_config(&cfg),
            Err(ConfigError::Validation { ref field, .. }) if field == "discovery.network_range"
        ));
    }

    #[test]
    fn overly_wide_range_is_rejected() {
        let mut cfg = Config::default();
        cfg.discovery.network_range = "0.0.0.0/0".into();
        let err = to_engine_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("too wide"), "got {err}");

        cfg.discovery.network_range = "10.20.0.0/16".into();
        assert!(to_engine_config(&cfg).is_ok());
    }

    #[test]
    fn repo_slug_shapes() {
        assert!(is_repo_slug("acme/fw"));
        assert!(!is_repo_slug("acme"));
        assert!(!is_repo_slug("/fw"));
        assert!(!is_repo_slug("a/b/c"));
    }

    #[test]
    fn transport_prefers_insecure_over_ca() {
        let mut cfg = Config::default();
        assert!(matches!(transport_config(&cfg).tls, TlsMode::System));
        cfg.firmware.ca_cert = Some("/etc/ca.pem".into());
        assert!(matches!(transport_config(&cfg).tls, TlsMode::CustomCa(_)));
        cfg.firmware.insecure = true;
        assert!(matches!(transport_config(&cfg).tls, TlsMode::DangerAcceptInvalid));
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let mut cfg = Config::default();
        cfg.firmware.repo = Some("acme/fw".into());
        cfg.discovery.auto_discovery = false;

        save_config_to(&cfg, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
