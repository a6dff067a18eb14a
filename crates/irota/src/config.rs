//! CLI configuration -- thin wrapper around `irota_config`.
//!
//! Adds `GlobalOpts`-aware resolution: `--config` selects the file and
//! `--network`, `--firmware-dir`, `--no-mdns` and `--timeout` override it.

use std::path::PathBuf;

use irota_core::Engine;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use irota_config::{
    Config, config_path, load_config_from, save_config_to, store_token, to_engine_config,
    transport_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// `--config` if given, else the platform default.
pub fn active_config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load the config file and apply flag overrides.
pub fn resolve(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = load_config_from(&active_config_path(global))?;
    apply_overrides(&mut cfg, global);
    Ok(cfg)
}

/// CLI flags take priority over file and environment values.
pub fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref network) = global.network {
        cfg.discovery.network_range.clone_from(network);
    }
    if let Some(ref dir) = global.firmware_dir {
        cfg.firmware.dir.clone_from(dir);
    }
    if global.no_mdns {
        cfg.discovery.auto_discovery = false;
    }
    if let Some(timeout) = global.timeout {
        cfg.defaults.device_timeout = timeout;
    }
}

/// Build an engine from the resolved configuration.
pub fn build_engine(global: &GlobalOpts) -> Result<Engine, CliError> {
    let cfg = resolve(global)?;
    let engine_config = to_engine_config(&cfg)?;
    Ok(Engine::with_transport(engine_config, &transport_config(&cfg))?)
}
