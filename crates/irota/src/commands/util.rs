//! Shared helpers for command handlers.

use std::io::{IsTerminal, stderr, stdin};
use std::time::Duration;

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use irota_core::{DiscoveryReport, Engine, HardwareId};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Resolve a device by hardware id, IP address or name.
pub fn resolve_device(engine: &Engine, query: &str) -> Result<HardwareId, CliError> {
    engine.resolve_device(query).ok_or_else(|| CliError::NotFound {
        resource_type: "device".into(),
        identifier: query.into(),
        list_command: "devices".into(),
    })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Spinner on stderr for interactive, non-quiet runs.
pub fn spinner(message: &str, global: &GlobalOpts) -> Option<ProgressBar> {
    if global.quiet || !stderr().is_terminal() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_owned());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

pub fn finish(pb: Option<ProgressBar>) {
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
}

/// Run one discovery pass behind a spinner.
pub async fn discover(engine: &Engine, global: &GlobalOpts) -> DiscoveryReport {
    let pb = spinner("Discovering devices...", global);
    let report = engine.discover_devices().await.unwrap_or_default();
    finish(pb);
    report
}

/// Discovery followed by an update check. A failing check is reported
/// but does not abort the command.
pub async fn discover_and_check(engine: &Engine, global: &GlobalOpts) -> Option<String> {
    discover(engine, global).await;
    let pb = spinner("Checking firmware...", global);
    let latest = engine.check_firmware_updates().await;
    finish(pb);
    match latest {
        Ok(latest) => latest,
        Err(e) => {
            if !global.quiet {
                eprintln!("warning: firmware check failed: {e}");
            }
            None
        }
    }
}

/// Human-readable age, e.g. `3m 12s ago`.
pub fn ago(at: DateTime<Utc>) -> String {
    let secs = Utc::now().signed_duration_since(at).num_seconds().max(0);
    let secs = u64::try_from(secs).unwrap_or_default();
    format!("{} ago", humantime::format_duration(Duration::from_secs(secs)))
}
