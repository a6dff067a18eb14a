//! Update and OTA toggle handlers.

use serde::Serialize;
use tabled::Tabled;

use irota_core::{Engine, HardwareId};

use crate::cli::{GlobalOpts, OtaArgs, OtaCommand, UpdateAllArgs, UpdateArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Clone, Serialize, Tabled)]
struct ResultRow {
    #[tabled(rename = "Hardware ID")]
    hardware_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Firmware")]
    firmware: String,
    #[tabled(rename = "Result")]
    result: String,
}

/// `irota update <device>`
pub async fn update_one(engine: &Engine, args: UpdateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::discover_and_check(engine, global).await;
    let id = util::resolve_device(engine, &args.device)?;
    let name = engine
        .device(&id)
        .map_or_else(|| id.to_string(), |d| d.display_name);

    if !util::confirm(&format!("Flash new firmware to {name}?"), global.yes)? {
        return Ok(());
    }

    let pb = util::spinner(&format!("Updating {name}..."), global);
    let result = engine.update_device(&id, args.firmware.as_deref()).await;
    util::finish(pb);
    result?;

    if !global.quiet {
        let version = engine
            .device(&id)
            .map(|d| d.firmware_version)
            .unwrap_or_default();
        eprintln!("Updated {name} (running {version})");
    }
    Ok(())
}

/// `irota update-all`
pub async fn update_all(
    engine: &Engine,
    args: UpdateAllArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::discover_and_check(engine, global).await;
    let exclude: Vec<HardwareId> = args.exclude.iter().map(HardwareId::new).collect();

    let configured: Vec<HardwareId> = engine.config().exclude.iter().map(HardwareId::new).collect();

    let pending = engine
        .devices()
        .iter()
        .filter(|d| !exclude.contains(&d.hardware_id) && !configured.contains(&d.hardware_id))
        .filter(|d| args.firmware.is_some() || d.available_update.is_some())
        .count();
    if pending == 0 {
        if !global.quiet {
            eprintln!("No devices need an update");
        }
        return Ok(());
    }
    if !util::confirm(&format!("Flash new firmware to {pending} device(s)?"), global.yes)? {
        return Ok(());
    }

    let pb = util::spinner("Updating devices...", global);
    let results = engine
        .update_all_devices(args.firmware.as_deref(), &exclude)
        .await;
    util::finish(pb);

    let rows: Vec<ResultRow> = results
        .iter()
        .map(|(id, ok)| {
            let record = engine.device(id);
            ResultRow {
                hardware_id: id.to_string(),
                name: record
                    .as_ref()
                    .map_or_else(|| id.to_string(), |d| d.display_name.clone()),
                firmware: record.map(|d| d.firmware_version).unwrap_or_default(),
                result: if *ok { "success" } else { "failed" }.into(),
            }
        })
        .collect();
    let out = output::render_list(&global.output, &rows, Clone::clone, |r| {
        format!("{} {}", r.hardware_id, r.result)
    });
    output::print_output(&out, global.quiet);

    let succeeded = results.values().filter(|ok| **ok).count();
    if !global.quiet {
        eprintln!("{succeeded}/{} successful", results.len());
    }
    if succeeded < results.len() {
        return Err(CliError::BatchFailed {
            failed: results.len() - succeeded,
            attempted: results.len(),
        });
    }
    Ok(())
}

/// `irota ota enable|disable <device>`
pub async fn ota(engine: &Engine, args: OtaArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::discover(engine, global).await;
    let (query, enable) = match args.command {
        OtaCommand::Enable { device } => (device, true),
        OtaCommand::Disable { device } => (device, false),
    };
    let id = util::resolve_device(engine, &query)?;

    let ok = if enable {
        engine.enable_ota(&id).await
    } else {
        engine.disable_ota(&id).await
    };
    let action = if enable { "enable" } else { "disable" };
    if !ok {
        return Err(CliError::OtaFailed {
            identifier: query,
            action: action.into(),
        });
    }
    if !global.quiet {
        eprintln!("OTA {action}d on {query}");
    }
    Ok(())
}
