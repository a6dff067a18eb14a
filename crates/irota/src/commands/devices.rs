//! Device listing handlers.

use tabled::Tabled;

use irota_core::{DeviceRecord, Engine};

use crate::cli::{DevicesArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Hardware ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Firmware")]
    firmware: String,
    #[tabled(rename = "Update")]
    update: String,
    #[tabled(rename = "OTA")]
    ota: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

impl DeviceRow {
    fn new(d: &DeviceRecord, color: bool) -> Self {
        Self {
            id: d.hardware_id.to_string(),
            name: d.display_name.clone(),
            ip: d.address.ip().to_string(),
            firmware: d.firmware_version.clone(),
            update: output::paint_update(d.available_update.as_deref(), color),
            ota: if d.ota_enabled { "on" } else { "off" }.into(),
            state: output::paint_state(d.update_state, color),
            last_seen: util::ago(d.last_seen),
        }
    }
}

fn detail(d: &DeviceRecord) -> String {
    let mut lines = vec![
        format!("Hardware ID: {}", d.hardware_id),
        format!("Name:        {}", d.display_name),
        format!("Address:     {}", d.address),
        format!("Firmware:    {}", d.firmware_version),
        format!(
            "Update:      {}",
            d.available_update.as_deref().unwrap_or("-")
        ),
        format!("OTA:         {}", if d.ota_enabled { "enabled" } else { "disabled" }),
        format!("State:       {}", d.update_state),
        format!("Last seen:   {} ({})", d.last_seen.to_rfc3339(), util::ago(d.last_seen)),
    ];
    if let Some(ref chip) = d.telemetry.chip_model {
        lines.push(format!("Chip:        {chip}"));
    }
    if let Some(heap) = d.telemetry.free_heap {
        lines.push(format!("Free heap:   {heap} bytes"));
    }
    if let Some(flash) = d.telemetry.flash_size {
        lines.push(format!("Flash:       {flash} bytes"));
    }
    lines.join("\n")
}

pub(crate) fn render_devices(engine: &Engine, global: &GlobalOpts) -> String {
    let color = output::should_color(&global.color);
    let devices = engine.devices();
    output::render_list(
        &global.output,
        devices.as_slice(),
        |d| DeviceRow::new(d, color),
        |d| d.hardware_id.to_string(),
    )
}

// ── Handlers ────────────────────────────────────────────────────────

/// `irota discover`
pub async fn discover(engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    let report = util::discover(engine, global).await;
    if !global.quiet {
        eprintln!(
            "Probed {} address(es): {} device(s) found, {} new",
            report.probed,
            report.found.len(),
            report.new.len()
        );
    }
    output::print_output(&render_devices(engine, global), global.quiet);
    Ok(())
}

/// `irota devices [DEVICE]`
pub async fn handle(engine: &Engine, args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::discover(engine, global).await;
    if let Err(e) = engine.refresh().await {
        if !global.quiet {
            eprintln!("warning: firmware check failed: {e}");
        }
    }

    match args.device {
        Some(query) => {
            let id = util::resolve_device(engine, &query)?;
            let record = engine.device(&id).ok_or_else(|| CliError::NotFound {
                resource_type: "device".into(),
                identifier: query,
                list_command: "devices".into(),
            })?;
            let out = output::render_single(&global.output, &record, detail, |d| {
                d.hardware_id.to_string()
            });
            output::print_output(&out, global.quiet);
        }
        None => output::print_output(&render_devices(engine, global), global.quiet),
    }
    Ok(())
}
