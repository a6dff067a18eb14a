//! Firmware source and update-check handlers.

use serde::Serialize;
use tabled::Tabled;

use irota_core::{Engine, FirmwareCatalog, FirmwareLocator, SyncReport};

use crate::cli::{FirmwareArgs, FirmwareCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Tabled)]
struct FirmwareRow {
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Latest")]
    latest: bool,
    #[tabled(rename = "Location")]
    location: String,
}

fn rows(catalog: &FirmwareCatalog) -> Vec<FirmwareRow> {
    catalog
        .sorted_versions()
        .into_iter()
        .filter_map(|v| {
            catalog.get(v).map(|locator| FirmwareRow {
                version: v.to_owned(),
                latest: catalog.latest.as_deref() == Some(v),
                location: match locator {
                    FirmwareLocator::Local { path } => path.display().to_string(),
                    FirmwareLocator::Remote { download_url, .. } => download_url.clone(),
                },
            })
        })
        .collect()
}

fn print_catalog(catalog: &FirmwareCatalog, global: &GlobalOpts) {
    let out = output::render_list(&global.output, &rows(catalog), Clone::clone, |r| {
        r.version.clone()
    });
    output::print_output(&out, global.quiet);
}

fn report_sync(report: &SyncReport, global: &GlobalOpts) {
    if global.quiet {
        return;
    }
    if !report.pending.is_empty() {
        eprintln!("Not downloaded: {}", report.pending.join(", "));
    }
    if !report.failed.is_empty() {
        eprintln!("Download failed: {}", report.failed.join(", "));
    }
}

// ── Handlers ────────────────────────────────────────────────────────

/// `irota check`
pub async fn check(engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    util::discover(engine, global).await;
    let latest = engine.check_firmware_updates().await?;

    if !global.quiet {
        match latest {
            Some(ref v) => eprintln!("Latest firmware: {v}"),
            None => eprintln!("No firmware found"),
        }
        let pending = engine
            .devices()
            .iter()
            .filter(|d| d.available_update.is_some())
            .count();
        eprintln!("{pending} device(s) can be updated");
    }
    output::print_output(&super::devices::render_devices(engine, global), global.quiet);
    Ok(())
}

pub async fn handle(engine: &Engine, args: FirmwareArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        FirmwareCommand::List => {
            engine.check_firmware_updates().await?;
            print_catalog(&engine.catalog(), global);
            Ok(())
        }

        FirmwareCommand::Sync => {
            let pb = util::spinner("Synchronizing firmware...", global);
            let result = engine.sync_firmware().await;
            util::finish(pb);
            result?;

            let report = engine
                .source()
                .sync(&engine.config().firmware_dir, false)
                .await?;
            report_sync(&report, global);
            print_catalog(&engine.catalog(), global);
            Ok(())
        }

        FirmwareCommand::Repo => {
            let info = engine.repository_info().await?;
            let out = output::render_single(
                &global.output,
                &info,
                |i| {
                    [
                        format!("Repository: {}", i.full_name),
                        format!("Private:    {}", i.private),
                        format!("Branch:     {}", i.default_branch.as_deref().unwrap_or("-")),
                        format!("URL:        {}", i.html_url.as_deref().unwrap_or("-")),
                        format!("Pushed:     {}", i.pushed_at.as_deref().unwrap_or("-")),
                    ]
                    .join("\n")
                },
                |i| i.full_name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
