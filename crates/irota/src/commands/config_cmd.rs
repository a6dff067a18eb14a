//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Select};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of the config with the plaintext token masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    if cfg.firmware.token.is_some() {
        cfg.firmware.token = Some("****".into());
    }
    cfg
}

/// TOML text of the redacted config.
fn format_config(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("# failed to render config: {e}"))
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn store_token(repo: &str, token: &str) -> Result<(), CliError> {
    if token.is_empty() {
        return Err(CliError::Validation {
            field: "token".into(),
            reason: "token cannot be empty".into(),
        });
    }
    config::store_token(repo, token)?;
    eprintln!("   ✓ Token for {repo} stored in system keyring");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let path = config::active_config_path(global);
            eprintln!("irota -- configuration wizard");
            eprintln!("   Config path: {}\n", path.display());

            let mut cfg = Config::default();

            // 1. Network
            cfg.discovery.network_range = Input::new()
                .with_prompt("Network range to scan")
                .default(cfg.discovery.network_range.clone())
                .interact_text()
                .map_err(prompt_err)?;

            // 2. Firmware directory
            let dir: String = Input::new()
                .with_prompt("Firmware directory")
                .default(cfg.firmware.dir.display().to_string())
                .interact_text()
                .map_err(prompt_err)?;
            cfg.firmware.dir = dir.into();

            // 3. Source
            let source = Select::new()
                .with_prompt("Firmware source")
                .items(&["Local directory only", "Remote repository"])
                .default(0)
                .interact()
                .map_err(prompt_err)?;

            if source == 1 {
                cfg.firmware.source = "remote".into();
                let repo: String = Input::new()
                    .with_prompt("Repository (owner/name)")
                    .interact_text()
                    .map_err(prompt_err)?;
                cfg.firmware.path = Input::new()
                    .with_prompt("Path inside the repository")
                    .default(cfg.firmware.path.clone())
                    .interact_text()
                    .map_err(prompt_err)?;

                let private = Confirm::new()
                    .with_prompt("Is the repository private?")
                    .default(false)
                    .interact()
                    .map_err(prompt_err)?;
                if private {
                    let token = rpassword::prompt_password("Access token: ").map_err(prompt_err)?;
                    store_token(&repo, &token)?;
                }
                cfg.firmware.repo = Some(repo);
            }

            // 4. Validate before writing
            config::to_engine_config(&cfg)?;
            config::save_config_to(&cfg, &path)?;

            eprintln!("\n✓ Configuration written to {}", path.display());
            eprintln!("\n  Test it: irota discover");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::resolve(global)?);
            let out = output::render_single(&global.output, &cfg, format_config, |_| {
                config::active_config_path(global).display().to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::active_config_path(global).display());
            Ok(())
        }

        // ── Set-token ───────────────────────────────────────────────
        ConfigCommand::SetToken { repo } => {
            let repo = match repo {
                Some(repo) => repo,
                None => config::resolve(global)?
                    .firmware
                    .repo
                    .ok_or_else(|| CliError::Validation {
                        field: "repo".into(),
                        reason: "no repository configured; pass --repo owner/name".into(),
                    })?,
            };
            let token = rpassword::prompt_password(format!("Token for {repo}: "))
                .map_err(prompt_err)?;
            store_token(&repo, &token)
        }
    }
}
