//! Command dispatch: bridges CLI args -> engine calls -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod firmware;
pub mod update;
pub mod util;
pub mod watch;

use irota_core::Engine;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an engine-bound command to its handler.
pub async fn dispatch(cmd: Command, engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Discover => devices::discover(engine, global).await,
        Command::Devices(args) => devices::handle(engine, args, global).await,
        Command::Check => firmware::check(engine, global).await,
        Command::Update(args) => update::update_one(engine, args, global).await,
        Command::UpdateAll(args) => update::update_all(engine, args, global).await,
        Command::Ota(args) => update::ota(engine, args, global).await,
        Command::Firmware(args) => firmware::handle(engine, args, global).await,
        Command::Watch => watch::handle(engine, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are handled before dispatch".into(),
        )),
    }
}
