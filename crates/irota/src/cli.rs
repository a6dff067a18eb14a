//! Clap derive structures for the `irota` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// irota -- over-the-air firmware updates for IR remote devices
#[derive(Debug, Parser)]
#[command(
    name = "irota",
    version,
    about = "Discover IR remote devices and keep their firmware up to date",
    long_about = "Finds IR remote devices on the local network (mDNS plus a subnet scan),\n\
        compares their firmware against a local directory or a remote repository,\n\
        and flashes new images over the air.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "IROTA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// IPv4 network range to scan, e.g. 192.168.1.0/24
    #[arg(long, short = 'n', env = "IROTA_NETWORK", global = true)]
    pub network: Option<String>,

    /// Local firmware directory
    #[arg(long, env = "IROTA_FIRMWARE_DIR", global = true)]
    pub firmware_dir: Option<PathBuf>,

    /// Skip mDNS and only scan the network range
    #[arg(long, global = true)]
    pub no_mdns: bool,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "IROTA_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Device request timeout in seconds
    #[arg(long, env = "IROTA_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one discovery pass and list what was found
    Discover,

    /// Discover, refresh status and list known devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Check for firmware newer than what devices run
    Check,

    /// Flash one device
    Update(UpdateArgs),

    /// Flash every device with a pending update
    UpdateAll(UpdateAllArgs),

    /// Toggle over-the-air update mode on a device
    Ota(OtaArgs),

    /// Inspect and synchronize the firmware source
    #[command(alias = "fw")]
    Firmware(FirmwareArgs),

    /// Keep discovering and checking until interrupted
    Watch,

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Show one device (hardware id, IP or name) in detail
    pub device: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  UPDATES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Device hardware id, IP address or name
    pub device: String,

    /// Flash this file instead of the latest firmware
    #[arg(long, short = 'f')]
    pub firmware: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct UpdateAllArgs {
    /// Flash this file instead of the latest firmware
    #[arg(long, short = 'f')]
    pub firmware: Option<PathBuf>,

    /// Hardware ids to skip (repeatable)
    #[arg(long, short = 'x')]
    pub exclude: Vec<String>,
}

#[derive(Debug, Args)]
pub struct OtaArgs {
    #[command(subcommand)]
    pub command: OtaCommand,
}

#[derive(Debug, Subcommand)]
pub enum OtaCommand {
    /// Enable OTA mode
    Enable {
        /// Device hardware id, IP address or name
        device: String,
    },

    /// Disable OTA mode
    Disable {
        /// Device hardware id, IP address or name
        device: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FIRMWARE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct FirmwareArgs {
    #[command(subcommand)]
    pub command: FirmwareCommand,
}

#[derive(Debug, Subcommand)]
pub enum FirmwareCommand {
    /// List known firmware versions, newest first
    #[command(alias = "ls")]
    List,

    /// Drop the cached listing, download new files and re-check devices
    Sync,

    /// Show repository metadata (remote source only)
    Repo,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create an initial config file with guided setup
    Init,

    /// Display the resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Store a repository token in the system keyring
    SetToken {
        /// Repository as owner/name (defaults to the configured one)
        #[arg(long)]
        repo: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
