//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use irota_config::ConfigError;
use irota_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const UNAVAILABLE: i32 = 5;
    pub const UPDATE_FAILED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(irota::connection_failed),
        help(
            "Check that the device or repository is reachable from this host.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out{}", .seconds.map(|s| format!(" after {s}s")).unwrap_or_default())]
    #[diagnostic(
        code(irota::timeout),
        help("Increase the device timeout with --timeout or check the device is powered.")
    )]
    Timeout { seconds: Option<u64> },

    // ── Devices ──────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(irota::not_found),
        help("Run: irota {list_command} to see what is known")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Device '{identifier}' is offline")]
    #[diagnostic(
        code(irota::offline),
        help("Last seen {last_seen}. Power-cycle the device or run: irota discover")
    )]
    Offline {
        identifier: String,
        last_seen: String,
    },

    // ── Firmware ─────────────────────────────────────────────────────
    #[error("No firmware available: {what}")]
    #[diagnostic(
        code(irota::no_firmware),
        help(
            "Put a .bin file into the firmware directory, pass --firmware FILE,\n\
             or configure a remote source with: irota config init"
        )
    )]
    NoFirmware { what: String },

    #[error("Firmware source unavailable: {reason}")]
    #[diagnostic(
        code(irota::source_unavailable),
        help("Check the repository name, path and token. Try: irota firmware repo")
    )]
    SourceUnavailable { reason: String },

    // ── Updates ──────────────────────────────────────────────────────
    #[error("Update failed: {reason}")]
    #[diagnostic(code(irota::update_failed))]
    UpdateFailed { reason: String },

    #[error("Could not {action} OTA on '{identifier}'")]
    #[diagnostic(
        code(irota::ota_failed),
        help("The device refused or did not answer. Run with -v for details.")
    )]
    OtaFailed { identifier: String, action: String },

    #[error("{failed} of {attempted} device updates failed")]
    #[diagnostic(code(irota::batch_failed))]
    BatchFailed { failed: usize, attempted: usize },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(irota::validation))]
    Validation { field: String, reason: String },

    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(irota::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(irota::config),
        help("Inspect the effective settings with: irota config show")
    )]
    Config(#[from] ConfigError),

    // ── Catch-all ────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(irota::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } | Self::NoFirmware { .. } => exit_code::NOT_FOUND,
            Self::Offline { .. } | Self::SourceUnavailable { .. } => exit_code::UNAVAILABLE,
            Self::UpdateFailed { .. } | Self::OtaFailed { .. } | Self::BatchFailed { .. } => {
                exit_code::UPDATE_FAILED
            }
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } | Self::Config(_) => {
                exit_code::USAGE
            }
            Self::Internal(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DeviceNotFound { identifier } => CliError::NotFound {
                resource_type: "device".into(),
                identifier,
                list_command: "devices".into(),
            },

            CoreError::DeviceOffline {
                identifier,
                last_seen,
            } => CliError::Offline {
                identifier,
                last_seen,
            },

            CoreError::FirmwareNotFound { version } => CliError::NoFirmware {
                what: version.unwrap_or_else(|| "no versions found".into()),
            },

            CoreError::SourceUnavailable { reason } => CliError::SourceUnavailable { reason },

            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Io(e) => CliError::Io(e),

            e @ (CoreError::DownloadIntegrity { .. }
            | CoreError::OtaEnableFailed { .. }
            | CoreError::UploadRejected { .. }
            | CoreError::InvalidTransition { .. }) => CliError::UpdateFailed {
                reason: e.to_string(),
            },

            other => CliError::Internal(other.to_string()),
        }
    }
}
