// ── Core error types ──
//
// Domain errors from irota-core. Consumers never see raw HTTP plumbing:
// the `From<irota_api::Error>` impl folds transport failures into
// connection, timeout and API variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Precondition errors ──────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Device {identifier} is offline (last seen {last_seen})")]
    DeviceOffline {
        identifier: String,
        last_seen: String,
    },

    #[error("No firmware file found for {}", .version.as_deref().unwrap_or("the latest version"))]
    FirmwareNotFound { version: Option<String> },

    // ── Firmware source errors ───────────────────────────────────────
    #[error("Firmware source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    #[error("Download of {file} is corrupt: expected {expected} bytes, got {actual}")]
    DownloadIntegrity {
        file: String,
        expected: u64,
        actual: u64,
    },

    // ── Update errors ────────────────────────────────────────────────
    #[error("Failed to enable OTA on {identifier}: {reason}")]
    OtaEnableFailed { identifier: String, reason: String },

    #[error("Device rejected firmware upload with HTTP {status}")]
    UploadRejected { status: u16 },

    #[error("Invalid update state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    // ── Transport errors (wrapped, not exposed raw) ──────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// `timeout_secs` is `None` when the budget that ran out is unknown.
    #[error("Request timed out{}", .timeout_secs.map(|s| format!(" after {s}s")).unwrap_or_default())]
    Timeout { timeout_secs: Option<u64> },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Precondition failures are raised before any state transition.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound { .. } | Self::DeviceOffline { .. } | Self::FirmwareNotFound { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<irota_api::Error> for CoreError {
    fn from(err: irota_api::Error) -> Self {
        match err {
            irota_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: None }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            irota_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            irota_api::Error::InvalidHeader(e) => CoreError::Config {
                message: format!("Invalid header value: {e}"),
            },
            irota_api::Error::Timeout { timeout_secs } => CoreError::Timeout {
                timeout_secs: Some(timeout_secs),
            },
            irota_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            irota_api::Error::Status { status, url } => CoreError::Api {
                message: format!("HTTP {status} from {url}"),
                status: Some(status),
            },
            irota_api::Error::NotFound { url } => CoreError::Api {
                message: format!("Not found: {url}"),
                status: Some(404),
            },
            irota_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            irota_api::Error::Io(e) => CoreError::Io(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_keep_http_code() {
        let err: CoreError = irota_api::Error::Status {
            status: 500,
            url: "http://10.0.0.2/update".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Api { status: Some(500), .. }));
    }

    #[test]
    fn timeouts_report_the_budget_only_when_known() {
        let known: CoreError = irota_api::Error::Timeout { timeout_secs: 300 }.into();
        assert_eq!(known.to_string(), "Request timed out after 300s");

        let unknown = CoreError::Timeout { timeout_secs: None };
        assert_eq!(unknown.to_string(), "Request timed out");
    }

    #[test]
    fn firmware_not_found_message_names_version() {
        let err = CoreError::FirmwareNotFound {
            version: Some("1.3.0".into()),
        };
        assert_eq!(err.to_string(), "No firmware file found for 1.3.0");
        assert!(err.is_precondition());
        assert_eq!(
            CoreError::FirmwareNotFound { version: None }.to_string(),
            "No firmware file found for the latest version"
        );
    }
}
