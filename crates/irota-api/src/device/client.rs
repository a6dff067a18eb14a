// Device HTTP client
//
// Wraps `reqwest::Client` with per-device URL construction and per-request
// timeouts. Endpoint methods live in `status.rs` and `ota.rs` as inherent
// impls so this module stays focused on transport mechanics.

use std::net::SocketAddr;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Default budget for status probes and OTA toggles.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Default budget for firmware uploads; flash writes are slow.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Raw HTTP client for IR remote devices.
///
/// Devices are addressed per call by socket address, so one client serves
/// the whole fleet. Cloning is cheap (the inner `reqwest::Client` is an
/// `Arc`).
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    request_timeout: Duration,
    upload_timeout: Duration,
}

impl DeviceClient {
    /// Create a new device client from a `TransportConfig`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http))
    }

    /// Create a device client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    /// Override the per-request and upload timeouts.
    pub fn with_timeouts(mut self, request: Duration, upload: Duration) -> Self {
        self.request_timeout = request;
        self.upload_timeout = upload;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn upload_timeout(&self) -> Duration {
        self.upload_timeout
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `http://{addr}{path}` for a device endpoint.
    pub(crate) fn device_url(addr: SocketAddr, path: &str) -> Result<Url, Error> {
        Ok(Url::parse(&format!("http://{addr}{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url.clone())
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, self.request_timeout))?;

        let resp = check_status(resp, &url)?;
        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(e, self.request_timeout))?;

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    /// Send a bodiless POST and require a 200 response.
    pub(crate) async fn post_empty(&self, url: Url) -> Result<(), Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url.clone())
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, self.request_timeout))?;

        require_ok(&resp, &url)
    }

    /// Send a multipart POST under the upload timeout and require a 200.
    pub(crate) async fn post_multipart(
        &self,
        url: Url,
        form: reqwest::multipart::Form,
    ) -> Result<(), Error> {
        debug!("POST {} (multipart)", url);

        let resp = self
            .http
            .post(url.clone())
            .multipart(form)
            .timeout(self.upload_timeout)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, self.upload_timeout))?;

        require_ok(&resp, &url)
    }
}

/// Map 404 and other non-success statuses into typed errors.
fn check_status(resp: reqwest::Response, url: &Url) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(Error::NotFound {
            url: url.to_string(),
        });
    }
    Err(Error::Status {
        status: status.as_u16(),
        url: url.to_string(),
    })
}

/// Device commands only count as accepted on exactly HTTP 200.
fn require_ok(resp: &reqwest::Response, url: &Url) -> Result<(), Error> {
    if resp.status() == reqwest::StatusCode::OK {
        Ok(())
    } else {
        Err(Error::Status {
            status: resp.status().as_u16(),
            url: url.to_string(),
        })
    }
}
