// Repository HTTP client
//
// Wraps `reqwest::Client` with the repository's API base, default headers
// (`Accept`, optional `Authorization: token ...`) and the repo/download
// timeouts. Endpoint methods live in `contents.rs`.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(90);

const ACCEPT_V3: &str = "application/vnd.github.v3+json";

/// Raw HTTP client for a single firmware repository (`owner/name`).
#[derive(Debug, Clone)]
pub struct RepoClient {
    http: reqwest::Client,
    api_base: Url,
    repo: String,
    request_timeout: Duration,
    download_timeout: Duration,
}

impl RepoClient {
    /// Create a client for `repo` (`owner/name`) against `api_base`.
    ///
    /// The token, when present, is sent on every request.
    pub fn new(
        api_base: Url,
        repo: impl Into<String>,
        token: Option<&SecretString>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_V3));
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("token {}", token.expose_secret()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = transport.build_client_with_headers(headers)?;
        Ok(Self {
            http,
            api_base,
            repo: repo.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        })
    }

    /// Override the listing and download timeouts.
    pub fn with_timeouts(mut self, request: Duration, download: Duration) -> Self {
        self.request_timeout = request;
        self.download_timeout = download;
        self
    }

    /// The `owner/name` this client targets.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn download_timeout(&self) -> Duration {
        self.download_timeout
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{api_base}/repos/{repo}/{suffix}` (suffix may be empty).
    pub(crate) fn repo_url(&self, suffix: &str) -> Result<Url, Error> {
        let base = self.api_base.as_str().trim_end_matches('/');
        let suffix = suffix.trim_matches('/');
        let full = if suffix.is_empty() {
            format!("{base}/repos/{}", self.repo)
        } else {
            format!("{base}/repos/{}/{suffix}", self.repo)
        };
        Ok(Url::parse(&full)?)
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

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(e, self.request_timeout))?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}
