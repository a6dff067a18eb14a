// ── Remote firmware repository ──
//
// Lists `.bin` files in one repository directory through the contents API.
// The listing is cached for `cache_ttl`; a fresh hit skips the network.
// Downloads are verified against the advertised size and deleted on
// mismatch, so a corrupt file never lingers in the firmware directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use irota_api::{ContentEntry, RepoClient, RepositoryInfo};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::local::FIRMWARE_EXTENSION;
use crate::error::CoreError;
use crate::model::FirmwareLocator;
use crate::version;

struct CachedListing {
    fetched_at: Instant,
    entries: Vec<ContentEntry>,
}

/// Outcome of reconciling the remote listing with a local directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Versions present locally with the advertised size.
    pub local: BTreeMap<String, PathBuf>,
    /// Versions missing locally that were not downloaded.
    pub pending: Vec<String>,
    /// Versions whose download failed or was corrupt.
    pub failed: Vec<String>,
}

pub struct RemoteRepository {
    client: RepoClient,
    path: String,
    cache_ttl: Duration,
    cache: Mutex<Option<CachedListing>>,
}

impl std::fmt::Debug for RemoteRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteRepository")
            .field("repo", &self.client.repo())
            .field("path", &self.path)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

impl RemoteRepository {
    pub fn new(client: RepoClient, path: impl Into<String>, cache_ttl: Duration) -> Self {
        Self {
            client,
            path: path.into().trim_matches('/').to_owned(),
            cache_ttl,
            cache: Mutex::new(None),
        }
    }

    pub fn repo(&self) -> &str {
        self.client.repo()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    // ── Listing ──────────────────────────────────────────────────────

    /// Firmware entries of the configured path, served from cache when fresh.
    ///
    /// A missing path is an empty listing; any other failure is
    /// `SourceUnavailable`.
    pub async fn listing(&self) -> Result<Vec<ContentEntry>, CoreError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.cache_ttl {
                debug!(repo = self.repo(), "firmware listing cache hit");
                return Ok(cached.entries.clone());
            }
        }

        let entries = match self.client.list_contents(&self.path).await {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => {
                warn!(repo = self.repo(), path = %self.path, "firmware path not found in repository");
                return Ok(Vec::new());
            }
            Err(e) => {
                error!(repo = self.repo(), error = %e, "failed to list firmware");
                return Err(CoreError::SourceUnavailable {
                    reason: e.to_string(),
                });
            }
        };

        let firmware: Vec<ContentEntry> = entries
            .into_iter()
            .filter(|e| e.is_file() && e.name.ends_with(FIRMWARE_EXTENSION))
            .collect();
        debug!(repo = self.repo(), count = firmware.len(), "fetched firmware listing");

        *cache = Some(CachedListing {
            fetched_at: Instant::now(),
            entries: firmware.clone(),
        });
        Ok(firmware)
    }

    pub async fn list_versions(&self) -> Result<BTreeMap<String, FirmwareLocator>, CoreError> {
        let mut versions = BTreeMap::new();
        for entry in self.listing().await? {
            let Some(v) = version::extract_version(&entry.name) else {
                continue;
            };
            if let Some(locator) = FirmwareLocator::from_entry(&entry) {
                versions.insert(v, locator);
            }
        }
        Ok(versions)
    }

    pub async fn latest(&self) -> Result<Option<String>, CoreError> {
        let versions = self.list_versions().await?;
        Ok(version::max_version(versions.keys()))
    }

    pub async fn invalidate_cache(&self) {
        *self.cache.lock().await = None;
        debug!(repo = self.repo(), "firmware listing cache invalidated");
    }

    // ── Download ─────────────────────────────────────────────────────

    /// Download one file into `dest` and verify its size.
    pub async fn download(
        &self,
        download_url: &str,
        expected_size: u64,
        dest: &Path,
    ) -> Result<(), CoreError> {
        info!(dest = %dest.display(), "downloading firmware");

        let written = match self.client.download_to(download_url, dest).await {
            Ok(written) => written,
            Err(e) => {
                remove_partial(dest).await;
                return Err(e.into());
            }
        };

        if written != expected_size {
            error!(
                dest = %dest.display(),
                expected = expected_size,
                actual = written,
                "downloaded firmware size mismatch"
            );
            remove_partial(dest).await;
            return Err(CoreError::DownloadIntegrity {
                file: dest.display().to_string(),
                expected: expected_size,
                actual: written,
            });
        }

        info!(dest = %dest.display(), bytes = written, "firmware downloaded");
        Ok(())
    }

    /// Ensure the file for `locator` exists in `dir`, downloading it if
    /// missing or of the wrong size. Returns the local path.
    pub async fn ensure_local(
        &self,
        locator: &FirmwareLocator,
        dir: &Path,
    ) -> Result<PathBuf, CoreError> {
        match locator {
            FirmwareLocator::Local { path } => Ok(path.clone()),
            FirmwareLocator::Remote {
                name,
                download_url,
                size,
                ..
            } => {
                let dest = dir.join(name);
                if local_size(&dest).await == Some(*size) {
                    return Ok(dest);
                }
                self.download(download_url, *size, &dest).await?;
                Ok(dest)
            }
        }
    }

    // ── Sync ─────────────────────────────────────────────────────────

    /// Reconcile the remote listing with `local_dir`.
    ///
    /// Files already present with the advertised size are kept. Others are
    /// downloaded when `auto_download` is set, or reported as pending.
    pub async fn sync(&self, local_dir: &Path, auto_download: bool) -> Result<SyncReport, CoreError> {
        let entries = self.listing().await?;
        tokio::fs::create_dir_all(local_dir).await?;

        let mut report = SyncReport::default();
        for entry in entries {
            let Some(v) = version::extract_version(&entry.name) else {
                continue;
            };
            let dest = local_dir.join(&entry.name);

            match local_size(&dest).await {
                Some(size) if size == entry.size => {
                    report.local.insert(v, dest);
                    continue;
                }
                Some(size) => {
                    warn!(file = %entry.name, local = size, remote = entry.size, "local firmware size mismatch");
                }
                None => {}
            }

            if !auto_download {
                info!(file = %entry.name, "firmware available for download");
                report.pending.push(v);
                continue;
            }

            let Some(url) = entry.download_url.as_deref() else {
                report.pending.push(v);
                continue;
            };
            match self.download(url, entry.size, &dest).await {
                Ok(()) => {
                    report.local.insert(v, dest);
                }
                Err(e) => {
                    error!(file = %entry.name, error = %e, "firmware download failed");
                    report.failed.push(v);
                }
            }
        }
        Ok(report)
    }

    // ── Repository metadata ──────────────────────────────────────────

    pub async fn repository_info(&self) -> Result<RepositoryInfo, CoreError> {
        Ok(self.client.repository().await?)
    }

    /// `true` when the repository metadata endpoint answers.
    pub async fn check_access(&self) -> bool {
        match self.client.repository().await {
            Ok(_) => true,
            Err(e) => {
                debug!(repo = self.repo(), error = %e, "repository not accessible");
                false
            }
        }
    }
}

async fn local_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .filter(std::fs::Metadata::is_file)
        .map(|m| m.len())
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove partial download");
        }
    }
}
