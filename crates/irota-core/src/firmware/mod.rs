// ── Firmware sources ──
//
// One contract, two variants. The engine holds a single `FirmwareSource`
// chosen from configuration at construction time.

pub mod local;
pub mod remote;

use std::collections::BTreeMap;
use std::path::Path;

use irota_api::{RepoClient, TransportConfig};
use tracing::debug;

pub use local::LocalDirectory;
pub use remote::{RemoteRepository, SyncReport};

use crate::config::{EngineConfig, FirmwareSourceConfig};
use crate::error::CoreError;
use crate::model::FirmwareLocator;

#[derive(Debug)]
pub enum FirmwareSource {
    Local(LocalDirectory),
    Remote(RemoteRepository),
}

impl FirmwareSource {
    /// Build the source selected by `config.source`.
    pub fn from_config(config: &EngineConfig, transport: &TransportConfig) -> Result<Self, CoreError> {
        match &config.source {
            FirmwareSourceConfig::Local => Ok(Self::Local(LocalDirectory::new(&config.firmware_dir))),
            FirmwareSourceConfig::Remote {
                repo,
                path,
                token,
                api_base,
            } => {
                let client = RepoClient::new(api_base.clone(), repo.clone(), token.as_ref(), transport)?
                    .with_timeouts(config.timings.repo_timeout, config.timings.download_timeout);
                Ok(Self::Remote(RemoteRepository::new(
                    client,
                    path.clone(),
                    config.timings.cache_ttl,
                )))
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    pub fn as_remote(&self) -> Option<&RemoteRepository> {
        match self {
            Self::Remote(r) => Some(r),
            Self::Local(_) => None,
        }
    }

    pub async fn list_versions(&self) -> Result<BTreeMap<String, FirmwareLocator>, CoreError> {
        match self {
            Self::Local(l) => l.list_versions().await,
            Self::Remote(r) => r.list_versions().await,
        }
    }

    pub async fn latest(&self) -> Result<Option<String>, CoreError> {
        match self {
            Self::Local(l) => l.latest().await,
            Self::Remote(r) => r.latest().await,
        }
    }

    /// Read the full image behind `locator`.
    ///
    /// Remote locators are first downloaded into `download_dir`.
    pub async fn fetch_bytes(
        &self,
        locator: &FirmwareLocator,
        download_dir: &Path,
    ) -> Result<Vec<u8>, CoreError> {
        let path = match (self, locator) {
            (_, FirmwareLocator::Local { path }) => path.clone(),
            (Self::Remote(r), remote @ FirmwareLocator::Remote { .. }) => {
                r.ensure_local(remote, download_dir).await?
            }
            (Self::Local(_), FirmwareLocator::Remote { name, .. }) => {
                return Err(CoreError::SourceUnavailable {
                    reason: format!("{name} is a remote file but the source is local"),
                });
            }
        };
        debug!(path = %path.display(), "reading firmware image");
        Ok(tokio::fs::read(&path).await?)
    }

    /// Reconcile with `local_dir`. The local variant reports what is on disk.
    pub async fn sync(&self, local_dir: &Path, auto_download: bool) -> Result<SyncReport, CoreError> {
        match self {
            Self::Local(l) => {
                let local = l
                    .list_versions()
                    .await?
                    .into_iter()
                    .filter_map(|(v, loc)| loc.local_path().map(|p| (v, p.to_path_buf())))
                    .collect();
                Ok(SyncReport {
                    local,
                    ..SyncReport::default()
                })
            }
            Self::Remote(r) => r.sync(local_dir, auto_download).await,
        }
    }

    pub async fn invalidate_cache(&self) {
        match self {
            Self::Local(_) => {}
            Self::Remote(r) => r.invalidate_cache().await,
        }
    }
}
