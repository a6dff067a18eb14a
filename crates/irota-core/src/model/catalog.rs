// ── Firmware catalog ──
//
// Result of one check cycle: every known version mapped to where its bytes
// live, plus the `latest` pointer. Replaced wholesale, never merged.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use irota_api::ContentEntry;
use serde::Serialize;

use crate::version;

/// Where a firmware image's bytes can be read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FirmwareLocator {
    /// A file on local disk.
    Local { path: PathBuf },
    /// A repository listing entry not yet present locally.
    Remote {
        name: String,
        download_url: String,
        sha: String,
        size: u64,
    },
}

impl FirmwareLocator {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local { path: path.into() }
    }

    /// Build a remote locator; `None` for entries without a download URL.
    pub fn from_entry(entry: &ContentEntry) -> Option<Self> {
        Some(Self::Remote {
            name: entry.name.clone(),
            download_url: entry.download_url.clone()?,
            sha: entry.sha.clone(),
            size: entry.size,
        })
    }

    /// File name used for uploads and local storage.
    pub fn file_name(&self) -> String {
        match self {
            Self::Local { path } => path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned()),
            Self::Remote { name, .. } => name.clone(),
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Local { path } => Some(path),
            Self::Remote { .. } => None,
        }
    }
}

impl fmt::Display for FirmwareLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { path } => write!(f, "{}", path.display()),
            Self::Remote { download_url, .. } => f.write_str(download_url),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FirmwareCatalog {
    pub versions: BTreeMap<String, FirmwareLocator>,
    pub latest: Option<String>,
}

impl FirmwareCatalog {
    /// Build a catalog, deriving `latest` from the version keys.
    pub fn new(versions: BTreeMap<String, FirmwareLocator>) -> Self {
        let latest = version::max_version(versions.keys());
        Self { versions, latest }
    }

    pub fn latest_locator(&self) -> Option<&FirmwareLocator> {
        self.latest.as_ref().and_then(|v| self.versions.get(v))
    }

    pub fn get(&self, version: &str) -> Option<&FirmwareLocator> {
        self.versions.get(version)
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Versions sorted newest first.
    pub fn sorted_versions(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.versions.keys().map(String::as_str).collect();
        v.sort_by(|a, b| version::compare(b, a));
        v
    }
}
