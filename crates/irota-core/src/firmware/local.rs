// ── Local firmware directory ──
//
// The directory is authoritative on every call: nothing is cached.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CoreError;
use crate::model::FirmwareLocator;
use crate::version;

pub(crate) const FIRMWARE_EXTENSION: &str = ".bin";

#[derive(Debug, Clone)]
pub struct LocalDirectory {
    dir: PathBuf,
}

impl LocalDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of every `*.bin` file in the directory.
    async fn firmware_files(&self) -> Result<Vec<(String, PathBuf)>, CoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CoreError::SourceUnavailable {
                    reason: format!("firmware directory {} does not exist", self.dir.display()),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(FIRMWARE_EXTENSION) && entry.file_type().await?.is_file() {
                files.push((name, entry.path()));
            }
        }
        files.sort();
        Ok(files)
    }

    /// Map each versioned `*.bin` to its path. Unversioned files are skipped.
    pub async fn list_versions(&self) -> Result<BTreeMap<String, FirmwareLocator>, CoreError> {
        let mut versions = BTreeMap::new();
        for (name, path) in self.firmware_files().await? {
            match version::extract_version(&name) {
                Some(v) => {
                    versions.insert(v, FirmwareLocator::local(path));
                }
                None => debug!(file = %name, "skipping firmware without version"),
            }
        }
        Ok(versions)
    }

    pub async fn latest(&self) -> Result<Option<String>, CoreError> {
        let versions = self.list_versions().await?;
        Ok(version::max_version(versions.keys()))
    }

    /// First `*.bin` (by name) whose file name contains `version`.
    pub async fn find_by_version(&self, version: &str) -> Result<Option<PathBuf>, CoreError> {
        Ok(self
            .firmware_files()
            .await?
            .into_iter()
            .find(|(name, _)| name.contains(version))
            .map(|(_, path)| path))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"fw").unwrap();
    }

    #[tokio::test]
    async fn latest_from_directory() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "ir_remote_v1.2.0.bin");
        touch(tmp.path(), "ir_remote_v1.3.0.bin");
        touch(tmp.path(), "notes_v9.9.9.txt");
        touch(tmp.path(), "nightly.bin");

        let local = LocalDirectory::new(tmp.path());
        let versions = local.list_versions().await.unwrap();

        assert_eq!(versions.len(), 2);
        assert_eq!(local.latest().await.unwrap().as_deref(), Some("1.3.0"));
    }

    #[tokio::test]
    async fn missing_directory_is_source_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let local = LocalDirectory::new(tmp.path().join("absent"));

        let err = local.list_versions().await.unwrap_err();
        assert!(matches!(err, CoreError::SourceUnavailable { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn find_by_version_matches_substring() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "ir_remote_v1.2.0.bin");
        touch(tmp.path(), "ir_remote_v1.3.0.bin");

        let local = LocalDirectory::new(tmp.path());
        let found = local.find_by_version("1.3.0").await.unwrap().unwrap();
        assert!(found.ends_with("ir_remote_v1.3.0.bin"));
        assert!(local.find_by_version("2.0.0").await.unwrap().is_none());
    }
}
