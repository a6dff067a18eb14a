// Repository content endpoints
//
// Directory listing, repository metadata, and streamed file download.

use std::path::Path;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::repo::client::RepoClient;
use crate::repo::models::{ContentEntry, RepositoryInfo};

impl RepoClient {
    /// List the entries of a repository directory.
    ///
    /// `GET /repos/{owner}/{repo}/contents/{path}`. A missing path is
    /// reported as [`Error::NotFound`].
    pub async fn list_contents(&self, path: &str) -> Result<Vec<ContentEntry>, Error> {
        let url = self.repo_url(&format!("contents/{}", path.trim_matches('/')))?;
        self.get_json(url).await
    }

    /// Fetch repository metadata.
    ///
    /// `GET /repos/{owner}/{repo}`
    pub async fn repository(&self) -> Result<RepositoryInfo, Error> {
        let url = self.repo_url("")?;
        self.get_json(url).await
    }

    /// Stream `download_url` into `dest`, creating parent directories.
    ///
    /// Returns the number of bytes written. Size verification against the
    /// listing is the caller's concern; on transport errors the partial
    /// file is left for the caller to remove.
    pub async fn download_to(&self, download_url: &str, dest: &Path) -> Result<u64, Error> {
        let url = Url::parse(download_url)?;
        let timeout = self.download_timeout();
        debug!(url = %url, dest = %dest.display(), "downloading");

        let resp = self
            .http()
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        let mut stream = resp.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::from_reqwest(e, timeout))?;
            file.write_all(&chunk).await?;
            written += u64::try_from(chunk.len()).unwrap_or(u64::MAX);
        }
        file.flush().await?;

        debug!(bytes = written, dest = %dest.display(), "download complete");
        Ok(written)
    }
}
