// Repository response types

use serde::{Deserialize, Serialize};

/// One entry of `GET /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    /// `"file"`, `"dir"`, `"symlink"` or `"submodule"`.
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    /// Absent for directories.
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub size: u64,
}

impl ContentEntry {
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

/// Subset of `GET /repos/{owner}/{repo}` used for reachability checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub full_name: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub pushed_at: Option<String>,
}
