// Firmware repository surface
//
// GitHub-shaped contents API: directory listings, repository metadata for
// reachability checks, and streamed raw-file downloads.

pub mod client;
pub mod contents;
pub mod models;

pub use client::RepoClient;
