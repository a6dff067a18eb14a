// Device HTTP surface
//
// Plain JSON endpoints served by the IR remote firmware: identity/status,
// OTA capability toggles, and the multipart `/update` upload.

pub mod client;
pub mod models;
pub mod ota;
pub mod status;

pub use client::DeviceClient;
