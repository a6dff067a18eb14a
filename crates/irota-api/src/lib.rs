// irota-api: Async HTTP clients for IR remote devices and firmware repositories

pub mod device;
pub mod error;
pub mod repo;
pub mod transport;

pub use device::DeviceClient;
pub use error::Error;
pub use repo::RepoClient;
pub use transport::{TlsMode, TransportConfig};

// Flat access to wire models for consumers.
pub use device::models::{DeviceStatus, OtaStatus};
pub use repo::models::{ContentEntry, RepositoryInfo};
