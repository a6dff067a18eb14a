// Device status endpoint

use std::net::SocketAddr;

use crate::device::client::DeviceClient;
use crate::device::models::DeviceStatus;
use crate::error::Error;

impl DeviceClient {
    /// Fetch identity and telemetry.
    ///
    /// `GET /api/status`
    pub async fn status(&self, addr: SocketAddr) -> Result<DeviceStatus, Error> {
        let url = Self::device_url(addr, "/api/status")?;
        self.get_json(url).await
    }
}
