// Device OTA endpoints
//
// Capability query, enable/disable toggles, and the firmware upload.

use std::net::SocketAddr;

use tracing::debug;

use crate::device::client::DeviceClient;
use crate::device::models::OtaStatus;
use crate::error::Error;

impl DeviceClient {
    /// Read the OTA capability flag.
    ///
    /// `GET /api/ota/status`
    pub async fn ota_status(&self, addr: SocketAddr) -> Result<OtaStatus, Error> {
        let url = Self::device_url(addr, "/api/ota/status")?;
        self.get_json(url).await
    }

    /// `POST /api/ota/enable`
    pub async fn enable_ota(&self, addr: SocketAddr) -> Result<(), Error> {
        let url = Self::device_url(addr, "/api/ota/enable")?;
        debug!(%addr, "enabling OTA");
        self.post_empty(url).await
    }

    /// `POST /api/ota/disable`
    pub async fn disable_ota(&self, addr: SocketAddr) -> Result<(), Error> {
        let url = Self::device_url(addr, "/api/ota/disable")?;
        debug!(%addr, "disabling OTA");
        self.post_empty(url).await
    }

    /// Upload a firmware image.
    ///
    /// `POST /update` as `multipart/form-data` with the image in the `file`
    /// field. Only HTTP 200 counts as accepted; the device reboots shortly
    /// after answering.
    pub async fn upload_firmware(
        &self,
        addr: SocketAddr,
        image: Vec<u8>,
        filename: &str,
    ) -> Result<(), Error> {
        let url = Self::device_url(addr, "/update")?;
        debug!(%addr, filename, bytes = image.len(), "uploading firmware");

        let part = reqwest::multipart::Part::bytes(image)
            .file_name(filename.to_owned())
            .mime_str("application/octet-stream")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        self.post_multipart(url, form).await
    }
}
