// ── Status poller ──
//
// Refreshes liveness, telemetry and the OTA flag of known devices. A
// device that does not answer is left untouched; it drops offline on its
// own once `last_seen` ages past the online window.

use std::net::SocketAddr;

use futures_util::future::join_all;
use irota_api::DeviceClient;
use tracing::debug;

use crate::model::HardwareId;
use crate::store::DeviceStore;

/// Borrowed view over the client and store for one refresh pass.
pub struct StatusPoller<'a> {
    client: &'a DeviceClient,
    store: &'a DeviceStore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub responded: usize,
    pub silent: usize,
}

impl<'a> StatusPoller<'a> {
    pub fn new(client: &'a DeviceClient, store: &'a DeviceStore) -> Self {
        Self { client, store }
    }

    /// Poll every known device concurrently.
    pub async fn refresh_all(&self) -> RefreshSummary {
        let ids = self.store.ids();
        let results = join_all(ids.iter().map(|id| self.refresh_one(id))).await;

        let responded = results.iter().filter(|ok| **ok).count();
        let summary = RefreshSummary {
            responded,
            silent: results.len() - responded,
        };
        debug!(responded = summary.responded, silent = summary.silent, "status refresh complete");
        summary
    }

    /// Poll one device. Returns `true` when it answered as itself.
    pub async fn refresh_one(&self, id: &HardwareId) -> bool {
        let Some(addr) = self.store.get(id).map(|r| r.address) else {
            return false;
        };

        let status = match self.client.status(addr).await {
            Ok(status) => status,
            Err(e) => {
                debug!(mac = %id, %addr, error = %e, "device did not answer status poll");
                return false;
            }
        };

        if let Some(reported) = status.mac.as_deref().map(HardwareId::new) {
            if !reported.is_empty() && reported != *id {
                debug!(mac = %id, %addr, other = %reported, "address now belongs to another device");
                return false;
            }
        }

        self.store.update(id, |rec| rec.apply_status(addr, &status));
        probe_ota(self.client, self.store, id, addr).await;
        true
    }
}

/// Re-derive `ota_enabled`; any failure reads as disabled.
pub(crate) async fn probe_ota(
    client: &DeviceClient,
    store: &DeviceStore,
    id: &HardwareId,
    addr: SocketAddr,
) {
    let enabled = match client.ota_status(addr).await {
        Ok(ota) => ota.enabled,
        Err(e) => {
            debug!(mac = %id, %addr, error = %e, "OTA status unavailable");
            false
        }
    };
    store.update(id, |rec| rec.ota_enabled = enabled);
}
