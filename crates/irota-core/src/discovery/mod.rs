// ── Device discovery ──
//
// Passive mDNS listening followed by an active subnet scan, run in that
// order inside one pass. Probe failures of any kind mean "not our device
// here" and are never surfaced.

pub(crate) mod mdns;
pub mod scan;

use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::join_all;
use irota_api::{DeviceClient, DeviceStatus};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::model::HardwareId;
use crate::poller::probe_ota;
use crate::store::DeviceStore;

/// What one discovery pass found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Addresses probed (mDNS hits plus scanned hosts).
    pub probed: usize,
    /// Devices that answered as ours.
    pub found: BTreeSet<HardwareId>,
    /// Devices not known before this pass.
    pub new: BTreeSet<HardwareId>,
}

/// Single-flight marker; releasing happens on drop.
pub(crate) struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    /// `None` when a pass is already running.
    pub(crate) fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Borrowed view over client, store and config for one pass.
pub struct Discovery<'a> {
    client: &'a DeviceClient,
    store: &'a DeviceStore,
    config: &'a EngineConfig,
}

impl<'a> Discovery<'a> {
    pub fn new(client: &'a DeviceClient, store: &'a DeviceStore, config: &'a EngineConfig) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    /// Passive (when enabled) then active discovery.
    pub async fn run(&self) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        if self.config.auto_discovery {
            if let Err(e) = self.passive(&mut report).await {
                warn!(error = %e, "mDNS discovery failed");
            }
        }

        if let Err(e) = self.active(&mut report).await {
            warn!(range = %self.config.network_range, error = %e, "network scan failed");
        }

        info!(
            probed = report.probed,
            found = report.found.len(),
            new = report.new.len(),
            "discovery pass complete"
        );
        report
    }

    async fn passive(&self, report: &mut DiscoveryReport) -> Result<(), CoreError> {
        debug!(service = %self.config.mdns_service, "discovering devices via mDNS");
        let addrs = mdns::browse(
            &self.config.mdns_service,
            &self.config.mdns_prefix,
            self.config.timings.discovery_window,
        )
        .await?;

        let probes = addrs.iter().map(|ip| self.check_device(*ip));
        absorb(report, join_all(probes).await);
        Ok(())
    }

    async fn active(&self, report: &mut DiscoveryReport) -> Result<(), CoreError> {
        debug!(range = %self.config.network_range, "scanning network range");
        let mut hosts = scan::host_addresses(&self.config.network_range)?.map(IpAddr::V4);
        let size = self.config.timings.probe_batch.max(1);

        loop {
            let batch = next_batch(&mut hosts, size);
            if batch.is_empty() {
                break;
            }
            let probes = batch.into_iter().map(|ip| self.check_device(ip));
            absorb(report, join_all(probes).await);
        }
        Ok(())
    }

    /// Probe one address. `Some((id, is_new))` when it is one of ours.
    pub async fn check_device(&self, ip: IpAddr) -> Option<(HardwareId, bool)> {
        let addr = SocketAddr::new(ip, self.config.device_port);
        let status = match self.client.status(addr).await {
            Ok(status) => status,
            Err(e) => {
                debug!(%addr, error = %e, "probe failed");
                return None;
            }
        };

        if status.device_type.as_deref() != Some(self.config.device_type.as_str()) {
            debug!(%addr, device_type = ?status.device_type, "not an IR remote");
            return None;
        }

        self.add_or_update_device(addr, &status).await
    }

    /// Record a confirmed device, then refresh its OTA flag.
    pub async fn add_or_update_device(
        &self,
        addr: SocketAddr,
        status: &DeviceStatus,
    ) -> Option<(HardwareId, bool)> {
        let id = HardwareId::new(status.mac.as_deref().unwrap_or_default());
        if id.is_empty() {
            warn!(%addr, "device reported no hardware address");
            return None;
        }

        let is_new = self.store.upsert_status(id.clone(), addr, status);
        if is_new {
            info!(mac = %id, %addr, "discovered new IR remote");
        } else {
            debug!(mac = %id, %addr, "refreshed known IR remote");
        }

        probe_ota(self.client, self.store, &id, addr).await;
        Some((id, is_new))
    }
}

fn absorb(report: &mut DiscoveryReport, results: Vec<Option<(HardwareId, bool)>>) {
    report.probed += results.len();
    for (id, is_new) in results.into_iter().flatten() {
        if is_new {
            report.new.insert(id.clone());
        }
        report.found.insert(id);
    }
}

/// Pull up to `size` items off the front of `iter`.
fn next_batch<I: Iterator>(iter: &mut I, size: usize) -> Vec<I::Item> {
    iter.by_ref().take(size).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn batches_come_off_a_wide_range_without_expanding_it() {
        let mut hosts = scan::host_addresses("0.0.0.0/0").unwrap();
        let first = next_batch(&mut hosts, 20);
        assert_eq!(first.len(), 20);
        assert_eq!(first[19].to_string(), "0.0.0.20");

        let second = next_batch(&mut hosts, 20);
        assert_eq!(second[0].to_string(), "0.0.0.21");
    }

    #[test]
    fn last_batch_is_short_then_empty() {
        let mut hosts = scan::host_addresses("10.0.0.0/27").unwrap();
        assert_eq!(next_batch(&mut hosts, 20).len(), 20);
        assert_eq!(next_batch(&mut hosts, 20).len(), 10);
        assert!(next_batch(&mut hosts, 20).is_empty());
    }

    #[test]
    fn flight_guard_is_exclusive_and_released_on_drop() {
        let flag = AtomicBool::new(false);
        let first = FlightGuard::try_acquire(&flag);
        assert!(first.is_some());
        assert!(FlightGuard::try_acquire(&flag).is_none());

        drop(first);
        assert!(FlightGuard::try_acquire(&flag).is_some());
    }
}
