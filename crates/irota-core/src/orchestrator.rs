// ── Update orchestrator ──
//
// Drives one device through Checking -> Downloading -> Installing ->
// Success|Failed. Precondition failures (unknown id, offline, no firmware)
// are returned before the first transition so `update_state` never lies.
// Every terminal outcome produces a notification keyed by hardware id.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use irota_api::DeviceClient;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::firmware::{FirmwareSource, LocalDirectory};
use crate::model::{FirmwareCatalog, FirmwareLocator, HardwareId, UpdateState};
use crate::notify::{Notification, Notifications};
use crate::poller::StatusPoller;
use crate::store::DeviceStore;
use crate::version;

/// Borrowed view over everything one update run touches.
pub struct UpdateOrchestrator<'a> {
    client: &'a DeviceClient,
    store: &'a DeviceStore,
    source: &'a FirmwareSource,
    catalog: &'a FirmwareCatalog,
    notifications: &'a Notifications,
    config: &'a EngineConfig,
}

/// A firmware image ready to read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedFirmware {
    path: PathBuf,
    version: Option<String>,
}

impl<'a> UpdateOrchestrator<'a> {
    pub fn new(
        client: &'a DeviceClient,
        store: &'a DeviceStore,
        source: &'a FirmwareSource,
        catalog: &'a FirmwareCatalog,
        notifications: &'a Notifications,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            client,
            store,
            source,
            catalog,
            notifications,
            config,
        }
    }

    // ── OTA toggles ──────────────────────────────────────────────────

    /// Enable OTA on the device. Failure leaves the flag unchanged.
    pub async fn enable_ota(&self, id: &HardwareId) -> bool {
        self.toggle_ota(id, true).await
    }

    /// Disable OTA on the device. Failure leaves the flag unchanged.
    pub async fn disable_ota(&self, id: &HardwareId) -> bool {
        self.toggle_ota(id, false).await
    }

    async fn toggle_ota(&self, id: &HardwareId, enable: bool) -> bool {
        let Some(addr) = self.store.get(id).map(|r| r.address) else {
            error!(mac = %id, "device not found");
            return false;
        };

        let result = if enable {
            self.client.enable_ota(addr).await
        } else {
            self.client.disable_ota(addr).await
        };

        match result {
            Ok(()) => {
                self.store.update(id, |rec| rec.ota_enabled = enable);
                info!(mac = %id, enabled = enable, "OTA toggled");
                true
            }
            Err(e) => {
                error!(mac = %id, enable, error = %e, "failed to toggle OTA");
                false
            }
        }
    }

    // ── Single device ────────────────────────────────────────────────

    /// Update one device, with an explicit image or the latest firmware.
    pub async fn update_device(
        &self,
        id: &HardwareId,
        firmware_file: Option<&Path>,
    ) -> Result<(), CoreError> {
        let record = self.store.get(id).ok_or_else(|| CoreError::DeviceNotFound {
            identifier: id.to_string(),
        })?;
        if !record.is_online(self.config.timings.online_window) {
            return Err(CoreError::DeviceOffline {
                identifier: id.to_string(),
                last_seen: record.last_seen.to_rfc3339(),
            });
        }

        let firmware = self.resolve_firmware(firmware_file).await?;
        let name = record.display_name.clone();
        info!(
            mac = %id,
            device = %name,
            firmware = %firmware.path.display(),
            "starting OTA update"
        );

        self.set_state(id, UpdateState::Checking)?;

        if !record.ota_enabled && !self.enable_ota(id).await {
            let err = CoreError::OtaEnableFailed {
                identifier: id.to_string(),
                reason: "device refused or did not answer".into(),
            };
            return Err(self.fail(id, &name, err));
        }

        self.set_state(id, UpdateState::Downloading)?;
        let locator = FirmwareLocator::local(&firmware.path);
        let image = match self
            .source
            .fetch_bytes(&locator, &self.config.firmware_dir)
            .await
        {
            Ok(image) => image,
            Err(e) => return Err(self.fail(id, &name, e)),
        };

        self.set_state(id, UpdateState::Installing)?;
        let addr = self.store.get(id).map_or(record.address, |r| r.address);
        if let Err(e) = self
            .client
            .upload_firmware(addr, image, &locator.file_name())
            .await
        {
            let err = match e {
                irota_api::Error::Status { status, .. } => CoreError::UploadRejected { status },
                other => CoreError::from(other),
            };
            return Err(self.fail(id, &name, err));
        }

        self.set_state(id, UpdateState::Success)?;
        debug!(mac = %id, delay = ?self.config.timings.settle_delay, "waiting for reboot");
        tokio::time::sleep(self.config.timings.settle_delay).await;

        if !StatusPoller::new(self.client, self.store).refresh_one(id).await {
            warn!(mac = %id, "device did not answer after update");
        }
        self.store.update(id, |rec| rec.available_update = None);

        let running = self
            .store
            .get(id)
            .map(|r| r.firmware_version)
            .or(firmware.version)
            .unwrap_or_default();
        self.notifications
            .emit(Notification::update_succeeded(id, &name, &running));
        info!(mac = %id, device = %name, version = %running, "update succeeded");
        Ok(())
    }

    /// Locate the image to flash without touching device state.
    async fn resolve_firmware(&self, explicit: Option<&Path>) -> Result<ResolvedFirmware, CoreError> {
        if let Some(path) = explicit {
            let is_file = tokio::fs::metadata(path)
                .await
                .is_ok_and(|m| m.is_file());
            if !is_file {
                return Err(CoreError::FirmwareNotFound {
                    version: Some(path.display().to_string()),
                });
            }
            let version = path
                .file_name()
                .and_then(|n| version::extract_version(&n.to_string_lossy()));
            return Ok(ResolvedFirmware {
                path: path.to_path_buf(),
                version,
            });
        }

        let latest = match self.catalog.latest.clone() {
            Some(v) => Some(v),
            None => self.source.latest().await.unwrap_or_else(|e| {
                warn!(error = %e, "could not resolve latest firmware");
                None
            }),
        };
        let latest = latest.ok_or(CoreError::FirmwareNotFound { version: None })?;

        if let (FirmwareSource::Remote(remote), true) = (self.source, self.config.auto_download) {
            let locator = match self.catalog.get(&latest) {
                Some(locator) => Some(locator.clone()),
                None => remote.list_versions().await?.remove(&latest),
            };
            if let Some(locator) = locator {
                let path = remote
                    .ensure_local(&locator, &self.config.firmware_dir)
                    .await?;
                return Ok(ResolvedFirmware {
                    path,
                    version: Some(latest),
                });
            }
        }

        if let Some(path) = self
            .catalog
            .get(&latest)
            .and_then(FirmwareLocator::local_path)
        {
            return Ok(ResolvedFirmware {
                path: path.to_path_buf(),
                version: Some(latest),
            });
        }

        let fallback = LocalDirectory::new(&self.config.firmware_dir)
            .find_by_version(&latest)
            .await
            .unwrap_or_else(|e| {
                debug!(error = %e, "local firmware scan failed");
                None
            });
        match fallback {
            Some(path) => Ok(ResolvedFirmware {
                path,
                version: Some(latest),
            }),
            None => Err(CoreError::FirmwareNotFound {
                version: Some(latest),
            }),
        }
    }

    fn set_state(&self, id: &HardwareId, next: UpdateState) -> Result<(), CoreError> {
        self.store
            .update(id, |rec| -> Result<(), CoreError> {
                rec.update_state = rec.update_state.transition(next)?;
                Ok(())
            })
            .unwrap_or_else(|| {
                Err(CoreError::DeviceNotFound {
                    identifier: id.to_string(),
                })
            })
    }

    /// Record a failed attempt and notify. Returns the error for `?`.
    fn fail(&self, id: &HardwareId, name: &str, err: CoreError) -> CoreError {
        if let Err(e) = self.set_state(id, UpdateState::Failed) {
            warn!(mac = %id, error = %e, "could not record failed state");
        }
        error!(mac = %id, device = %name, error = %err, "update failed");
        self.notifications
            .emit(Notification::update_failed(id, name, &err.to_string()));
        err
    }

    // ── Batch ────────────────────────────────────────────────────────

    /// Update every eligible device, one at a time, in hardware-id order.
    ///
    /// A device is eligible when it has a pending update or an explicit
    /// image was given. One failure never stops the batch.
    pub async fn update_all(
        &self,
        firmware_file: Option<&Path>,
        exclude: &BTreeSet<HardwareId>,
    ) -> BTreeMap<HardwareId, bool> {
        let mut results = BTreeMap::new();

        for id in self.store.ids() {
            if exclude.contains(&id) {
                debug!(mac = %id, "excluded from batch update");
                continue;
            }
            let eligible = firmware_file.is_some()
                || self
                    .store
                    .get(&id)
                    .is_some_and(|r| r.available_update.is_some());
            if !eligible {
                continue;
            }

            if !results.is_empty() {
                tokio::time::sleep(self.config.timings.inter_device_pause).await;
            }

            let ok = match self.update_device(&id, firmware_file).await {
                Ok(()) => true,
                Err(e) => {
                    if e.is_precondition() {
                        warn!(mac = %id, error = %e, "skipped device");
                    }
                    false
                }
            };
            results.insert(id, ok);
        }

        let succeeded = results.values().filter(|ok| **ok).count();
        info!(succeeded, attempted = results.len(), "batch update finished");
        results
    }
}
