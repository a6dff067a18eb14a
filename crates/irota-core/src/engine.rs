// ── Engine ──
//
// Owns the device table, the firmware catalog and the notification hub,
// and exposes the operation surface hosts call: discover, refresh, check
// for updates, toggle OTA, update one or all devices. Components borrow
// what they need for the duration of one operation.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use irota_api::{DeviceClient, RepositoryInfo, TransportConfig};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::discovery::{Discovery, DiscoveryReport, FlightGuard};
use crate::error::CoreError;
use crate::firmware::FirmwareSource;
use crate::model::{DeviceRecord, FirmwareCatalog, FirmwareLocator, HardwareId};
use crate::notify::{Notification, Notifications};
use crate::orchestrator::UpdateOrchestrator;
use crate::poller::{RefreshSummary, StatusPoller};
use crate::store::DeviceStore;
use crate::version;

const MIN_LOOP_PERIOD: Duration = Duration::from_secs(1);

/// Discovery, firmware resolution and update orchestration for one fleet.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    store: DeviceStore,
    devices: DeviceClient,
    source: FirmwareSource,
    catalog: watch::Sender<FirmwareCatalog>,
    notifications: Notifications,
    discovering: AtomicBool,
    cancel: CancellationToken,
}

impl Engine {
    /// Build an engine with default transport settings.
    pub fn new(config: EngineConfig) -> Result<Self, CoreError> {
        Self::with_transport(config, &TransportConfig::default())
    }

    pub fn with_transport(config: EngineConfig, transport: &TransportConfig) -> Result<Self, CoreError> {
        let devices = DeviceClient::new(transport)?
            .with_timeouts(config.timings.device_timeout, config.timings.upload_timeout);
        let source = FirmwareSource::from_config(&config, transport)?;
        Ok(Self::from_parts(config, devices, source))
    }

    /// Assemble from pre-built clients.
    pub fn from_parts(config: EngineConfig, devices: DeviceClient, source: FirmwareSource) -> Self {
        let (catalog, _) = watch::channel(FirmwareCatalog::default());
        Self {
            inner: Arc::new(EngineInner {
                config,
                store: DeviceStore::new(),
                devices,
                source,
                catalog,
                notifications: Notifications::new(),
                discovering: AtomicBool::new(false),
                cancel: CancellationToken::new(),
            }),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &DeviceStore {
        &self.inner.store
    }

    pub fn notifications(&self) -> &Notifications {
        &self.inner.notifications
    }

    pub fn source(&self) -> &FirmwareSource {
        &self.inner.source
    }

    /// Sorted device snapshot.
    pub fn devices(&self) -> Arc<Vec<DeviceRecord>> {
        self.inner.store.snapshot()
    }

    pub fn device(&self, id: &HardwareId) -> Option<DeviceRecord> {
        self.inner.store.get(id)
    }

    pub fn catalog(&self) -> FirmwareCatalog {
        self.inner.catalog.borrow().clone()
    }

    pub fn latest_version(&self) -> Option<String> {
        self.inner.catalog.borrow().latest.clone()
    }

    pub fn subscribe_catalog(&self) -> watch::Receiver<FirmwareCatalog> {
        self.inner.catalog.subscribe()
    }

    /// Find a device by hardware id, IP address or display name.
    pub fn resolve_device(&self, query: &str) -> Option<HardwareId> {
        let id = HardwareId::new(query);
        if self.inner.store.contains(&id) {
            return Some(id);
        }
        let ip = query.parse::<IpAddr>().ok();
        self.devices()
            .iter()
            .find(|r| {
                Some(r.address.ip()) == ip || r.display_name.eq_ignore_ascii_case(query.trim())
            })
            .map(|r| r.hardware_id.clone())
    }

    // ── Discovery & polling ──────────────────────────────────────────

    /// Run one discovery pass. `None` when a pass is already running.
    pub async fn discover_devices(&self) -> Option<DiscoveryReport> {
        let Some(_guard) = FlightGuard::try_acquire(&self.inner.discovering) else {
            debug!("discovery already running, skipping");
            return None;
        };
        debug!("starting device discovery");
        let report = Discovery::new(&self.inner.devices, &self.inner.store, &self.inner.config)
            .run()
            .await;
        Some(report)
    }

    /// Poll every known device once.
    pub async fn refresh_status(&self) -> RefreshSummary {
        StatusPoller::new(&self.inner.devices, &self.inner.store)
            .refresh_all()
            .await
    }

    /// Status refresh followed by an update check.
    pub async fn refresh(&self) -> Result<Option<String>, CoreError> {
        self.refresh_status().await;
        self.check_firmware_updates().await
    }

    // ── Firmware ─────────────────────────────────────────────────────

    /// Rebuild the catalog and flag devices with a newer version.
    ///
    /// A missing local directory is logged and yields `Ok(None)`. A remote
    /// listing failure is returned. Either way the previous catalog and
    /// device flags stay as they were.
    pub async fn check_firmware_updates(&self) -> Result<Option<String>, CoreError> {
        let catalog = match self.build_catalog().await {
            Ok(catalog) => catalog,
            Err(CoreError::SourceUnavailable { reason }) if !self.inner.source.is_remote() => {
                warn!(%reason, "no local firmware");
                return Ok(None);
            }
            Err(e) => {
                error!(error = %e, "firmware check failed");
                return Err(e);
            }
        };

        let latest = catalog.latest.clone();
        debug!(versions = catalog.versions.len(), latest = ?latest, "firmware catalog rebuilt");
        self.inner.catalog.send_replace(catalog);

        let Some(latest) = latest else {
            debug!("no firmware versions found");
            return Ok(None);
        };

        let newly = self.flag_updates(&latest);
        if !newly.is_empty() {
            info!(count = newly.len(), %latest, "firmware updates available");
            self.inner
                .notifications
                .emit(Notification::updates_available(&newly));
        }
        Ok(Some(latest))
    }

    async fn build_catalog(&self) -> Result<FirmwareCatalog, CoreError> {
        let source = &self.inner.source;
        let mut versions = source.list_versions().await?;

        if source.is_remote() && self.inner.config.auto_download {
            let report = source
                .sync(&self.inner.config.firmware_dir, true)
                .await?;
            for (v, path) in report.local {
                versions.insert(v, FirmwareLocator::local(path));
            }
            if !report.failed.is_empty() {
                warn!(failed = ?report.failed, "some firmware downloads failed");
            }
        }
        Ok(FirmwareCatalog::new(versions))
    }

    /// Set or clear `available_update`; returns names that newly qualify.
    fn flag_updates(&self, latest: &str) -> Vec<String> {
        let window = self.inner.config.timings.online_window;
        let mut newly = Vec::new();

        for id in self.inner.store.ids() {
            let became = self.inner.store.update(&id, |rec| {
                let qualifies =
                    rec.is_online(window) && version::is_newer(latest, &rec.firmware_version);
                let was = rec.available_update.replace(latest.to_owned());
                if qualifies {
                    (was.as_deref() != Some(latest)).then(|| rec.display_name.clone())
                } else {
                    rec.available_update = None;
                    None
                }
            });
            if let Some(Some(name)) = became {
                newly.push(name);
            }
        }
        newly
    }

    /// Drop the remote listing cache and re-run the update check.
    pub async fn sync_firmware(&self) -> Result<Option<String>, CoreError> {
        self.inner.source.invalidate_cache().await;
        self.check_firmware_updates().await
    }

    /// Repository metadata, for remote sources.
    pub async fn repository_info(&self) -> Result<RepositoryInfo, CoreError> {
        match self.inner.source.as_remote() {
            Some(remote) => remote.repository_info().await,
            None => Err(CoreError::Config {
                message: "firmware source is local".into(),
            }),
        }
    }

    /// `Some(reachable)` for remote sources, `None` for local ones.
    pub async fn check_access(&self) -> Option<bool> {
        match self.inner.source.as_remote() {
            Some(remote) => Some(remote.check_access().await),
            None => None,
        }
    }

    // ── Updates ──────────────────────────────────────────────────────

    pub async fn enable_ota(&self, id: &HardwareId) -> bool {
        let catalog = self.catalog();
        self.orchestrator(&catalog).enable_ota(id).await
    }

    pub async fn disable_ota(&self, id: &HardwareId) -> bool {
        let catalog = self.catalog();
        self.orchestrator(&catalog).disable_ota(id).await
    }

    /// Update one device with `firmware_file` or the latest firmware.
    pub async fn update_device(
        &self,
        id: &HardwareId,
        firmware_file: Option<&Path>,
    ) -> Result<(), CoreError> {
        let catalog = self.catalog();
        self.orchestrator(&catalog)
            .update_device(id, firmware_file)
            .await
    }

    /// Update every eligible device sequentially.
    ///
    /// `exclude` is merged with the configured exclusion list.
    pub async fn update_all_devices(
        &self,
        firmware_file: Option<&Path>,
        exclude: &[HardwareId],
    ) -> BTreeMap<HardwareId, bool> {
        let excluded: BTreeSet<HardwareId> = self
            .inner
            .config
            .exclude
            .iter()
            .map(HardwareId::new)
            .chain(exclude.iter().cloned())
            .collect();
        let catalog = self.catalog();
        self.orchestrator(&catalog)
            .update_all(firmware_file, &excluded)
            .await
    }

    fn orchestrator<'a>(&'a self, catalog: &'a FirmwareCatalog) -> UpdateOrchestrator<'a> {
        UpdateOrchestrator::new(
            &self.inner.devices,
            &self.inner.store,
            &self.inner.source,
            catalog,
            &self.inner.notifications,
            &self.inner.config,
        )
    }

    // ── Background loop ──────────────────────────────────────────────

    /// Discover every scan interval; refresh and check every check
    /// interval. Returns when `cancel` or [`shutdown`](Self::shutdown) fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut scan = tokio::time::interval(self.inner.config.scan_interval.max(MIN_LOOP_PERIOD));
        let mut check = tokio::time::interval(self.inner.config.check_interval.max(MIN_LOOP_PERIOD));
        scan.set_missed_tick_behavior(MissedTickBehavior::Skip);
        check.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("engine loop started");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = self.inner.cancel.cancelled() => break,
                _ = scan.tick() => {
                    self.discover_devices().await;
                }
                _ = check.tick() => {
                    if let Err(e) = self.refresh().await {
                        warn!(error = %e, "periodic update check failed");
                    }
                }
            }
        }
        info!("engine loop stopped");
    }

    /// Stop any running [`run`](Self::run) loop.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }
}
