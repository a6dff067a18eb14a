// ── Device store ──
//
// Concurrent device table keyed by hardware id. `DashMap` gives lock-free
// reads from parallel probes; a `watch` channel carries a sorted snapshot
// to hosts. Shard guards are always dropped before the snapshot rebuild
// and never live across an `.await`.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use irota_api::DeviceStatus;
use tokio::sync::watch;

use crate::model::{DeviceRecord, HardwareId};

/// Shared, owned device table. Cheap to clone.
#[derive(Clone)]
pub struct DeviceStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    by_id: DashMap<HardwareId, DeviceRecord>,
    snapshot: watch::Sender<Arc<Vec<DeviceRecord>>>,
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Arc::new(StoreInner {
                by_id: DashMap::new(),
                snapshot,
            }),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, id: &HardwareId) -> Option<DeviceRecord> {
        self.inner.by_id.get(id).map(|r| r.value().clone())
    }

    pub fn contains(&self, id: &HardwareId) -> bool {
        self.inner.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.by_id.is_empty()
    }

    /// All hardware ids in stable (sorted) order.
    pub fn ids(&self) -> Vec<HardwareId> {
        let mut ids: Vec<HardwareId> = self.inner.by_id.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Current snapshot, sorted by hardware id (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Vec<DeviceRecord>> {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<DeviceRecord>>> {
        self.inner.snapshot.subscribe()
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Insert or replace a whole record.
    pub fn insert(&self, record: DeviceRecord) {
        self.inner.by_id.insert(record.hardware_id.clone(), record);
        self.rebuild_snapshot();
    }

    /// Fold a status answer into the table. Returns `true` for a new device.
    pub fn upsert_status(&self, id: HardwareId, address: SocketAddr, status: &DeviceStatus) -> bool {
        let is_new = {
            let mut is_new = false;
            self.inner
                .by_id
                .entry(id.clone())
                .and_modify(|rec| rec.apply_status(address, status))
                .or_insert_with(|| {
                    is_new = true;
                    DeviceRecord::from_status(id, address, status)
                });
            is_new
        };
        self.rebuild_snapshot();
        is_new
    }

    /// Mutate one record in place. `None` when the id is unknown.
    pub fn update<R>(&self, id: &HardwareId, f: impl FnOnce(&mut DeviceRecord) -> R) -> Option<R> {
        let result = {
            let mut entry = self.inner.by_id.get_mut(id)?;
            f(entry.value_mut())
        };
        self.rebuild_snapshot();
        Some(result)
    }

    pub fn remove(&self, id: &HardwareId) -> Option<DeviceRecord> {
        let removed = self.inner.by_id.remove(id).map(|(_, v)| v);
        if removed.is_some() {
            self.rebuild_snapshot();
        }
        removed
    }

    fn rebuild_snapshot(&self) {
        let mut values: Vec<DeviceRecord> =
            self.inner.by_id.iter().map(|r| r.value().clone()).collect();
        values.sort_by(|a, b| a.hardware_id.cmp(&b.hardware_id));
        // `send_modify` updates unconditionally, even with zero receivers.
        self.inner.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::UpdateState;

    fn status(mac: &str, version: &str) -> DeviceStatus {
        DeviceStatus {
            device_type: Some("mini".into()),
            mac: Some(mac.into()),
            version: Some(version.into()),
            ..DeviceStatus::default()
        }
    }

    #[test]
    fn upsert_is_keyed_by_hardware_id() {
        let store = DeviceStore::new();
        let id = HardwareId::new("AA:BB:CC:DD:EE:01");

        assert!(store.upsert_status(id.clone(), "10.0.0.2:80".parse().unwrap(), &status("x", "1.0.0")));
        assert!(!store.upsert_status(
            HardwareId::new("aa-bb-cc-dd-ee-01"),
            "10.0.0.3:80".parse().unwrap(),
            &status("x", "1.1.0")
        ));

        assert_eq!(store.len(), 1);
        let rec = store.get(&id).unwrap();
        assert_eq!(rec.address, "10.0.0.3:80".parse().unwrap());
        assert_eq!(rec.firmware_version, "1.1.0");
    }

    #[test]
    fn update_unknown_is_none() {
        let store = DeviceStore::new();
        let id = HardwareId::new("ff");
        assert!(store.update(&id, |r| r.update_state = UpdateState::Checking).is_none());
    }

    #[test]
    fn snapshot_is_sorted_and_tracks_updates() {
        let store = DeviceStore::new();
        let mut rx = store.subscribe();
        store.upsert_status(HardwareId::new("02"), "10.0.0.2:80".parse().unwrap(), &status("02", "1.0.0"));
        store.upsert_status(HardwareId::new("01"), "10.0.0.1:80".parse().unwrap(), &status("01", "1.0.0"));

        assert!(rx.has_changed().unwrap());
        let snap = rx.borrow_and_update().clone();
        let ids: Vec<&str> = snap.iter().map(|r| r.hardware_id.as_str()).collect();
        assert_eq!(ids, vec!["01", "02"]);

        store.update(&HardwareId::new("01"), |r| r.ota_enabled = true);
        assert!(store.snapshot()[0].ota_enabled);
        assert_eq!(store.ids(), vec![HardwareId::new("01"), HardwareId::new("02")]);
    }
}
