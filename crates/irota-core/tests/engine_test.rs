#![allow(clippy::unwrap_used)]
// Engine integration tests with wiremock standing in for devices.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use irota_api::DeviceStatus;
use irota_core::notify::UPDATES_AVAILABLE_KEY;
use irota_core::{
    CoreError, DeviceRecord, Engine, EngineConfig, HardwareId, NotificationKind, Timings,
    UpdateState,
};

// ── Helpers ─────────────────────────────────────────────────────────

const MAC_A: &str = "AA:BB:CC:00:00:01";
const MAC_B: &str = "AA:BB:CC:00:00:02";
const MAC_C: &str = "AA:BB:CC:00:00:03";

fn test_config(port: u16, firmware_dir: &Path) -> EngineConfig {
    EngineConfig {
        device_port: port,
        network_range: "127.0.0.1/32".into(),
        auto_discovery: false,
        firmware_dir: firmware_dir.to_path_buf(),
        timings: Timings {
            device_timeout: Duration::from_secs(2),
            upload_timeout: Duration::from_secs(5),
            settle_delay: Duration::ZERO,
            inter_device_pause: Duration::ZERO,
            ..Timings::default()
        },
        ..EngineConfig::default()
    }
}

fn status_body(mac: &str, version: &str) -> serde_json::Value {
    json!({
        "deviceType": "mini",
        "mac": mac,
        "version": version,
        "hostname": format!("ir-{}", &mac[mac.len() - 2..]),
        "freeHeap": 150_000,
        "flashSize": 4_194_304,
        "chipModel": "ESP32"
    })
}

async fn mount_device(server: &MockServer, mac: &str, version: &str, ota_enabled: bool) {
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(mac, version)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ota/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "enabled": ota_enabled })))
        .mount(server)
        .await;
}

async fn mount_upload(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/update"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Put a device straight into the store, bypassing discovery.
fn seed(engine: &Engine, mac: &str, addr: SocketAddr, version: &str, ota_enabled: bool) -> HardwareId {
    let id = HardwareId::new(mac);
    let status = DeviceStatus {
        device_type: Some("mini".into()),
        mac: Some(mac.into()),
        version: Some(version.into()),
        ..DeviceStatus::default()
    };
    let mut record = DeviceRecord::from_status(id.clone(), addr, &status);
    record.ota_enabled = ota_enabled;
    engine.store().insert(record);
    id
}

fn firmware_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"FIRMWARE-IMAGE").unwrap();
    path
}

// ── Discovery ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_discover_adds_device_from_scan() {
    let server = MockServer::start().await;
    mount_device(&server, MAC_A, "1.2.0", true).await;
    let fw = tempfile::tempdir().unwrap();
    let engine = Engine::new(test_config(server.address().port(), fw.path())).unwrap();

    let report = engine.discover_devices().await.unwrap();

    let id = HardwareId::new(MAC_A);
    assert!(report.found.contains(&id));
    assert!(report.new.contains(&id));
    let rec = engine.device(&id).unwrap();
    assert_eq!(rec.firmware_version, "1.2.0");
    assert_eq!(rec.display_name, "ir-01");
    assert!(rec.ota_enabled);
    assert_eq!(rec.telemetry.chip_model.as_deref(), Some("ESP32"));

    // A second pass updates in place.
    let report = engine.discover_devices().await.unwrap();
    assert!(report.new.is_empty());
    assert_eq!(engine.store().len(), 1);
}

#[tokio::test]
async fn test_discover_ignores_other_device_types() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deviceType": "pro",
            "mac": MAC_A
        })))
        .mount(&server)
        .await;
    let fw = tempfile::tempdir().unwrap();
    let engine = Engine::new(test_config(server.address().port(), fw.path())).unwrap();

    let report = engine.discover_devices().await.unwrap();
    assert_eq!(report.probed, 1);
    assert!(report.found.is_empty());
    assert!(engine.store().is_empty());
}

#[tokio::test]
async fn test_discover_ota_probe_failure_reads_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(MAC_A, "1.0.0")))
        .mount(&server)
        .await;
    let fw = tempfile::tempdir().unwrap();
    let engine = Engine::new(test_config(server.address().port(), fw.path())).unwrap();

    engine.discover_devices().await.unwrap();
    assert!(!engine.device(&HardwareId::new(MAC_A)).unwrap().ota_enabled);
}

#[tokio::test]
async fn test_overlapping_discovery_runs_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_body(MAC_A, "1.0.0"))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let fw = tempfile::tempdir().unwrap();
    let engine = Engine::new(test_config(server.address().port(), fw.path())).unwrap();

    let (first, second) = tokio::join!(engine.discover_devices(), engine.discover_devices());

    assert_eq!(
        [first.is_some(), second.is_some()].iter().filter(|ran| **ran).count(),
        1
    );
    server.verify().await;

    // The guard is released afterwards.
    server.reset().await;
    assert!(engine.discover_devices().await.is_some());
}

// ── Status refresh ──────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_leaves_silent_devices_untouched() {
    let live = MockServer::start().await;
    mount_device(&live, MAC_A, "1.3.0", false).await;
    let fw = tempfile::tempdir().unwrap();
    let engine = Engine::new(test_config(live.address().port(), fw.path())).unwrap();

    let a = seed(&engine, MAC_A, *live.address(), "1.2.0", true);
    let b = seed(&engine, MAC_B, "127.0.0.1:9".parse().unwrap(), "1.0.0", true);
    let before_b = engine.device(&b).unwrap();

    let summary = engine.refresh_status().await;

    assert_eq!(summary.responded, 1);
    assert_eq!(summary.silent, 1);
    let rec_a = engine.device(&a).unwrap();
    assert_eq!(rec_a.firmware_version, "1.3.0");
    assert!(!rec_a.ota_enabled);
    assert_eq!(engine.device(&b).unwrap(), before_b);
}

// ── Firmware checks ─────────────────────────────────────────────────

#[tokio::test]
async fn test_check_flags_outdated_online_devices() {
    let fw = tempfile::tempdir().unwrap();
    firmware_file(fw.path(), "ir_remote_v1.2.0.bin");
    firmware_file(fw.path(), "ir_remote_v1.3.0.bin");
    let engine = Engine::new(test_config(80, fw.path())).unwrap();

    let old = seed(&engine, MAC_A, "10.0.0.1:80".parse().unwrap(), "1.2.0", true);
    let current = seed(&engine, MAC_B, "10.0.0.2:80".parse().unwrap(), "1.3.0", true);
    let offline = seed(&engine, MAC_C, "10.0.0.3:80".parse().unwrap(), "1.0.0", true);
    engine
        .store()
        .update(&offline, |r| r.last_seen = Utc::now() - chrono::Duration::minutes(30));

    let latest = engine.check_firmware_updates().await.unwrap();

    assert_eq!(latest.as_deref(), Some("1.3.0"));
    assert_eq!(engine.latest_version().as_deref(), Some("1.3.0"));
    assert_eq!(engine.device(&old).unwrap().available_update.as_deref(), Some("1.3.0"));
    assert_eq!(engine.device(&current).unwrap().available_update, None);
    assert_eq!(engine.device(&offline).unwrap().available_update, None);

    let notice = engine.notifications().get(UPDATES_AVAILABLE_KEY).unwrap();
    assert_eq!(notice.kind, NotificationKind::UpdatesAvailable);
    assert!(notice.message.contains(&engine.device(&old).unwrap().display_name));
    assert!(!notice.message.contains(&engine.device(&current).unwrap().display_name));
}

#[tokio::test]
async fn test_check_notifies_only_newly_qualifying_devices() {
    let fw = tempfile::tempdir().unwrap();
    firmware_file(fw.path(), "ir_remote_v1.3.0.bin");
    let engine = Engine::new(test_config(80, fw.path())).unwrap();
    seed(&engine, MAC_A, "10.0.0.1:80".parse().unwrap(), "1.2.0", true);

    engine.check_firmware_updates().await.unwrap();
    assert!(engine.notifications().dismiss(UPDATES_AVAILABLE_KEY));

    engine.check_firmware_updates().await.unwrap();
    assert!(engine.notifications().get(UPDATES_AVAILABLE_KEY).is_none());
}

#[tokio::test]
async fn test_check_with_missing_directory_keeps_state() {
    let fw = tempfile::tempdir().unwrap();
    let engine = Engine::new(test_config(80, &fw.path().join("absent"))).unwrap();
    let id = seed(&engine, MAC_A, "10.0.0.1:80".parse().unwrap(), "1.2.0", true);
    engine
        .store()
        .update(&id, |r| r.available_update = Some("1.2.5".into()));

    let latest = engine.check_firmware_updates().await.unwrap();

    assert_eq!(latest, None);
    assert!(engine.catalog().is_empty());
    assert_eq!(engine.device(&id).unwrap().available_update.as_deref(), Some("1.2.5"));
}

// ── Single device updates ───────────────────────────────────────────

#[tokio::test]
async fn test_update_unknown_device() {
    let fw = tempfile::tempdir().unwrap();
    let engine = Engine::new(test_config(80, fw.path())).unwrap();

    let err = engine
        .update_device(&HardwareId::new("de:ad:be:ef:00:00"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::DeviceNotFound { .. }), "got {err:?}");
    assert!(engine.store().is_empty());
    assert!(engine.notifications().is_empty());
}

#[tokio::test]
async fn test_update_offline_device_keeps_state() {
    let fw = tempfile::tempdir().unwrap();
    let file = firmware_file(fw.path(), "ir_remote_v1.3.0.bin");
    let engine = Engine::new(test_config(80, fw.path())).unwrap();
    let id = seed(&engine, MAC_A, "10.0.0.1:80".parse().unwrap(), "1.2.0", true);
    engine.store().update(&id, |r| {
        r.last_seen = Utc::now() - chrono::Duration::minutes(11);
        r.update_state = UpdateState::Failed;
    });

    let err = engine.update_device(&id, Some(&file)).await.unwrap_err();

    assert!(matches!(err, CoreError::DeviceOffline { .. }), "got {err:?}");
    assert_eq!(engine.device(&id).unwrap().update_state, UpdateState::Failed);
    assert!(engine.notifications().is_empty());
}

#[tokio::test]
async fn test_update_without_firmware_stays_idle() {
    let fw = tempfile::tempdir().unwrap();
    let engine = Engine::new(test_config(80, fw.path())).unwrap();
    let id = seed(&engine, MAC_A, "10.0.0.1:80".parse().unwrap(), "1.2.0", true);

    let err = engine.update_device(&id, None).await.unwrap_err();

    assert!(matches!(err, CoreError::FirmwareNotFound { .. }), "got {err:?}");
    assert_eq!(engine.device(&id).unwrap().update_state, UpdateState::Idle);
}

#[tokio::test]
async fn test_update_with_latest_from_directory() {
    let server = MockServer::start().await;
    mount_device(&server, MAC_A, "1.3.0", true).await;
    Mock::given(method("POST"))
        .and(path("/update"))
        .and(wiremock::matchers::body_string_contains("ir_remote_v1.3.0.bin"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let fw = tempfile::tempdir().unwrap();
    firmware_file(fw.path(), "ir_remote_v1.2.0.bin");
    firmware_file(fw.path(), "ir_remote_v1.3.0.bin");
    let engine = Engine::new(test_config(server.address().port(), fw.path())).unwrap();
    let id = seed(&engine, MAC_A, *server.address(), "1.2.0", true);

    engine.check_firmware_updates().await.unwrap();
    engine.update_device(&id, None).await.unwrap();

    let rec = engine.device(&id).unwrap();
    assert_eq!(rec.update_state, UpdateState::Success);
    assert_eq!(rec.firmware_version, "1.3.0");
    assert_eq!(rec.available_update, None);
}

#[tokio::test]
async fn test_upload_failure_then_successful_retry() {
    let server = MockServer::start().await;
    mount_device(&server, MAC_A, "1.2.0", true).await;
    mount_upload(&server, 500).await;

    let fw = tempfile::tempdir().unwrap();
    let file = firmware_file(fw.path(), "ir_remote_v1.3.0.bin");
    let engine = Engine::new(test_config(server.address().port(), fw.path())).unwrap();
    let id = seed(&engine, MAC_A, *server.address(), "1.2.0", true);

    let err = engine.update_device(&id, Some(&file)).await.unwrap_err();
    assert!(matches!(err, CoreError::UploadRejected { status: 500 }), "got {err:?}");
    assert_eq!(engine.device(&id).unwrap().update_state, UpdateState::Failed);
    assert_eq!(engine.notifications().len(), 1);
    let failed = engine.notifications().get(id.as_str()).unwrap();
    assert_eq!(failed.kind, NotificationKind::UpdateFailed);
    assert!(failed.detail.unwrap().contains("500"));

    server.reset().await;
    mount_device(&server, MAC_A, "1.3.0", true).await;
    mount_upload(&server, 200).await;

    engine.update_device(&id, Some(&file)).await.unwrap();
    assert_eq!(engine.device(&id).unwrap().update_state, UpdateState::Success);
    assert_eq!(engine.notifications().len(), 1);
    let succeeded = engine.notifications().get(id.as_str()).unwrap();
    assert_eq!(succeeded.kind, NotificationKind::UpdateSucceeded);
}

#[tokio::test]
async fn test_enable_ota_failure_fails_update() {
    let server = MockServer::start().await;
    mount_device(&server, MAC_A, "1.2.0", false).await;
    Mock::given(method("POST"))
        .and(path("/api/ota/enable"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/update"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fw = tempfile::tempdir().unwrap();
    let file = firmware_file(fw.path(), "ir_remote_v1.3.0.bin");
    let engine = Engine::new(test_config(server.address().port(), fw.path())).unwrap();
    let id = seed(&engine, MAC_A, *server.address(), "1.2.0", false);

    let err = engine.update_device(&id, Some(&file)).await.unwrap_err();

    assert!(matches!(err, CoreError::OtaEnableFailed { .. }), "got {err:?}");
    let rec = engine.device(&id).unwrap();
    assert_eq!(rec.update_state, UpdateState::Failed);
    assert!(!rec.ota_enabled);
    assert_eq!(
        engine.notifications().get(id.as_str()).unwrap().kind,
        NotificationKind::UpdateFailed
    );
}

#[tokio::test]
async fn test_update_enables_ota_when_needed() {
    let server = MockServer::start().await;
    mount_device(&server, MAC_A, "1.3.0", true).await;
    Mock::given(method("POST"))
        .and(path("/api/ota/enable"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_upload(&server, 200).await;

    let fw = tempfile::tempdir().unwrap();
    let file = firmware_file(fw.path(), "ir_remote_v1.3.0.bin");
    let engine = Engine::new(test_config(server.address().port(), fw.path())).unwrap();
    let id = seed(&engine, MAC_A, *server.address(), "1.2.0", false);

    engine.update_device(&id, Some(&file)).await.unwrap();
    assert_eq!(engine.device(&id).unwrap().update_state, UpdateState::Success);
}

#[tokio::test]
async fn test_image_gone_at_download_fails_update() {
    let server = MockServer::start().await;
    mount_device(&server, MAC_A, "1.2.0", true).await;
    Mock::given(method("POST"))
        .and(path("/update"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fw = tempfile::tempdir().unwrap();
    let file = firmware_file(fw.path(), "ir_remote_v1.3.0.bin");
    let engine = Engine::new(test_config(server.address().port(), fw.path())).unwrap();
    let id = seed(&engine, MAC_A, *server.address(), "1.2.0", true);
    engine.check_firmware_updates().await.unwrap();

    // The catalog still points at the file; reading it fails.
    std::fs::remove_file(&file).unwrap();
    let err = engine.update_device(&id, None).await.unwrap_err();

    assert!(matches!(err, CoreError::Io(_)), "got {err:?}");
    let rec = engine.device(&id).unwrap();
    assert_eq!(rec.update_state, UpdateState::Failed);
    assert_eq!(rec.available_update.as_deref(), Some("1.3.0"));
    let failed = engine.notifications().get(id.as_str()).unwrap();
    assert_eq!(failed.kind, NotificationKind::UpdateFailed);
}

#[tokio::test]
async fn test_upload_timeout_fails_update() {
    let server = MockServer::start().await;
    mount_device(&server, MAC_A, "1.2.0", true).await;
    Mock::given(method("POST"))
        .and(path("/update"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let fw = tempfile::tempdir().unwrap();
    let file = firmware_file(fw.path(), "ir_remote_v1.3.0.bin");
    let mut config = test_config(server.address().port(), fw.path());
    config.timings.upload_timeout = Duration::from_secs(1);
    let engine = Engine::new(config).unwrap();
    let id = seed(&engine, MAC_A, *server.address(), "1.2.0", true);

    let err = engine.update_device(&id, Some(&file)).await.unwrap_err();

    assert!(
        matches!(err, CoreError::Timeout { timeout_secs: Some(1) }),
        "got {err:?}"
    );
    assert_eq!(engine.device(&id).unwrap().update_state, UpdateState::Failed);
    let failed = engine.notifications().get(id.as_str()).unwrap();
    assert_eq!(failed.kind, NotificationKind::UpdateFailed);
    assert!(failed.detail.unwrap().contains("timed out after 1s"));
}

// ── OTA toggles ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_ota_toggles() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ota/enable"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/ota/disable"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fw = tempfile::tempdir().unwrap();
    let engine = Engine::new(test_config(server.address().port(), fw.path())).unwrap();
    let id = seed(&engine, MAC_A, *server.address(), "1.2.0", false);

    assert!(engine.enable_ota(&id).await);
    assert!(engine.device(&id).unwrap().ota_enabled);

    assert!(!engine.disable_ota(&id).await);
    assert!(engine.device(&id).unwrap().ota_enabled);

    assert!(!engine.enable_ota(&HardwareId::new("00")).await);
}

// ── Batch updates ───────────────────────────────────────────────────

#[tokio::test]
async fn test_update_all_continues_after_failure() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    let third = MockServer::start().await;
    mount_device(&first, MAC_A, "1.3.0", true).await;
    mount_device(&second, MAC_B, "1.2.0", true).await;
    mount_device(&third, MAC_C, "1.3.0", true).await;
    mount_upload(&first, 200).await;
    mount_upload(&second, 500).await;
    mount_upload(&third, 200).await;

    let fw = tempfile::tempdir().unwrap();
    let file = firmware_file(fw.path(), "ir_remote_v1.3.0.bin");
    let engine = Engine::new(test_config(80, fw.path())).unwrap();
    let a = seed(&engine, MAC_A, *first.address(), "1.2.0", true);
    let b = seed(&engine, MAC_B, *second.address(), "1.2.0", true);
    let c = seed(&engine, MAC_C, *third.address(), "1.2.0", true);

    let results = engine.update_all_devices(Some(&file), &[]).await;

    assert_eq!(results.len(), 3);
    assert!(results[&a]);
    assert!(!results[&b]);
    assert!(results[&c]);
    assert_eq!(engine.device(&c).unwrap().update_state, UpdateState::Success);
}

#[tokio::test]
async fn test_update_all_skips_excluded_and_current_devices() {
    let server = MockServer::start().await;
    mount_device(&server, MAC_A, "1.3.0", true).await;
    mount_upload(&server, 200).await;

    let fw = tempfile::tempdir().unwrap();
    firmware_file(fw.path(), "ir_remote_v1.3.0.bin");
    let mut config = test_config(80, fw.path());
    config.exclude = vec![MAC_C.to_lowercase()];
    let engine = Engine::new(config).unwrap();

    let a = seed(&engine, MAC_A, *server.address(), "1.2.0", true);
    seed(&engine, MAC_B, "10.0.0.2:80".parse().unwrap(), "1.3.0", true);
    seed(&engine, MAC_C, "10.0.0.3:80".parse().unwrap(), "1.2.0", true);
    engine.check_firmware_updates().await.unwrap();

    let results = engine.update_all_devices(None, &[]).await;

    assert_eq!(results.keys().cloned().collect::<Vec<_>>(), vec![a]);
}

// ── Lookup ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_resolve_device_by_id_ip_or_name() {
    let fw = tempfile::tempdir().unwrap();
    let engine = Engine::new(test_config(80, fw.path())).unwrap();
    let id = seed(&engine, MAC_A, "10.0.0.7:80".parse().unwrap(), "1.2.0", true);
    let name = engine.device(&id).unwrap().display_name;

    assert_eq!(engine.resolve_device(MAC_A), Some(id.clone()));
    assert_eq!(engine.resolve_device("10.0.0.7"), Some(id.clone()));
    assert_eq!(engine.resolve_device(&name.to_uppercase()), Some(id));
    assert_eq!(engine.resolve_device("nobody"), None);
}

// ── Background loop ─────────────────────────────────────────────────

#[tokio::test]
async fn test_run_stops_on_cancel() {
    let fw = tempfile::tempdir().unwrap();
    let engine = Engine::new(test_config(9, fw.path())).unwrap();
    let cancel = tokio_util::sync::CancellationToken::new();

    let handle = tokio::spawn({
        let engine = engine.clone();
        let cancel = cancel.clone();
        async move { engine.run(cancel).await }
    });
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
