// ── Notifications ──
//
// Structured events for an external alerting sink. Notifications are kept
// per key with replace semantics, so re-notifying a device overwrites its
// previous outcome. Every emission is also broadcast to live subscribers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use strum::Display;
use tokio::sync::broadcast;
use tracing::debug;

use crate::model::HardwareId;

/// Key of the batched "updates available" notice.
pub const UPDATES_AVAILABLE_KEY: &str = "updates_available";

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    UpdatesAvailable,
    UpdateSucceeded,
    UpdateFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub key: String,
    pub title: String,
    pub message: String,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn updates_available(device_names: &[String]) -> Self {
        Self {
            kind: NotificationKind::UpdatesAvailable,
            key: UPDATES_AVAILABLE_KEY.into(),
            title: "IR Remote Firmware Updates Available".into(),
            message: format!("Firmware updates available for: {}", device_names.join(", ")),
            detail: None,
            created_at: Utc::now(),
        }
    }

    pub fn update_succeeded(id: &HardwareId, name: &str, version: &str) -> Self {
        Self {
            kind: NotificationKind::UpdateSucceeded,
            key: id.to_string(),
            title: "IR Remote Update Success".into(),
            message: format!("Successfully updated {name}"),
            detail: Some(format!("running {version}")),
            created_at: Utc::now(),
        }
    }

    pub fn update_failed(id: &HardwareId, name: &str, error: &str) -> Self {
        Self {
            kind: NotificationKind::UpdateFailed,
            key: id.to_string(),
            title: "IR Remote Update Failed".into(),
            message: format!("Failed to update {name}"),
            detail: Some(error.to_owned()),
            created_at: Utc::now(),
        }
    }
}

/// Keyed notification store plus a broadcast feed. Cheap to clone.
#[derive(Clone)]
pub struct Notifications {
    inner: Arc<NotificationsInner>,
}

struct NotificationsInner {
    by_key: DashMap<String, Notification>,
    feed: broadcast::Sender<Notification>,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifications {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(NotificationsInner {
                by_key: DashMap::new(),
                feed,
            }),
        }
    }

    /// Store (replacing any notification with the same key) and broadcast.
    pub fn emit(&self, notification: Notification) {
        debug!(key = %notification.key, kind = %notification.kind, "notification");
        self.inner
            .by_key
            .insert(notification.key.clone(), notification.clone());
        // No receivers is fine; the keyed store still holds it.
        let _ = self.inner.feed.send(notification);
    }

    pub fn get(&self, key: &str) -> Option<Notification> {
        self.inner.by_key.get(key).map(|n| n.value().clone())
    }

    /// All active notifications, oldest first.
    pub fn active(&self) -> Vec<Notification> {
        let mut all: Vec<Notification> =
            self.inner.by_key.iter().map(|n| n.value().clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.key.cmp(&b.key)));
        all
    }

    pub fn len(&self) -> usize {
        self.inner.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.by_key.is_empty()
    }

    /// Remove one notification. Returns `true` if it existed.
    pub fn dismiss(&self, key: &str) -> bool {
        self.inner.by_key.remove(key).is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.inner.feed.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn same_key_replaces() {
        let hub = Notifications::new();
        let id = HardwareId::new("aabbccddeeff");

        hub.emit(Notification::update_failed(&id, "den", "HTTP 500"));
        hub.emit(Notification::update_succeeded(&id, "den", "1.3.0"));

        assert_eq!(hub.len(), 1);
        let n = hub.get("aabbccddeeff").unwrap();
        assert_eq!(n.kind, NotificationKind::UpdateSucceeded);
        assert_eq!(n.message, "Successfully updated den");
    }

    #[test]
    fn dismiss_removes_key() {
        let hub = Notifications::new();
        hub.emit(Notification::updates_available(&["a".into(), "b".into()]));

        let n = hub.get(UPDATES_AVAILABLE_KEY).unwrap();
        assert_eq!(n.message, "Firmware updates available for: a, b");
        assert!(hub.dismiss(UPDATES_AVAILABLE_KEY));
        assert!(!hub.dismiss(UPDATES_AVAILABLE_KEY));
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn subscribers_receive_emissions() {
        let hub = Notifications::new();
        let mut rx = hub.subscribe();
        let id = HardwareId::new("01");

        hub.emit(Notification::update_failed(&id, "x", "boom"));

        let got = rx.recv().await.unwrap();
        assert_eq!(got.kind, NotificationKind::UpdateFailed);
        assert_eq!(got.detail.as_deref(), Some("boom"));
    }
}
