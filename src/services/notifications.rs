use crate::models::{NewNotification, Notification, NotificationKind};
use crate::services::{delete_by_id, seed_collection, seed_time};
use crate::store::KeyValueStore;
use chrono::{DateTime, TimeDelta, Utc};
use once_cell::sync::Lazy;
use uuid::Uuid;

const STORAGE_KEY: &str = "notifications";

static DEFAULT_NOTIFICATIONS: Lazy<Vec<Notification>> = Lazy::new(|| {
    vec![
        Notification {
            id: "notification-001".to_string(),
            title: "Request #1110037 has been completed".to_string(),
            description: "The training request was completed successfully".to_string(),
            created_at: seed_time(2024, 2, 26, 10, 15),
            read: false,
            url: Some("#".to_string()),
            document_number: Some("1110037".to_string()),
            system: Some("HRSM".to_string()),
            kind: NotificationKind::Success,
        },
        Notification {
            id: "notification-002".to_string(),
            title: "Vacation transfer request #1110025 approved".to_string(),
            description: "The request was approved by your manager".to_string(),
            created_at: seed_time(2024, 2, 26, 10, 17),
            read: false,
            url: Some("#".to_string()),
            document_number: Some("1110025".to_string()),
            system: Some("HRSM".to_string()),
            kind: NotificationKind::Info,
        },
        Notification {
            id: "notification-003".to_string(),
            title: "Vacation transfer request #1110010 requires approval".to_string(),
            description: "A new request is waiting for your approval".to_string(),
            created_at: seed_time(2024, 2, 26, 10, 10),
            read: true,
            url: Some("#".to_string()),
            document_number: Some("1110010".to_string()),
            system: Some("HRSM".to_string()),
            kind: NotificationKind::Warning,
        },
        Notification {
            id: "notification-004".to_string(),
            title: "The service catalog has been updated".to_string(),
            description: "The list of available services was refreshed".to_string(),
            created_at: seed_time(2024, 2, 23, 22, 38),
            read: true,
            url: None,
            document_number: None,
            system: Some("Service Portal".to_string()),
            kind: NotificationKind::Info,
        },
        Notification {
            id: "notification-005".to_string(),
            title: "2 people were added to your group".to_string(),
            description: "2 new employees joined the \"Developers\" group".to_string(),
            created_at: seed_time(2024, 2, 2, 23, 58),
            read: true,
            url: None,
            document_number: None,
            system: Some("AD".to_string()),
            kind: NotificationKind::Info,
        },
    ]
});

pub fn initialize(store: &KeyValueStore) {
    seed_collection(store, STORAGE_KEY, DEFAULT_NOTIFICATIONS.as_slice());
}

/// Newest first, as stored.
pub fn get_all_notifications(store: &KeyValueStore) -> Vec<Notification> {
    store.get(STORAGE_KEY, DEFAULT_NOTIFICATIONS.to_vec())
}

pub fn get_unread_count(store: &KeyValueStore) -> usize {
    get_all_notifications(store)
        .iter()
        .filter(|notification| !notification.read)
        .count()
}

pub fn get_unread_notifications(store: &KeyValueStore) -> Vec<Notification> {
    get_all_notifications(store)
        .into_iter()
        .filter(|notification| !notification.read)
        .collect()
}

pub fn mark_as_read(store: &KeyValueStore, notification_id: &str) {
    let mut notifications = get_all_notifications(store);
    let Some(notification) = notifications
        .iter_mut()
        .find(|notification| notification.id == notification_id)
    else {
        return;
    };
    notification.read = true;
    store.set(STORAGE_KEY, &notifications);
}

pub fn mark_all_as_read(store: &KeyValueStore) {
    let mut notifications = get_all_notifications(store);
    for notification in notifications.iter_mut() {
        notification.read = true;
    }
    store.set(STORAGE_KEY, &notifications);
}

pub fn add_notification(store: &KeyValueStore, notification: NewNotification) -> Notification {
    add_notification_at(store, notification, Utc::now())
}

/// Prepends a new unread notification stamped with a fresh id and `now`.
pub fn add_notification_at(
    store: &KeyValueStore,
    notification: NewNotification,
    now: DateTime<Utc>,
) -> Notification {
    let created = Notification {
        id: format!("notification-{}", Uuid::new_v4().simple()),
        title: notification.title,
        description: notification.description,
        created_at: now,
        read: false,
        url: notification.url,
        document_number: notification.document_number,
        system: notification.system,
        kind: notification.kind,
    };

    let mut notifications = get_all_notifications(store);
    notifications.insert(0, created.clone());
    store.set(STORAGE_KEY, &notifications);
    tracing::debug!(notification_id = %created.id, "added notification");
    created
}

pub fn delete_notification(store: &KeyValueStore, notification_id: &str) {
    delete_by_id(store, STORAGE_KEY, DEFAULT_NOTIFICATIONS.as_slice(), notification_id);
}

pub fn clear_old_notifications(store: &KeyValueStore, days: u32) -> usize {
    clear_old_notifications_at(store, days, Utc::now())
}

/// Drops read notifications created before `now - days`. Unread ones are
/// always kept. Returns how many were removed. A window reaching past the
/// earliest representable date removes nothing.
pub fn clear_old_notifications_at(store: &KeyValueStore, days: u32, now: DateTime<Utc>) -> usize {
    let cutoff = TimeDelta::try_days(i64::from(days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let mut notifications = get_all_notifications(store);
    let before = notifications.len();

    notifications.retain(|notification| !notification.read || notification.created_at >= cutoff);

    let removed = before - notifications.len();
    store.set(STORAGE_KEY, &notifications);
    if removed > 0 {
        tracing::debug!(removed, days, "cleared old notifications");
    }
    removed
}
