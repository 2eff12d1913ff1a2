//! Entity data services.
//!
//! Each submodule owns one collection in the [`KeyValueStore`]: it seeds the
//! built-in dataset on first use and exposes free functions over the store
//! handle. Lookups that miss return `None` or an empty list; mutations of
//! unknown ids are silent no-ops.

pub mod admin;
pub mod catalog;
pub mod notifications;
pub mod preferences;
pub mod requests;
pub mod systems;
pub mod tasks;
pub mod users;

use crate::models::{
    ConfigItem, GlobalParameter, Notification, PortalStats, Request, Service, ServiceGroup, System, Task, User,
    UserGroup,
};
use crate::store::KeyValueStore;
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) trait Identified {
    fn id(&self) -> &str;
}

macro_rules! impl_identified {
    ($($ty:ty),* $(,)?) => {
        $(impl Identified for $ty {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

impl_identified!(System, Service, ServiceGroup, Request, Task, Notification, User, ConfigItem, GlobalParameter, UserGroup);

/// Seeds every collection and reports how many records each one holds.
pub fn initialize_all(store: &KeyValueStore) -> PortalStats {
    catalog::initialize(store);
    systems::initialize(store);
    requests::initialize(store);
    tasks::initialize(store);
    notifications::initialize(store);
    admin::initialize(store);
    users::initialize(store);

    let stats = collect_stats(store);
    tracing::info!(
        service_groups = stats.service_groups,
        systems = stats.systems,
        requests = stats.requests,
        tasks = stats.tasks,
        notifications = stats.notifications,
        config_items = stats.config_items,
        global_params = stats.global_params,
        users = stats.users,
        "data services initialized"
    );
    stats
}

/// Counts what each collection currently holds without seeding or rewriting anything.
pub fn collect_stats(store: &KeyValueStore) -> PortalStats {
    PortalStats {
        service_groups: catalog::get_all_service_groups(store).len(),
        systems: systems::get_all_systems(store).len(),
        requests: requests::get_all_requests(store).len(),
        tasks: tasks::get_all_tasks(store).len(),
        notifications: notifications::get_all_notifications(store).len(),
        config_items: admin::get_all_config_items(store).len(),
        global_params: admin::get_all_global_params(store).len(),
        users: users::get_all_users(store).len(),
    }
}

/// Writes `defaults` under `key` unless a non-empty collection is already stored.
pub(crate) fn seed_collection<T>(store: &KeyValueStore, key: &str, defaults: &[T])
where
    T: Serialize + DeserializeOwned,
{
    let existing: Vec<T> = store.get(key, Vec::new());
    if existing.is_empty() {
        tracing::debug!(key, count = defaults.len(), "seeding default collection");
        store.set(key, defaults);
    }
}

/// Replaces the record with the same id in place, or appends it.
pub(crate) fn upsert<T: Identified>(items: &mut Vec<T>, item: T) {
    match items.iter().position(|existing| existing.id() == item.id()) {
        Some(index) => items[index] = item,
        None => items.push(item),
    }
}

pub(crate) fn find_by_id<T: Identified>(items: Vec<T>, id: &str) -> Option<T> {
    items.into_iter().find(|item| item.id() == id)
}

/// Rewrites `key` without the record `id`; unknown ids leave the collection as is.
pub(crate) fn delete_by_id<T>(store: &KeyValueStore, key: &str, defaults: &[T], id: &str)
where
    T: Identified + Clone + Serialize + DeserializeOwned,
{
    let mut items: Vec<T> = store.get(key, defaults.to_vec());
    items.retain(|item| item.id() != id);
    store.set(key, &items);
}

/// Lowercased search needle; an empty string counts as absent.
pub(crate) fn normalize_query(query: Option<&str>) -> Option<String> {
    query
        .filter(|value| !value.is_empty())
        .map(|value| value.to_lowercase())
}

pub(crate) fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Builds a seed timestamp; invalid components fall back to the epoch.
pub(crate) fn seed_time(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_all_reports_seeded_counts() {
        let store = KeyValueStore::open_in_memory("test").expect("store");
        let stats = initialize_all(&store);
        assert_eq!(stats.service_groups, 3);
        assert_eq!(stats.systems, 8);
        assert_eq!(stats.requests, 5);
        assert_eq!(stats.tasks, 5);
        assert_eq!(stats.notifications, 5);
        assert_eq!(stats.config_items, 4);
        assert_eq!(stats.global_params, 6);
        assert_eq!(stats.users, 5);
    }

    #[test]
    fn collect_stats_does_not_reseed() {
        let store = KeyValueStore::open_in_memory("test").expect("store");
        collect_stats(&store);
        assert!(store.keys().is_empty());

        initialize_all(&store);
        store.set("tasks", &Vec::<Task>::new());
        assert_eq!(collect_stats(&store).tasks, 0);
        assert_eq!(tasks::get_all_tasks(&store).len(), 0);
    }

    #[test]
    fn seeding_does_not_overwrite_existing_data() {
        let store = KeyValueStore::open_in_memory("test").expect("store");
        store.set(
            "systems",
            &vec![System {
                id: "only".to_string(),
                name: "Only".to_string(),
                description: String::new(),
                url: "#".to_string(),
            }],
        );
        systems::initialize(&store);
        assert_eq!(systems::get_all_systems(&store).len(), 1);
    }

    #[test]
    fn blank_query_is_absent() {
        assert_eq!(normalize_query(Some("")), None);
        assert_eq!(normalize_query(None), None);
        assert_eq!(normalize_query(Some("ITSM")).as_deref(), Some("itsm"));
    }
}
