//! UI preferences kept next to the entity collections.

use crate::models::ViewMode;
use crate::store::KeyValueStore;

const RECENT_SERVICES_KEY: &str = "recent_services";
const LAST_VIEWED_REQUEST_KEY: &str = "last_viewed_request";
pub const RECENT_SERVICES_LIMIT: usize = 5;

fn view_mode_key(page: &str) -> String {
    format!("view_mode_{page}")
}

pub fn get_view_mode(store: &KeyValueStore, page: &str) -> ViewMode {
    store.get(&view_mode_key(page), ViewMode::default())
}

pub fn set_view_mode(store: &KeyValueStore, page: &str, mode: ViewMode) {
    store.set(&view_mode_key(page), &mode);
}

/// Most recent first.
pub fn get_recent_services(store: &KeyValueStore) -> Vec<String> {
    store.get(RECENT_SERVICES_KEY, Vec::new())
}

/// Moves `service_id` to the front, dropping any earlier occurrence and
/// anything past the limit.
pub fn record_recent_service(store: &KeyValueStore, service_id: &str) -> Vec<String> {
    let mut recent = get_recent_services(store);
    recent.retain(|id| id != service_id);
    recent.insert(0, service_id.to_string());
    recent.truncate(RECENT_SERVICES_LIMIT);
    store.set(RECENT_SERVICES_KEY, &recent);
    recent
}

pub fn get_last_viewed_request(store: &KeyValueStore) -> Option<String> {
    store.get(LAST_VIEWED_REQUEST_KEY, None)
}

pub fn set_last_viewed_request(store: &KeyValueStore, request_id: &str) {
    store.set(LAST_VIEWED_REQUEST_KEY, request_id);
}
