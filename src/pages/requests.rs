use crate::models::{Request, RequestFilters, User, ViewMode};
use crate::services::{preferences, requests, users};
use crate::store::KeyValueStore;
use std::sync::Arc;

const PAGE_KEY: &str = "requests";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestGroup {
    /// Authored by the current user.
    #[default]
    My,
    /// Open requests waiting on the current user.
    Approval,
    All,
}

pub struct RequestsPage {
    store: Arc<KeyValueStore>,
    current_user: User,
    view_mode: ViewMode,
    group: RequestGroup,
    filters: RequestFilters,
}

impl RequestsPage {
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        let current_user = users::get_current_user(&store);
        let view_mode = preferences::get_view_mode(&store, PAGE_KEY);
        Self {
            store,
            current_user,
            view_mode,
            group: RequestGroup::default(),
            filters: RequestFilters::default(),
        }
    }

    pub fn current_user(&self) -> &User {
        &self.current_user
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// Switches table/cards and remembers the choice for next time.
    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
        preferences::set_view_mode(&self.store, PAGE_KEY, mode);
    }

    pub fn group(&self) -> RequestGroup {
        self.group
    }

    pub fn set_group(&mut self, group: RequestGroup) {
        self.group = group;
    }

    pub fn filters(&self) -> &RequestFilters {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: RequestFilters) {
        self.filters = filters;
    }

    pub fn reset_filters(&mut self) {
        self.filters = RequestFilters::default();
    }

    pub fn requests(&self) -> Vec<Request> {
        let base = match self.group {
            RequestGroup::My => requests::get_user_requests(&self.store, &self.current_user.id),
            RequestGroup::Approval => requests::get_user_approving_requests(&self.store, &self.current_user.id),
            RequestGroup::All => requests::get_all_requests(&self.store),
        };
        requests::apply_request_filters(base, &self.filters, false)
    }

    pub fn system_options(&self) -> Vec<(String, String)> {
        super::system_options(&self.store)
    }

    /// Remembers the request as last viewed and returns its URL.
    pub fn open_request(&self, request_id: &str) -> Option<String> {
        let request = requests::get_request_by_id(&self.store, request_id)?;
        preferences::set_last_viewed_request(&self.store, &request.id);
        Some(request.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequestStatus;
    use crate::services::initialize_all;

    fn store() -> Arc<KeyValueStore> {
        let store = Arc::new(KeyValueStore::open_in_memory("test").expect("store"));
        initialize_all(&store);
        store
    }

    fn ids(requests: Vec<Request>) -> Vec<String> {
        requests.into_iter().map(|request| request.id).collect()
    }

    #[test]
    fn groups_are_relative_to_current_user() {
        let store = store();
        let mut page = RequestsPage::new(store.clone());
        assert_eq!(page.current_user().id, "user1");
        assert_eq!(ids(page.requests()), vec!["req-001", "req-002", "req-003", "req-005"]);

        page.set_group(RequestGroup::Approval);
        assert!(page.requests().is_empty());

        let user3 = users::get_user_by_id(&store, "user3").expect("user3");
        users::set_current_user(&store, &user3);
        let mut page = RequestsPage::new(store);
        page.set_group(RequestGroup::Approval);
        assert_eq!(ids(page.requests()), vec!["req-002"]);
    }

    #[test]
    fn filters_apply_within_group() {
        let mut page = RequestsPage::new(store());
        page.set_group(RequestGroup::All);
        page.set_filters(RequestFilters {
            status: Some(RequestStatus::InProgress),
            ..RequestFilters::default()
        });
        assert_eq!(ids(page.requests()), vec!["req-003"]);

        page.reset_filters();
        assert_eq!(page.requests().len(), 5);
    }

    #[test]
    fn view_mode_survives_reopening() {
        let store = store();
        let mut page = RequestsPage::new(store.clone());
        assert_eq!(page.view_mode(), ViewMode::Table);
        page.set_view_mode(ViewMode::Cards);

        let reopened = RequestsPage::new(store.clone());
        assert_eq!(reopened.view_mode(), ViewMode::Cards);

        assert_eq!(reopened.open_request("req-004").as_deref(), Some("#"));
        assert_eq!(preferences::get_last_viewed_request(&store).as_deref(), Some("req-004"));
        assert_eq!(reopened.open_request("missing"), None);
    }
}
