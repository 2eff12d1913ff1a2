use crate::models::{Request, RequestFilters, SupportSearchFilters, User, ViewMode};
use crate::services::{admin, requests, users};
use crate::store::KeyValueStore;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupportTab {
    #[default]
    All,
    /// new, in progress or on approval
    Active,
    /// completed, closed or cancelled
    Closed,
}

/// Support desk: look up an employee and browse their requests.
///
/// Only support specialists get results; for anyone else the page stays
/// empty.
pub struct SupportPage {
    store: Arc<KeyValueStore>,
    has_access: bool,
    search: SupportSearchFilters,
    user_results: Vec<User>,
    selected_user: Option<User>,
    user_requests: Vec<Request>,
    tab: SupportTab,
    view_mode: ViewMode,
}

impl SupportPage {
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        let current = users::get_current_user(&store);
        let has_access = admin::is_support_specialist(&store, &current.id);
        if !has_access {
            tracing::warn!(user_id = %current.id, "support desk opened without support specialist rights");
        }

        Self {
            store,
            has_access,
            search: SupportSearchFilters::default(),
            user_results: Vec::new(),
            selected_user: None,
            user_requests: Vec::new(),
            tab: SupportTab::default(),
            view_mode: ViewMode::default(),
        }
    }

    pub fn has_access(&self) -> bool {
        self.has_access
    }

    pub fn set_user_query(&mut self, query: &str) {
        self.search.user_query = query.to_string();
        self.user_results = if self.has_access {
            users::search_users(&self.store, query)
        } else {
            Vec::new()
        };
    }

    pub fn user_results(&self) -> &[User] {
        &self.user_results
    }

    /// Selecting (or clearing) a user resets the filters and the tab.
    pub fn select_user(&mut self, user_id: Option<&str>) {
        self.search.requests = RequestFilters::default();
        self.tab = SupportTab::All;

        let user = user_id
            .filter(|_| self.has_access)
            .and_then(|id| users::get_user_by_id(&self.store, id));
        self.user_requests = match &user {
            Some(user) => requests::get_user_requests(&self.store, &user.id),
            None => Vec::new(),
        };
        if let Some(user) = &user {
            tracing::debug!(user_id = %user.id, requests = self.user_requests.len(), "loaded user requests");
        }
        self.selected_user = user;
    }

    pub fn selected_user(&self) -> Option<&User> {
        self.selected_user.as_ref()
    }

    pub fn tab(&self) -> SupportTab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: SupportTab) {
        self.tab = tab;
    }

    /// The user lookup text and the request filters together.
    pub fn search(&self) -> &SupportSearchFilters {
        &self.search
    }

    pub fn filters(&self) -> &RequestFilters {
        &self.search.requests
    }

    pub fn set_filters(&mut self, filters: RequestFilters) {
        self.search.requests = filters;
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn system_options(&self) -> Vec<(String, String)> {
        super::system_options(&self.store)
    }

    /// The selected user's requests for the active tab and filters. Free
    /// text also matches the system name here.
    pub fn requests(&self) -> Vec<Request> {
        let mut in_tab = self.user_requests.clone();
        match self.tab {
            SupportTab::All => {}
            SupportTab::Active => in_tab.retain(|request| request.status.is_open()),
            SupportTab::Closed => in_tab.retain(|request| !request.status.is_open()),
        }
        requests::apply_request_filters(in_tab, &self.search.requests, true)
    }
}
