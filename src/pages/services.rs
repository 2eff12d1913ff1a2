use crate::models::{Service, ServiceGroup};
use crate::services::{catalog, contains_ci, preferences};
use crate::store::KeyValueStore;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogTab {
    #[default]
    All,
    Popular,
    Recent,
}

/// What the catalog body renders for the active tab.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogView {
    Groups(Vec<ServiceGroup>),
    Services(Vec<Service>),
}

pub struct ServicesCatalogPage {
    store: Arc<KeyValueStore>,
    query: String,
    tab: CatalogTab,
}

impl ServicesCatalogPage {
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        Self {
            store,
            query: String::new(),
            tab: CatalogTab::default(),
        }
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
    }

    pub fn set_tab(&mut self, tab: CatalogTab) {
        self.tab = tab;
    }

    pub fn tab(&self) -> CatalogTab {
        self.tab
    }

    /// The grouped tree on the "all" tab, a flat list on the others. The
    /// current query applies to every tab.
    pub fn view(&self) -> CatalogView {
        match self.tab {
            CatalogTab::All => CatalogView::Groups(catalog::search_services(&self.store, &self.query)),
            CatalogTab::Popular => CatalogView::Services(self.matching(catalog::get_popular_services(&self.store))),
            CatalogTab::Recent => {
                let recent = preferences::get_recent_services(&self.store)
                    .iter()
                    .filter_map(|service_id| catalog::get_service_by_id(&self.store, service_id))
                    .collect();
                CatalogView::Services(self.matching(recent))
            }
        }
    }

    fn matching(&self, services: Vec<Service>) -> Vec<Service> {
        if self.query.trim().is_empty() {
            return services;
        }
        let needle = self.query.to_lowercase();
        services
            .into_iter()
            .filter(|service| contains_ci(&service.name, &needle) || contains_ci(&service.description, &needle))
            .collect()
    }

    /// Records the service as recently used and returns the URL to open.
    pub fn select_service(&self, service_id: &str) -> Option<String> {
        let service = catalog::get_service_by_id(&self.store, service_id)?;
        preferences::record_recent_service(&self.store, &service.id);
        Some(service.url)
    }
}
