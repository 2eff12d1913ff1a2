use crate::models::System;
use crate::services::systems;
use crate::store::KeyValueStore;
use std::sync::Arc;

pub struct SystemsCatalogPage {
    store: Arc<KeyValueStore>,
    query: String,
    systems: Vec<System>,
}

impl SystemsCatalogPage {
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        let systems = systems::get_all_systems(&store);
        Self {
            store,
            query: String::new(),
            systems,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.systems = systems::search_systems(&self.store, query);
    }

    pub fn systems(&self) -> &[System] {
        &self.systems
    }

    pub fn is_empty_result(&self) -> bool {
        self.systems.is_empty()
    }

    /// URL to open for a system card.
    pub fn open(&self, system_id: &str) -> Option<String> {
        self.systems
            .iter()
            .find(|system| system.id == system_id)
            .map(|system| system.url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_narrows_and_clearing_restores() {
        let store = Arc::new(KeyValueStore::open_in_memory("test").expect("store"));
        systems::initialize(&store);
        let mut page = SystemsCatalogPage::new(store);
        assert_eq!(page.systems().len(), 8);

        page.set_query("sbis");
        assert_eq!(page.systems().len(), 1);
        assert_eq!(page.open("sbis").as_deref(), Some("#"));
        assert_eq!(page.open("itsm"), None);

        page.set_query("nonexistent-xyz");
        assert!(page.is_empty_result());

        page.set_query("");
        assert_eq!(page.systems().len(), 8);
    }
}
