use crate::models::System;
use crate::services::{contains_ci, delete_by_id, find_by_id, seed_collection, upsert};
use crate::store::KeyValueStore;
use once_cell::sync::Lazy;

const STORAGE_KEY: &str = "systems";

static DEFAULT_SYSTEMS: Lazy<Vec<System>> = Lazy::new(|| {
    [
        ("itsm", "ITSM", "IT service and incident management. Used to order IT services and equipment."),
        ("mpg", "MPG (ESM + Finance)", "Facilities services and financial requests of the company."),
        ("hrsm", "HRSM", "Human resources management. Used to order HR services."),
        ("progress", "Progress", "Staff training and development."),
        ("sed", "EDMS", "Electronic document management for internal documents."),
        ("sbis", "SBIS", "Electronic document exchange with external counterparties."),
        ("t1", "T1 Nota Union", "Budgeting, planning and reporting."),
        ("zup", "1C Payroll", "HR records, payroll and personnel management on the 1C platform."),
    ]
    .into_iter()
    .map(|(id, name, description)| System {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        url: "#".to_string(),
    })
    .collect()
});

pub fn initialize(store: &KeyValueStore) {
    seed_collection(store, STORAGE_KEY, DEFAULT_SYSTEMS.as_slice());
}

pub fn get_all_systems(store: &KeyValueStore) -> Vec<System> {
    store.get(STORAGE_KEY, DEFAULT_SYSTEMS.to_vec())
}

pub fn get_system_by_id(store: &KeyValueStore, system_id: &str) -> Option<System> {
    find_by_id(get_all_systems(store), system_id)
}

/// Name/description substring match. A blank query returns every system.
pub fn search_systems(store: &KeyValueStore, query: &str) -> Vec<System> {
    let systems = get_all_systems(store);
    if query.trim().is_empty() {
        return systems;
    }

    let needle = query.to_lowercase();
    systems
        .into_iter()
        .filter(|system| contains_ci(&system.name, &needle) || contains_ci(&system.description, &needle))
        .collect()
}

pub fn save_system(store: &KeyValueStore, system: System) -> System {
    let mut systems = get_all_systems(store);
    upsert(&mut systems, system.clone());
    store.set(STORAGE_KEY, &systems);
    tracing::debug!(system_id = %system.id, "saved system");
    system
}

pub fn delete_system(store: &KeyValueStore, system_id: &str) {
    delete_by_id(store, STORAGE_KEY, DEFAULT_SYSTEMS.as_slice(), system_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> KeyValueStore {
        KeyValueStore::open_in_memory("test").expect("store")
    }

    #[test]
    fn uninitialized_reads_return_defaults() {
        let store = store();
        assert_eq!(get_all_systems(&store), *DEFAULT_SYSTEMS);
        assert!(!store.contains(STORAGE_KEY));
    }

    #[test]
    fn search_matches_name_and_description_case_insensitively() {
        let store = store();
        initialize(&store);

        let by_name = search_systems(&store, "itsm");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, "itsm");

        let by_description = search_systems(&store, "PAYROLL");
        assert_eq!(by_description.len(), 1);
        assert_eq!(by_description[0].id, "zup");

        assert_eq!(search_systems(&store, "   ").len(), DEFAULT_SYSTEMS.len());
        assert!(search_systems(&store, "nonexistent-xyz").is_empty());
    }

    #[test]
    fn save_replaces_in_place_or_appends() {
        let store = store();
        initialize(&store);
        let before = get_all_systems(&store).len();

        let mut existing = get_system_by_id(&store, "hrsm").expect("hrsm");
        existing.description = "Updated".to_string();
        save_system(&store, existing);
        let systems = get_all_systems(&store);
        assert_eq!(systems.len(), before);
        assert_eq!(systems[2].description, "Updated");

        save_system(
            &store,
            System {
                id: "new".to_string(),
                name: "New".to_string(),
                description: String::new(),
                url: "#".to_string(),
            },
        );
        assert_eq!(get_all_systems(&store).len(), before + 1);
    }

    #[test]
    fn delete_missing_is_a_no_op() {
        let store = store();
        initialize(&store);
        delete_system(&store, "missing-id");
        assert_eq!(get_all_systems(&store).len(), DEFAULT_SYSTEMS.len());

        delete_system(&store, "sed");
        assert!(get_system_by_id(&store, "sed").is_none());
    }
}
