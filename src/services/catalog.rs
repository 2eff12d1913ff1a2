use crate::models::{Service, ServiceGroup};
use crate::services::{contains_ci, delete_by_id, seed_collection, upsert};
use crate::store::KeyValueStore;
use once_cell::sync::Lazy;

const STORAGE_KEY: &str = "services";

struct SeedService {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    instructions: bool,
    feedback: bool,
    popular: bool,
}

static DEFAULT_SERVICE_GROUPS: Lazy<Vec<ServiceGroup>> = Lazy::new(|| {
    vec![
        seed_group(
            "hr",
            "HR services (HRSM)",
            "HRSM",
            &[
                SeedService {
                    id: "hr-1",
                    name: "Recruitment request",
                    description: "Open a request to hire a new employee",
                    instructions: true,
                    feedback: true,
                    popular: false,
                },
                SeedService {
                    id: "hr-2",
                    name: "Onboarding request",
                    description: "Register a new employee with the company",
                    instructions: true,
                    feedback: false,
                    popular: false,
                },
                SeedService {
                    id: "hr-3",
                    name: "Vacation application",
                    description: "Apply for annual leave",
                    instructions: true,
                    feedback: false,
                    popular: true,
                },
            ],
        ),
        seed_group(
            "it",
            "IT department services (ITSM)",
            "ITSM",
            &[
                SeedService {
                    id: "it-1",
                    name: "System access request",
                    description: "Get access to information systems",
                    instructions: true,
                    feedback: false,
                    popular: true,
                },
                SeedService {
                    id: "it-2",
                    name: "Software installation request",
                    description: "Install software on a workstation",
                    instructions: false,
                    feedback: false,
                    popular: false,
                },
                SeedService {
                    id: "it-3",
                    name: "Equipment request",
                    description: "Receive work equipment (laptop, monitor, etc.)",
                    instructions: false,
                    feedback: false,
                    popular: true,
                },
            ],
        ),
        seed_group(
            "aho",
            "Facilities services (MPG)",
            "MPG",
            &[
                SeedService {
                    id: "aho-1",
                    name: "Stationery order",
                    description: "Order office supplies",
                    instructions: false,
                    feedback: false,
                    popular: false,
                },
                SeedService {
                    id: "aho-2",
                    name: "Paper order",
                    description: "Order paper for printers and copiers",
                    instructions: false,
                    feedback: false,
                    popular: true,
                },
                SeedService {
                    id: "aho-3",
                    name: "Workplace relocation request",
                    description: "Move a workplace to another office",
                    instructions: false,
                    feedback: false,
                    popular: false,
                },
            ],
        ),
    ]
});

fn seed_group(id: &str, name: &str, system: &str, services: &[SeedService]) -> ServiceGroup {
    ServiceGroup {
        id: id.to_string(),
        name: name.to_string(),
        services: services
            .iter()
            .map(|seed| Service {
                id: seed.id.to_string(),
                name: seed.name.to_string(),
                description: seed.description.to_string(),
                system: system.to_string(),
                url: "#".to_string(),
                instruction_url: seed.instructions.then(|| "#".to_string()),
                feedback_url: seed.feedback.then(|| "#".to_string()),
                popular: seed.popular,
            })
            .collect(),
        subgroups: Vec::new(),
    }
}

pub fn initialize(store: &KeyValueStore) {
    seed_collection(store, STORAGE_KEY, DEFAULT_SERVICE_GROUPS.as_slice());
}

pub fn get_all_service_groups(store: &KeyValueStore) -> Vec<ServiceGroup> {
    store.get(STORAGE_KEY, DEFAULT_SERVICE_GROUPS.to_vec())
}

/// Depth-first lookup through every group and subgroup.
pub fn get_service_by_id(store: &KeyValueStore, service_id: &str) -> Option<Service> {
    fn find_in(group: &ServiceGroup, service_id: &str) -> Option<Service> {
        if let Some(service) = group.services.iter().find(|service| service.id == service_id) {
            return Some(service.clone());
        }
        group
            .subgroups
            .iter()
            .find_map(|subgroup| find_in(subgroup, service_id))
    }

    get_all_service_groups(store)
        .iter()
        .find_map(|group| find_in(group, service_id))
}

/// Filters the catalog tree by name/description.
///
/// A group survives when it keeps at least one matching service or at least
/// one subgroup that survives; everything else is pruned. A blank query
/// returns the tree unmodified.
pub fn search_services(store: &KeyValueStore, query: &str) -> Vec<ServiceGroup> {
    let groups = get_all_service_groups(store);
    if query.trim().is_empty() {
        return groups;
    }

    let needle = query.to_lowercase();
    groups
        .into_iter()
        .filter_map(|group| prune_group(group, &needle))
        .collect()
}

fn prune_group(group: ServiceGroup, needle: &str) -> Option<ServiceGroup> {
    let services: Vec<Service> = group
        .services
        .into_iter()
        .filter(|service| contains_ci(&service.name, needle) || contains_ci(&service.description, needle))
        .collect();
    let subgroups: Vec<ServiceGroup> = group
        .subgroups
        .into_iter()
        .filter_map(|subgroup| prune_group(subgroup, needle))
        .collect();

    if services.is_empty() && subgroups.is_empty() {
        return None;
    }

    Some(ServiceGroup {
        id: group.id,
        name: group.name,
        services,
        subgroups,
    })
}

/// Every service flagged popular, in depth-first catalog order.
pub fn get_popular_services(store: &KeyValueStore) -> Vec<Service> {
    let mut popular = Vec::new();
    for group in get_all_service_groups(store) {
        walk_services(&group, &mut |service: &Service| {
            if service.popular {
                popular.push(service.clone());
            }
        });
    }
    popular
}

/// Flattened services whose owning system name matches, ignoring case.
pub fn services_by_system(store: &KeyValueStore, system_name: &str) -> Vec<Service> {
    let mut matches = Vec::new();
    for group in get_all_service_groups(store) {
        walk_services(&group, &mut |service: &Service| {
            if service.system.eq_ignore_ascii_case(system_name) {
                matches.push(service.clone());
            }
        });
    }
    matches
}

fn walk_services(group: &ServiceGroup, visit: &mut dyn FnMut(&Service)) {
    for service in &group.services {
        visit(service);
    }
    for subgroup in &group.subgroups {
        walk_services(subgroup, visit);
    }
}

/// Upserts a top-level group.
pub fn save_service_group(store: &KeyValueStore, group: ServiceGroup) -> ServiceGroup {
    let mut groups = get_all_service_groups(store);
    upsert(&mut groups, group.clone());
    store.set(STORAGE_KEY, &groups);
    tracing::debug!(group_id = %group.id, "saved service group");
    group
}

pub fn delete_service_group(store: &KeyValueStore, group_id: &str) {
    delete_by_id(store, STORAGE_KEY, DEFAULT_SERVICE_GROUPS.as_slice(), group_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(id: &str, name: &str, popular: bool) -> Service {
        Service {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{} description", name),
            system: "ITSM".to_string(),
            url: "#".to_string(),
            instruction_url: None,
            feedback_url: None,
            popular,
        }
    }

    fn nested_store() -> KeyValueStore {
        let store = KeyValueStore::open_in_memory("test").expect("store");
        let tree = vec![
            ServiceGroup {
                id: "root".to_string(),
                name: "Root".to_string(),
                services: vec![service("r-1", "Laptop", true)],
                subgroups: vec![
                    ServiceGroup {
                        id: "child-a".to_string(),
                        name: "Child A".to_string(),
                        services: vec![service("a-1", "Printer", false)],
                        subgroups: vec![ServiceGroup {
                            id: "grandchild".to_string(),
                            name: "Grandchild".to_string(),
                            services: vec![service("g-1", "Scanner", true)],
                            subgroups: Vec::new(),
                        }],
                    },
                    ServiceGroup {
                        id: "child-b".to_string(),
                        name: "Child B".to_string(),
                        services: vec![service("b-1", "Monitor", true)],
                        subgroups: Vec::new(),
                    },
                ],
            },
            ServiceGroup {
                id: "other".to_string(),
                name: "Other".to_string(),
                services: vec![service("o-1", "Paper", false)],
                subgroups: Vec::new(),
            },
        ];
        store.set(STORAGE_KEY, &tree);
        store
    }

    #[test]
    fn blank_search_returns_tree_unmodified() {
        let store = nested_store();
        assert_eq!(search_services(&store, ""), get_all_service_groups(&store));
        assert_eq!(search_services(&store, "  "), get_all_service_groups(&store));
    }

    #[test]
    fn unmatched_search_prunes_every_group() {
        let store = nested_store();
        assert!(search_services(&store, "nonexistent-xyz").is_empty());
    }

    #[test]
    fn deep_match_keeps_only_the_path_to_it() {
        let store = nested_store();
        let result = search_services(&store, "scanner");
        assert_eq!(result.len(), 1);

        let root = &result[0];
        assert_eq!(root.id, "root");
        assert!(root.services.is_empty());
        assert_eq!(root.subgroups.len(), 1);

        let child = &root.subgroups[0];
        assert_eq!(child.id, "child-a");
        assert!(child.services.is_empty());
        assert_eq!(child.subgroups[0].services[0].id, "g-1");
    }

    #[test]
    fn popular_services_are_collected_depth_first() {
        let store = nested_store();
        let ids: Vec<String> = get_popular_services(&store)
            .into_iter()
            .map(|service| service.id)
            .collect();
        assert_eq!(ids, vec!["r-1", "g-1", "b-1"]);
    }

    #[test]
    fn default_catalog_popular_services() {
        let store = KeyValueStore::open_in_memory("test").expect("store");
        let ids: Vec<String> = get_popular_services(&store)
            .into_iter()
            .map(|service| service.id)
            .collect();
        assert_eq!(ids, vec!["hr-3", "it-1", "it-3", "aho-2"]);
    }

    #[test]
    fn lookup_descends_into_subgroups() {
        let store = nested_store();
        assert_eq!(get_service_by_id(&store, "g-1").map(|service| service.name), Some("Scanner".to_string()));
        assert!(get_service_by_id(&store, "missing").is_none());
    }

    #[test]
    fn services_are_grouped_by_owning_system() {
        let store = KeyValueStore::open_in_memory("test").expect("store");
        initialize(&store);
        assert_eq!(services_by_system(&store, "hrsm").len(), 3);
        assert!(services_by_system(&store, "SBIS").is_empty());
    }

    #[test]
    fn group_upsert_and_delete() {
        let store = KeyValueStore::open_in_memory("test").expect("store");
        initialize(&store);

        let mut group = get_all_service_groups(&store).remove(0);
        group.name = "Renamed".to_string();
        save_service_group(&store, group);
        let groups = get_all_service_groups(&store);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].name, "Renamed");

        delete_service_group(&store, "missing-id");
        assert_eq!(get_all_service_groups(&store).len(), 3);
        delete_service_group(&store, "it");
        assert_eq!(get_all_service_groups(&store).len(), 2);
    }
}
