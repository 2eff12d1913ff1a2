use crate::errors::{AppError, AppResult};
use crate::models::{ConfigItem, ConfigItemType, GlobalParameter, GroupSource, ParamType, ParamValue, UserGroup};
use crate::services::{delete_by_id, find_by_id, seed_collection, upsert};
use crate::store::KeyValueStore;
use once_cell::sync::Lazy;

const CONFIG_ITEMS_KEY: &str = "config_items";
const GLOBAL_PARAMS_KEY: &str = "global_params";
const USER_GROUPS_KEY: &str = "user_groups";

pub const SUPPORT_SPECIALISTS_PARAM: &str = "param-5";
pub const ADMINISTRATORS_PARAM: &str = "param-6";

static DEFAULT_CONFIG_ITEMS: Lazy<Vec<ConfigItem>> = Lazy::new(|| {
    [
        ("service-1", "HR services (HRSM)", "HR department services", 1, ConfigItemType::Service),
        ("service-2", "Facilities services (MPG)", "Administrative and facilities services", 2, ConfigItemType::Service),
        ("system-1", "ITSM", "IT service management system", 1, ConfigItemType::System),
        ("system-2", "HRSM", "Human resources management system", 2, ConfigItemType::System),
    ]
    .into_iter()
    .map(|(id, name, description, order, item_type)| ConfigItem {
        id: id.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        published: true,
        parent_id: None,
        order,
        url: Some("#".to_string()),
        admin_groups: vec!["admin".to_string()],
        user_groups: vec!["users".to_string()],
        item_type,
        metadata: None,
    })
    .collect()
});

static DEFAULT_GLOBAL_PARAMS: Lazy<Vec<GlobalParameter>> = Lazy::new(|| {
    let list = |values: &[&str]| ParamValue::List(values.iter().map(|value| value.to_string()).collect());
    [
        ("param-1", "Completed request retention", "Days to keep completed requests", ParamValue::Number(90.0), ParamType::Number),
        ("param-2", "Completed task retention", "Days to keep completed tasks", ParamValue::Number(90.0), ParamType::Number),
        ("param-3", "Notification retention", "Days to keep notifications", ParamValue::Number(30.0), ParamType::Number),
        ("param-4", "Required task attributes", "Attributes that must be filled in", list(&["title", "priority"]), ParamType::Array),
        (SUPPORT_SPECIALISTS_PARAM, "Technical support specialists", "Users with support desk access", list(&["user1", "user2"]), ParamType::Array),
        (ADMINISTRATORS_PARAM, "Administrators", "Users with administrator rights", list(&["admin1", "admin2"]), ParamType::Array),
    ]
    .into_iter()
    .map(|(id, name, description, value, param_type)| GlobalParameter {
        id: id.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        value,
        param_type,
    })
    .collect()
});

static DEFAULT_USER_GROUPS: Lazy<Vec<UserGroup>> = Lazy::new(|| {
    [
        ("admin", "Administrators"),
        ("tech-support", "Technical support"),
        ("users", "Users"),
        ("developers", "Developers"),
        ("managers", "Managers"),
        ("hr", "HR staff"),
    ]
    .into_iter()
    .map(|(id, name)| UserGroup {
        id: id.to_string(),
        name: name.to_string(),
        source: GroupSource::Ad,
        members: None,
    })
    .collect()
});

pub fn initialize(store: &KeyValueStore) {
    seed_collection(store, CONFIG_ITEMS_KEY, DEFAULT_CONFIG_ITEMS.as_slice());
    seed_collection(store, GLOBAL_PARAMS_KEY, DEFAULT_GLOBAL_PARAMS.as_slice());
    seed_collection(store, USER_GROUPS_KEY, DEFAULT_USER_GROUPS.as_slice());
}

// Config items

pub fn get_all_config_items(store: &KeyValueStore) -> Vec<ConfigItem> {
    store.get(CONFIG_ITEMS_KEY, DEFAULT_CONFIG_ITEMS.to_vec())
}

pub fn get_config_items_by_type(store: &KeyValueStore, item_type: ConfigItemType) -> Vec<ConfigItem> {
    get_all_config_items(store)
        .into_iter()
        .filter(|item| item.item_type == item_type)
        .collect()
}

pub fn get_config_item_by_id(store: &KeyValueStore, item_id: &str) -> Option<ConfigItem> {
    find_by_id(get_all_config_items(store), item_id)
}

/// Direct children of `parent_id`, ordered by `order`.
pub fn children_of(store: &KeyValueStore, parent_id: &str) -> Vec<ConfigItem> {
    let mut children: Vec<ConfigItem> = get_all_config_items(store)
        .into_iter()
        .filter(|item| item.parent_id.as_deref() == Some(parent_id))
        .collect();
    sort_by_order(&mut children);
    children
}

pub fn sort_by_order(items: &mut [ConfigItem]) {
    items.sort_by_key(|item| item.order);
}

pub fn save_config_item(store: &KeyValueStore, item: ConfigItem) -> ConfigItem {
    let mut items = get_all_config_items(store);
    upsert(&mut items, item.clone());
    store.set(CONFIG_ITEMS_KEY, &items);
    tracing::debug!(item_id = %item.id, item_type = item.item_type.as_str(), "saved config item");
    item
}

pub fn delete_config_item(store: &KeyValueStore, item_id: &str) {
    delete_by_id(store, CONFIG_ITEMS_KEY, DEFAULT_CONFIG_ITEMS.as_slice(), item_id);
}

pub fn toggle_item_published(store: &KeyValueStore, item_id: &str, published: bool) {
    let mut items = get_all_config_items(store);
    let Some(item) = items.iter_mut().find(|item| item.id == item_id) else {
        return;
    };
    item.published = published;
    store.set(CONFIG_ITEMS_KEY, &items);
}

// Global parameters

pub fn get_all_global_params(store: &KeyValueStore) -> Vec<GlobalParameter> {
    store.get(GLOBAL_PARAMS_KEY, DEFAULT_GLOBAL_PARAMS.to_vec())
}

pub fn get_global_param_by_id(store: &KeyValueStore, param_id: &str) -> Option<GlobalParameter> {
    find_by_id(get_all_global_params(store), param_id)
}

pub fn get_global_param_value(store: &KeyValueStore, param_id: &str) -> Option<ParamValue> {
    get_global_param_by_id(store, param_id).map(|param| param.value)
}

pub fn save_global_param(store: &KeyValueStore, param: GlobalParameter) {
    let mut params = get_all_global_params(store);
    upsert(&mut params, param);
    store.set(GLOBAL_PARAMS_KEY, &params);
}

pub fn update_global_param_value(store: &KeyValueStore, param_id: &str, value: ParamValue) {
    let mut params = get_all_global_params(store);
    let Some(param) = params.iter_mut().find(|param| param.id == param_id) else {
        return;
    };
    param.value = value;
    store.set(GLOBAL_PARAMS_KEY, &params);
    tracing::debug!(param_id, "updated global parameter");
}

/// Replaces the whole parameter list.
pub fn update_global_params(store: &KeyValueStore, params: &[GlobalParameter]) {
    store.set(GLOBAL_PARAMS_KEY, params);
}

/// Converts form text into a value of the parameter's declared type.
///
/// Arrays are comma separated with surrounding whitespace trimmed and empty
/// entries dropped.
pub fn parse_param_input(param_type: ParamType, raw: &str) -> AppResult<ParamValue> {
    match param_type {
        ParamType::String => Ok(ParamValue::Text(raw.to_string())),
        ParamType::Number => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(ParamValue::Number)
            .ok_or_else(|| AppError::Validation(format!("'{raw}' is not a number"))),
        ParamType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(ParamValue::Boolean(true)),
            "false" | "0" | "no" | "off" | "" => Ok(ParamValue::Boolean(false)),
            _ => Err(AppError::Validation(format!("'{raw}' is not a boolean"))),
        },
        ParamType::Array => Ok(ParamValue::List(
            raw.split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .collect(),
        )),
    }
}

/// Display form of a parameter value; lists are joined with ", ".
pub fn render_param_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Boolean(flag) => flag.to_string(),
        ParamValue::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
            format!("{}", *number as i64)
        }
        ParamValue::Number(number) => number.to_string(),
        ParamValue::List(values) => values.join(", "),
        ParamValue::Text(text) => text.clone(),
    }
}

// User groups

pub fn get_all_user_groups(store: &KeyValueStore) -> Vec<UserGroup> {
    store.get(USER_GROUPS_KEY, DEFAULT_USER_GROUPS.to_vec())
}

pub fn get_user_group_by_id(store: &KeyValueStore, group_id: &str) -> Option<UserGroup> {
    find_by_id(get_all_user_groups(store), group_id)
}

pub fn save_user_group(store: &KeyValueStore, group: UserGroup) {
    let mut groups = get_all_user_groups(store);
    upsert(&mut groups, group);
    store.set(USER_GROUPS_KEY, &groups);
}

pub fn delete_user_group(store: &KeyValueStore, group_id: &str) {
    delete_by_id(store, USER_GROUPS_KEY, DEFAULT_USER_GROUPS.as_slice(), group_id);
}

/// Adds `user_id` to the group's members once; repeated adds change nothing.
pub fn add_user_to_group(store: &KeyValueStore, group_id: &str, user_id: &str) {
    let mut groups = get_all_user_groups(store);
    let Some(group) = groups.iter_mut().find(|group| group.id == group_id) else {
        return;
    };
    let members = group.members.get_or_insert_with(Vec::new);
    if members.iter().any(|member| member == user_id) {
        return;
    }
    members.push(user_id.to_string());
    store.set(USER_GROUPS_KEY, &groups);
}

pub fn remove_user_from_group(store: &KeyValueStore, group_id: &str, user_id: &str) {
    let mut groups = get_all_user_groups(store);
    let Some(members) = groups
        .iter_mut()
        .find(|group| group.id == group_id)
        .and_then(|group| group.members.as_mut())
    else {
        return;
    };
    members.retain(|member| member != user_id);
    store.set(USER_GROUPS_KEY, &groups);
}

// Roles

fn param_lists_user(store: &KeyValueStore, param_id: &str, user_id: &str) -> bool {
    get_global_param_value(store, param_id)
        .as_ref()
        .and_then(ParamValue::as_list)
        .is_some_and(|users| users.iter().any(|user| user == user_id))
}

pub fn is_admin(store: &KeyValueStore, user_id: &str) -> bool {
    param_lists_user(store, ADMINISTRATORS_PARAM, user_id)
}

pub fn is_support_specialist(store: &KeyValueStore, user_id: &str) -> bool {
    param_lists_user(store, SUPPORT_SPECIALISTS_PARAM, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> KeyValueStore {
        let store = KeyValueStore::open_in_memory("test").expect("store");
        initialize(&store);
        store
    }

    #[test]
    fn roles_follow_global_parameters() {
        let store = seeded();
        assert!(is_support_specialist(&store, "user1"));
        assert!(!is_support_specialist(&store, "user3"));
        assert!(is_admin(&store, "admin1"));
        assert!(!is_admin(&store, "user1"));

        update_global_param_value(
            &store,
            SUPPORT_SPECIALISTS_PARAM,
            ParamValue::List(vec!["user3".to_string()]),
        );
        assert!(is_support_specialist(&store, "user3"));
        assert!(!is_support_specialist(&store, "user1"));
    }

    #[test]
    fn non_list_role_parameter_grants_nothing() {
        let store = seeded();
        update_global_param_value(&store, ADMINISTRATORS_PARAM, ParamValue::Text("admin1".to_string()));
        assert!(!is_admin(&store, "admin1"));
    }

    #[test]
    fn group_membership_has_no_duplicates() {
        let store = seeded();
        add_user_to_group(&store, "developers", "user1");
        add_user_to_group(&store, "developers", "user1");
        add_user_to_group(&store, "developers", "user2");
        assert_eq!(
            get_user_group_by_id(&store, "developers").and_then(|group| group.members),
            Some(vec!["user1".to_string(), "user2".to_string()])
        );

        remove_user_from_group(&store, "developers", "user1");
        remove_user_from_group(&store, "hr", "user1");
        remove_user_from_group(&store, "missing", "user1");
        assert_eq!(
            get_user_group_by_id(&store, "developers").and_then(|group| group.members),
            Some(vec!["user2".to_string()])
        );
        assert_eq!(get_user_group_by_id(&store, "hr").and_then(|group| group.members), None);
    }

    #[test]
    fn config_items_by_type_and_publish_toggle() {
        let store = seeded();
        assert_eq!(get_config_items_by_type(&store, ConfigItemType::Service).len(), 2);
        assert!(get_config_items_by_type(&store, ConfigItemType::Task).is_empty());

        toggle_item_published(&store, "system-2", false);
        toggle_item_published(&store, "missing", false);
        assert_eq!(get_config_item_by_id(&store, "system-2").map(|item| item.published), Some(false));
        assert_eq!(get_all_config_items(&store).iter().filter(|item| item.published).count(), 3);
    }

    #[test]
    fn children_are_sorted_by_order() {
        let store = seeded();
        let child = |id: &str, order: i64| ConfigItem {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            published: true,
            parent_id: Some("service-1".to_string()),
            order,
            url: None,
            admin_groups: Vec::new(),
            user_groups: Vec::new(),
            item_type: ConfigItemType::Service,
            metadata: None,
        };
        save_config_item(&store, child("late", 5));
        save_config_item(&store, child("early", 1));

        let ids: Vec<String> = children_of(&store, "service-1").into_iter().map(|item| item.id).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert!(children_of(&store, "system-1").is_empty());

        delete_config_item(&store, "late");
        assert_eq!(children_of(&store, "service-1").len(), 1);
    }

    #[test]
    fn param_input_is_typed() {
        assert_eq!(parse_param_input(ParamType::Number, " 45 ").expect("number"), ParamValue::Number(45.0));
        assert!(parse_param_input(ParamType::Number, "forty").is_err());
        assert_eq!(parse_param_input(ParamType::Boolean, "TRUE").expect("bool"), ParamValue::Boolean(true));
        assert!(parse_param_input(ParamType::Boolean, "maybe").is_err());
        assert_eq!(
            parse_param_input(ParamType::Array, "user1, user2 ,, user3").expect("array"),
            ParamValue::List(vec!["user1".to_string(), "user2".to_string(), "user3".to_string()])
        );
        assert_eq!(
            parse_param_input(ParamType::String, " keep ").expect("text"),
            ParamValue::Text(" keep ".to_string())
        );
    }

    #[test]
    fn param_values_render_for_display() {
        let store = seeded();
        let admins = get_global_param_value(&store, ADMINISTRATORS_PARAM).expect("param-6");
        assert_eq!(render_param_value(&admins), "admin1, admin2");
        assert_eq!(render_param_value(&ParamValue::Number(90.0)), "90");
        assert_eq!(render_param_value(&ParamValue::Number(1.5)), "1.5");
        assert_eq!(render_param_value(&ParamValue::Boolean(false)), "false");
    }

    #[test]
    fn bulk_param_update_replaces_list() {
        let store = seeded();
        let mut params = get_all_global_params(&store);
        params.truncate(2);
        update_global_params(&store, &params);
        assert_eq!(get_all_global_params(&store).len(), 2);
        assert!(get_global_param_value(&store, ADMINISTRATORS_PARAM).is_none());

        save_global_param(
            &store,
            GlobalParameter {
                id: "param-7".to_string(),
                name: "Maintenance mode".to_string(),
                description: None,
                value: ParamValue::Boolean(false),
                param_type: ParamType::Boolean,
            },
        );
        assert_eq!(get_all_global_params(&store).len(), 3);
    }

    #[test]
    fn user_groups_save_and_delete() {
        let store = seeded();
        save_user_group(
            &store,
            UserGroup {
                id: "qa".to_string(),
                name: "QA".to_string(),
                source: GroupSource::Manual,
                members: None,
            },
        );
        assert_eq!(get_all_user_groups(&store).len(), 7);
        delete_user_group(&store, "qa");
        assert_eq!(get_all_user_groups(&store).len(), 6);
    }
}
