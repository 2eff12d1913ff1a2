use crate::models::User;
use crate::services::{contains_ci, delete_by_id, find_by_id, seed_collection, upsert};
use crate::store::KeyValueStore;
use once_cell::sync::Lazy;

const STORAGE_KEY: &str = "users";
const CURRENT_USER_KEY: &str = "current_user";

static DEFAULT_USERS: Lazy<Vec<User>> = Lazy::new(|| {
    [
        ("user1", "Ivanov Ivan Ivanovich", "ivanov@example.com", "Development", "Senior developer"),
        ("user2", "Petrov Petr Petrovich", "petrov@example.com", "Quality assurance", "Tester"),
        ("user3", "Sidorova Anna Vladimirovna", "sidorova@example.com", "Marketing", "Marketing specialist"),
        ("user4", "Kozlov Dmitry Sergeevich", "kozlov@example.com", "Sales", "Sales manager"),
        ("user5", "Smirnova Elena Alexandrovna", "smirnova@example.com", "Accounting", "Chief accountant"),
    ]
    .into_iter()
    .map(|(id, full_name, email, department, position)| User {
        id: id.to_string(),
        full_name: full_name.to_string(),
        email: email.to_string(),
        department: department.to_string(),
        position: position.to_string(),
    })
    .collect()
});

fn default_current_user() -> User {
    DEFAULT_USERS[0].clone()
}

/// Seeds the user directory and the current-user slot independently.
pub fn initialize(store: &KeyValueStore) {
    seed_collection(store, STORAGE_KEY, DEFAULT_USERS.as_slice());

    let current: Option<User> = store.get(CURRENT_USER_KEY, None);
    if current.is_none() {
        store.set(CURRENT_USER_KEY, &default_current_user());
    }
}

pub fn get_all_users(store: &KeyValueStore) -> Vec<User> {
    store.get(STORAGE_KEY, DEFAULT_USERS.to_vec())
}

pub fn get_user_by_id(store: &KeyValueStore, user_id: &str) -> Option<User> {
    find_by_id(get_all_users(store), user_id)
}

/// Matches name, email, department or position.
///
/// Unlike the catalog searches, a blank query returns nothing: the support
/// desk only lists users once something has been typed.
pub fn search_users(store: &KeyValueStore, query: &str) -> Vec<User> {
    if query.trim().is_empty() {
        return Vec::new();
    }

    let needle = query.to_lowercase();
    get_all_users(store)
        .into_iter()
        .filter(|user| {
            contains_ci(&user.full_name, &needle)
                || contains_ci(&user.email, &needle)
                || contains_ci(&user.department, &needle)
                || contains_ci(&user.position, &needle)
        })
        .collect()
}

pub fn get_current_user(store: &KeyValueStore) -> User {
    store
        .get::<Option<User>>(CURRENT_USER_KEY, None)
        .unwrap_or_else(default_current_user)
}

pub fn set_current_user(store: &KeyValueStore, user: &User) {
    store.set(CURRENT_USER_KEY, user);
    tracing::debug!(user_id = %user.id, "switched current user");
}

pub fn save_user(store: &KeyValueStore, user: User) -> User {
    let mut users = get_all_users(store);
    upsert(&mut users, user.clone());
    store.set(STORAGE_KEY, &users);
    user
}

pub fn delete_user(store: &KeyValueStore, user_id: &str) {
    delete_by_id(store, STORAGE_KEY, DEFAULT_USERS.as_slice(), user_id);
}
