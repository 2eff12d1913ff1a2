use crate::models::{SaveTaskPayload, Task, TaskFilters, TaskPriority, TaskStatus};
use crate::services::{contains_ci, delete_by_id, find_by_id, normalize_query, seed_collection, seed_time, upsert};
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use uuid::Uuid;

const STORAGE_KEY: &str = "tasks";
const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

static DEFAULT_TASKS: Lazy<Vec<Task>> = Lazy::new(|| {
    vec![
        Task {
            id: "task-001".to_string(),
            number: "TASK-2024-001".to_string(),
            title: "Order New Year gifts for employees' children".to_string(),
            description: "Compile the list, agree on the budget and place the order for the New Year gifts."
                .to_string(),
            assignee: "Ivanov I.I.".to_string(),
            author: "Petrov P.P.".to_string(),
            priority: TaskPriority::High,
            category: "Gift order".to_string(),
            created_at: seed_time(2024, 2, 20, 10, 0),
            due_date: Some(seed_time(2024, 3, 1, 0, 0)),
            completed_date: None,
            status: TaskStatus::Active,
            days_left: Some(5),
            source: Some("ITSM".to_string()),
            url: Some("#".to_string()),
        },
        Task {
            id: "task-002".to_string(),
            number: "TASK-2024-002".to_string(),
            title: "Leave feedback on the equipment move".to_string(),
            description: "Rate the quality of moving equipment between offices.".to_string(),
            assignee: "Ivanov I.I.".to_string(),
            author: "Sidorov S.S.".to_string(),
            priority: TaskPriority::Medium,
            category: "Feedback".to_string(),
            created_at: seed_time(2024, 2, 18, 10, 0),
            due_date: Some(seed_time(2024, 2, 25, 0, 0)),
            completed_date: Some(seed_time(2024, 2, 24, 0, 0)),
            status: TaskStatus::Completed,
            days_left: None,
            source: Some("MPG".to_string()),
            url: Some("#".to_string()),
        },
        Task {
            id: "task-003".to_string(),
            number: "TASK-2024-003".to_string(),
            title: "Safety briefing".to_string(),
            description: "Complete the annual workplace safety briefing.".to_string(),
            assignee: "Ivanov I.I.".to_string(),
            author: "System".to_string(),
            priority: TaskPriority::Medium,
            category: "Briefing".to_string(),
            created_at: seed_time(2024, 2, 15, 10, 0),
            due_date: Some(seed_time(2024, 2, 20, 0, 0)),
            completed_date: None,
            status: TaskStatus::Overdue,
            days_left: Some(-5),
            source: Some("Progress".to_string()),
            url: Some("#".to_string()),
        },
        Task {
            id: "task-004".to_string(),
            number: "TASK-2024-004".to_string(),
            title: "Approve vacation for Petrov K.B.".to_string(),
            description: "Approve the vacation application submitted by Petrov K.B.".to_string(),
            assignee: "Ivanov I.I.".to_string(),
            author: "System".to_string(),
            priority: TaskPriority::Low,
            category: "Approval".to_string(),
            created_at: seed_time(2024, 2, 25, 9, 15),
            due_date: Some(seed_time(2024, 3, 5, 0, 0)),
            completed_date: None,
            status: TaskStatus::Active,
            days_left: Some(8),
            source: Some("HRSM".to_string()),
            url: Some("#".to_string()),
        },
        Task {
            id: "task-005".to_string(),
            number: "TASK-2024-005".to_string(),
            title: "Prepare the meeting presentation".to_string(),
            description: "Prepare a presentation on the department's first quarter results.".to_string(),
            assignee: "Ivanov I.I.".to_string(),
            author: "Petrov P.P.".to_string(),
            priority: TaskPriority::Urgent,
            category: "Documents".to_string(),
            created_at: seed_time(2024, 2, 28, 11, 30),
            due_date: Some(seed_time(2024, 3, 2, 0, 0)),
            completed_date: None,
            status: TaskStatus::Active,
            days_left: Some(2),
            source: None,
            url: Some("#".to_string()),
        },
    ]
});

/// Seeds the default tasks and refreshes `daysLeft` for whatever is stored.
pub fn initialize(store: &KeyValueStore) {
    seed_collection(store, STORAGE_KEY, DEFAULT_TASKS.as_slice());
    update_days_left(store);
}

pub fn get_all_tasks(store: &KeyValueStore) -> Vec<Task> {
    store.get(STORAGE_KEY, DEFAULT_TASKS.to_vec())
}

pub fn get_task_by_id(store: &KeyValueStore, task_id: &str) -> Option<Task> {
    find_by_id(get_all_tasks(store), task_id)
}

/// Whole days until `due`, rounded up. Negative once the due date has passed.
pub fn days_until(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let diff = (due - now).num_milliseconds();
    -(-diff).div_euclid(MILLIS_PER_DAY)
}

pub fn update_days_left(store: &KeyValueStore) {
    update_days_left_at(store, Utc::now());
}

/// Recomputes `daysLeft` against `now` and rewrites the whole collection.
///
/// Completed tasks and tasks without a due date are left untouched. Active
/// tasks whose remainder goes negative become overdue.
pub fn update_days_left_at(store: &KeyValueStore, now: DateTime<Utc>) {
    let mut tasks = get_all_tasks(store);
    let mut promoted = 0usize;

    for task in tasks.iter_mut() {
        if task.status == TaskStatus::Completed {
            continue;
        }
        let Some(due) = task.due_date else {
            continue;
        };

        let days_left = days_until(due, now);
        if days_left < 0 && task.status == TaskStatus::Active {
            task.status = TaskStatus::Overdue;
            promoted += 1;
        }
        task.days_left = Some(days_left);
    }

    store.set(STORAGE_KEY, &tasks);
    tracing::debug!(tasks = tasks.len(), promoted, "refreshed task days left");
}

pub fn filter_tasks(store: &KeyValueStore, filters: &TaskFilters) -> Vec<Task> {
    apply_task_filters(get_all_tasks(store), filters)
}

/// Title/description/number search combined with exact status and priority.
pub fn apply_task_filters(mut tasks: Vec<Task>, filters: &TaskFilters) -> Vec<Task> {
    let search = normalize_query(filters.search.as_deref());
    tasks.retain(|task| {
        let matches_search = search.as_deref().map_or(true, |needle| {
            contains_ci(&task.title, needle)
                || contains_ci(&task.description, needle)
                || contains_ci(&task.number, needle)
        });
        matches_search
            && filters.status.map_or(true, |status| task.status == status)
            && filters.priority.map_or(true, |priority| task.priority == priority)
    });
    tasks
}

fn tasks_with_status(store: &KeyValueStore, status: TaskStatus) -> Vec<Task> {
    get_all_tasks(store)
        .into_iter()
        .filter(|task| task.status == status)
        .collect()
}

pub fn get_active_tasks(store: &KeyValueStore) -> Vec<Task> {
    tasks_with_status(store, TaskStatus::Active)
}

pub fn get_overdue_tasks(store: &KeyValueStore) -> Vec<Task> {
    tasks_with_status(store, TaskStatus::Overdue)
}

pub fn get_completed_tasks(store: &KeyValueStore) -> Vec<Task> {
    tasks_with_status(store, TaskStatus::Completed)
}

pub fn save_task(store: &KeyValueStore, payload: SaveTaskPayload) -> Task {
    save_task_at(store, payload, Utc::now())
}

/// Upserts a task, filling in id, number and createdAt when absent.
pub fn save_task_at(store: &KeyValueStore, payload: SaveTaskPayload, now: DateTime<Utc>) -> Task {
    let id = payload
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("task-{}", Uuid::new_v4().simple()));
    let number = payload
        .number
        .filter(|number| !number.is_empty())
        .unwrap_or_else(|| generate_task_number(now));
    let days_left = payload.due_date.map(|due| days_until(due, now));

    let mut status = payload.status;
    if status == TaskStatus::Active && days_left.is_some_and(|days| days < 0) {
        status = TaskStatus::Overdue;
    }

    let task = Task {
        id,
        number,
        title: payload.title,
        description: payload.description,
        assignee: payload.assignee,
        author: payload.author,
        priority: payload.priority,
        category: payload.category,
        created_at: payload.created_at.unwrap_or(now),
        due_date: payload.due_date,
        completed_date: payload.completed_date,
        status,
        days_left,
        source: payload.source,
        url: payload.url,
    };

    let mut tasks = get_all_tasks(store);
    upsert(&mut tasks, task.clone());
    store.set(STORAGE_KEY, &tasks);
    tracing::debug!(task_id = %task.id, status = task.status.as_str(), "saved task");
    task
}

fn generate_task_number(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::rng().random_range(0..1000);
    format!("TASK-{}-{:03}", now.format("%Y%m%d"), suffix)
}

pub fn complete_task(store: &KeyValueStore, task_id: &str) {
    complete_task_at(store, task_id, Utc::now());
}

pub fn complete_task_at(store: &KeyValueStore, task_id: &str, now: DateTime<Utc>) {
    let mut tasks = get_all_tasks(store);
    let Some(task) = tasks.iter_mut().find(|task| task.id == task_id) else {
        return;
    };
    task.status = TaskStatus::Completed;
    task.completed_date = Some(now);

    store.set(STORAGE_KEY, &tasks);
    tracing::debug!(task_id, "completed task");
}

pub fn delete_task(store: &KeyValueStore, task_id: &str) {
    delete_by_id(store, STORAGE_KEY, DEFAULT_TASKS.as_slice(), task_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> KeyValueStore {
        KeyValueStore::open_in_memory("test").expect("store")
    }

    fn draft(due: Option<DateTime<Utc>>, status: TaskStatus) -> SaveTaskPayload {
        SaveTaskPayload {
            id: None,
            number: None,
            title: "Quarterly report".to_string(),
            description: "Collect figures".to_string(),
            assignee: "Ivanov I.I.".to_string(),
            author: "Petrov P.P.".to_string(),
            priority: TaskPriority::Medium,
            category: "Documents".to_string(),
            created_at: None,
            due_date: due,
            completed_date: None,
            status,
            source: None,
            url: None,
        }
    }

    #[test]
    fn days_until_rounds_up() {
        let now = seed_time(2024, 2, 26, 0, 0);
        assert_eq!(days_until(seed_time(2024, 2, 20, 0, 0), now), -6);
        assert_eq!(days_until(seed_time(2024, 2, 26, 12, 0), now), 1);
        assert_eq!(days_until(now, now), 0);
        assert_eq!(days_until(seed_time(2024, 2, 25, 12, 0), now), 0);
    }

    #[test]
    fn past_due_active_task_becomes_overdue() {
        let store = store();
        let mut task = DEFAULT_TASKS[0].clone();
        task.due_date = Some(seed_time(2024, 2, 20, 0, 0));
        task.days_left = None;
        store.set(STORAGE_KEY, &vec![task]);

        update_days_left_at(&store, seed_time(2024, 2, 26, 0, 0));

        let task = get_task_by_id(&store, "task-001").expect("task");
        assert_eq!(task.status, TaskStatus::Overdue);
        assert_eq!(task.days_left, Some(-6));
    }

    #[test]
    fn refresh_is_idempotent_and_skips_completed() {
        let store = store();
        seed_collection(&store, STORAGE_KEY, DEFAULT_TASKS.as_slice());
        let now = seed_time(2024, 2, 29, 12, 0);

        update_days_left_at(&store, now);
        let first = get_all_tasks(&store);
        update_days_left_at(&store, now);
        assert_eq!(get_all_tasks(&store), first);

        let completed = get_task_by_id(&store, "task-002").expect("task-002");
        assert_eq!(completed.days_left, None);
        assert_eq!(completed.status, TaskStatus::Completed);

        let upcoming = get_task_by_id(&store, "task-004").expect("task-004");
        assert_eq!(upcoming.days_left, Some(5));
        assert_eq!(upcoming.status, TaskStatus::Active);
    }

    #[test]
    fn filters_combine_search_status_and_priority() {
        let store = store();
        seed_collection(&store, STORAGE_KEY, DEFAULT_TASKS.as_slice());

        let by_number = TaskFilters {
            search: Some("task-2024-003".to_string()),
            ..TaskFilters::default()
        };
        assert_eq!(filter_tasks(&store, &by_number).len(), 1);

        let urgent_active = TaskFilters {
            search: None,
            status: Some(TaskStatus::Active),
            priority: Some(TaskPriority::Urgent),
        };
        let result = filter_tasks(&store, &urgent_active);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "task-005");

        assert_eq!(get_active_tasks(&store).len(), 3);
        assert_eq!(get_overdue_tasks(&store).len(), 1);
        assert_eq!(get_completed_tasks(&store).len(), 1);
    }

    #[test]
    fn save_generates_identity_and_promotes_overdue() {
        let store = store();
        seed_collection(&store, STORAGE_KEY, DEFAULT_TASKS.as_slice());
        let now = seed_time(2024, 3, 10, 9, 0);

        let saved = save_task_at(&store, draft(Some(seed_time(2024, 3, 1, 0, 0)), TaskStatus::Active), now);
        assert!(saved.id.starts_with("task-"));
        assert!(saved.number.starts_with("TASK-20240310-"));
        assert_eq!(saved.number.len(), "TASK-20240310-000".len());
        assert_eq!(saved.created_at, now);
        assert_eq!(saved.status, TaskStatus::Overdue);
        assert_eq!(saved.days_left, Some(-9));
        assert_eq!(get_all_tasks(&store).len(), 6);

        let undated = save_task_at(&store, draft(None, TaskStatus::Active), now);
        assert_eq!(undated.days_left, None);
        assert_eq!(undated.status, TaskStatus::Active);
    }

    #[test]
    fn save_existing_replaces_in_place() {
        let store = store();
        seed_collection(&store, STORAGE_KEY, DEFAULT_TASKS.as_slice());
        let now = seed_time(2024, 2, 27, 0, 0);

        let mut payload = SaveTaskPayload::from(get_task_by_id(&store, "task-004").expect("task-004"));
        payload.title = "Renamed".to_string();
        let saved = save_task_at(&store, payload, now);

        assert_eq!(saved.number, "TASK-2024-004");
        assert_eq!(saved.days_left, Some(7));
        let tasks = get_all_tasks(&store);
        assert_eq!(tasks.len(), 5);
        assert_eq!(tasks[3].title, "Renamed");
    }

    #[test]
    fn complete_stamps_date_and_ignores_unknown_ids() {
        let store = store();
        seed_collection(&store, STORAGE_KEY, DEFAULT_TASKS.as_slice());
        let now = seed_time(2024, 3, 1, 8, 0);

        complete_task_at(&store, "task-005", now);
        let task = get_task_by_id(&store, "task-005").expect("task-005");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.completed_date, Some(now));

        complete_task_at(&store, "missing", now);
        delete_task(&store, "missing");
        assert_eq!(get_all_tasks(&store).len(), 5);

        delete_task(&store, "task-001");
        assert!(get_task_by_id(&store, "task-001").is_none());
    }
}
