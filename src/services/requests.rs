use crate::models::{Request, RequestFilters, RequestStatus, SaveRequestPayload};
use crate::services::{contains_ci, delete_by_id, find_by_id, normalize_query, seed_collection, seed_time, upsert};
use crate::store::KeyValueStore;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use once_cell::sync::Lazy;
use uuid::Uuid;

const STORAGE_KEY: &str = "requests";

static DEFAULT_REQUESTS: Lazy<Vec<Request>> = Lazy::new(|| {
    vec![
        Request {
            id: "req-001".to_string(),
            system_id: "itsm".to_string(),
            system_name: "ITSM".to_string(),
            author_id: "user1".to_string(),
            author_name: "Ivanov I.I.".to_string(),
            executor_id: None,
            executor_name: None,
            type_id: "access".to_string(),
            type_name: "Access request".to_string(),
            number: "ITSM-2024-001".to_string(),
            content: "Grant access to the document management system".to_string(),
            status: RequestStatus::New,
            created_at: seed_time(2024, 3, 1, 10, 0),
            planned_date: None,
            execution_date: None,
            closed_date: None,
            url: "#".to_string(),
        },
        Request {
            id: "req-002".to_string(),
            system_id: "hrsm".to_string(),
            system_name: "HRSM".to_string(),
            author_id: "user1".to_string(),
            author_name: "Ivanov I.I.".to_string(),
            executor_id: Some("user3".to_string()),
            executor_name: Some("Sidorova A.V.".to_string()),
            type_id: "vacation".to_string(),
            type_name: "Vacation application".to_string(),
            number: "HRSM-2024-002".to_string(),
            content: "Planned vacation from 01.03.2024 to 14.03.2024".to_string(),
            status: RequestStatus::OnApproval,
            created_at: seed_time(2024, 2, 20, 15, 30),
            planned_date: Some(seed_time(2024, 3, 1, 0, 0)),
            execution_date: None,
            closed_date: None,
            url: "#".to_string(),
        },
        Request {
            id: "req-003".to_string(),
            system_id: "mpg".to_string(),
            system_name: "MPG".to_string(),
            author_id: "user1".to_string(),
            author_name: "Ivanov I.I.".to_string(),
            executor_id: Some("user2".to_string()),
            executor_name: Some("Petrov P.P.".to_string()),
            type_id: "office".to_string(),
            type_name: "Stationery order".to_string(),
            number: "MPG-2024-003".to_string(),
            content: "Order a stapler and paper clips".to_string(),
            status: RequestStatus::InProgress,
            created_at: seed_time(2024, 2, 25, 11, 15),
            planned_date: Some(seed_time(2024, 3, 5, 0, 0)),
            execution_date: None,
            closed_date: None,
            url: "#".to_string(),
        },
        Request {
            id: "req-004".to_string(),
            system_id: "itsm".to_string(),
            system_name: "ITSM".to_string(),
            author_id: "user2".to_string(),
            author_name: "Petrov P.P.".to_string(),
            executor_id: Some("user3".to_string()),
            executor_name: Some("Sidorova A.V.".to_string()),
            type_id: "incident".to_string(),
            type_name: "Incident".to_string(),
            number: "ITSM-2024-004".to_string(),
            content: "The printer in room 305 is not working".to_string(),
            status: RequestStatus::Completed,
            created_at: seed_time(2024, 2, 10, 9, 30),
            planned_date: None,
            execution_date: Some(seed_time(2024, 2, 11, 14, 20)),
            closed_date: None,
            url: "#".to_string(),
        },
        Request {
            id: "req-005".to_string(),
            system_id: "mpg".to_string(),
            system_name: "MPG".to_string(),
            author_id: "user1".to_string(),
            author_name: "Ivanov I.I.".to_string(),
            executor_id: None,
            executor_name: None,
            type_id: "maintenance".to_string(),
            type_name: "Repair request".to_string(),
            number: "MPG-2024-005".to_string(),
            content: "Fix the lighting in meeting room 2".to_string(),
            status: RequestStatus::Cancelled,
            created_at: seed_time(2024, 2, 5, 16, 45),
            planned_date: None,
            execution_date: None,
            closed_date: None,
            url: "#".to_string(),
        },
    ]
});

pub fn initialize(store: &KeyValueStore) {
    seed_collection(store, STORAGE_KEY, DEFAULT_REQUESTS.as_slice());
}

pub fn get_all_requests(store: &KeyValueStore) -> Vec<Request> {
    store.get(STORAGE_KEY, DEFAULT_REQUESTS.to_vec())
}

pub fn get_request_by_id(store: &KeyValueStore, request_id: &str) -> Option<Request> {
    find_by_id(get_all_requests(store), request_id)
}

/// Requests authored by `user_id`.
pub fn get_user_requests(store: &KeyValueStore, user_id: &str) -> Vec<Request> {
    get_all_requests(store)
        .into_iter()
        .filter(|request| request.author_id == user_id)
        .collect()
}

/// Open requests where `user_id` is the executor.
pub fn get_user_approving_requests(store: &KeyValueStore, user_id: &str) -> Vec<Request> {
    get_all_requests(store)
        .into_iter()
        .filter(|request| request.executor_id.as_deref() == Some(user_id) && request.status.is_open())
        .collect()
}

pub fn filter_requests(store: &KeyValueStore, filters: &RequestFilters) -> Vec<Request> {
    apply_request_filters(get_all_requests(store), filters, false)
}

/// Applies each present criterion as an AND predicate.
///
/// `search_system_name` widens the free-text search to the system name, as
/// the support desk view does.
pub fn apply_request_filters(
    mut requests: Vec<Request>,
    filters: &RequestFilters,
    search_system_name: bool,
) -> Vec<Request> {
    let search = normalize_query(filters.search.as_deref());
    let system = filters.system.as_deref().filter(|value| !value.is_empty());
    let responsible = filters.responsible.as_deref().filter(|value| !value.is_empty());
    let responsible_lower = responsible.map(str::to_lowercase);
    let from = filters.date_from.map(start_of_day);
    let to = filters.date_to.map(end_of_day);

    requests.retain(|request| {
        if let Some(needle) = search.as_deref() {
            let matches = contains_ci(&request.number, needle)
                || contains_ci(&request.content, needle)
                || contains_ci(&request.type_name, needle)
                || (search_system_name && contains_ci(&request.system_name, needle));
            if !matches {
                return false;
            }
        }

        if let Some(system_id) = system {
            if request.system_id != system_id {
                return false;
            }
        }

        if let Some(status) = filters.status {
            if request.status != status {
                return false;
            }
        }

        if let Some(from) = from {
            if request.created_at < from {
                return false;
            }
        }

        if let Some(to) = to {
            if request.created_at > to {
                return false;
            }
        }

        if let (Some(responsible), Some(needle)) = (responsible, responsible_lower.as_deref()) {
            let by_id = request.executor_id.as_deref() == Some(responsible);
            let by_name = request
                .executor_name
                .as_deref()
                .map(|name| contains_ci(name, needle))
                .unwrap_or(false);
            if !by_id && !by_name {
                return false;
            }
        }

        true
    });
    requests
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let end = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    date.and_time(end).and_utc()
}

/// Upserts a request, replacing every field of a stored one. A missing id
/// or creation time is generated.
pub fn save_request(store: &KeyValueStore, payload: SaveRequestPayload) -> Request {
    let request = Request {
        id: payload
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("req-{}", Uuid::new_v4().simple())),
        system_id: payload.system_id,
        system_name: payload.system_name,
        author_id: payload.author_id,
        author_name: payload.author_name,
        executor_id: payload.executor_id,
        executor_name: payload.executor_name,
        type_id: payload.type_id,
        type_name: payload.type_name,
        number: payload.number,
        content: payload.content,
        status: payload.status,
        created_at: payload.created_at.unwrap_or_else(Utc::now),
        planned_date: payload.planned_date,
        execution_date: payload.execution_date,
        closed_date: payload.closed_date,
        url: payload.url,
    };

    let mut requests = get_all_requests(store);
    upsert(&mut requests, request.clone());
    store.set(STORAGE_KEY, &requests);
    tracing::debug!(request_id = %request.id, status = request.status.as_str(), "saved request");
    request
}

pub fn update_request_status(store: &KeyValueStore, request_id: &str, status: RequestStatus) -> Option<Request> {
    update_request_status_at(store, request_id, status, Utc::now())
}

/// Sets any status directly; `completed` stamps the execution date and
/// `closed` stamps the closed date.
pub fn update_request_status_at(
    store: &KeyValueStore,
    request_id: &str,
    status: RequestStatus,
    now: DateTime<Utc>,
) -> Option<Request> {
    let mut requests = get_all_requests(store);
    let request = requests.iter_mut().find(|request| request.id == request_id)?;

    request.status = status;
    match status {
        RequestStatus::Completed => request.execution_date = Some(now),
        RequestStatus::Closed => request.closed_date = Some(now),
        _ => {}
    }
    let updated = request.clone();

    store.set(STORAGE_KEY, &requests);
    tracing::debug!(request_id, status = status.as_str(), "updated request status");
    Some(updated)
}

pub fn delete_request(store: &KeyValueStore, request_id: &str) {
    delete_by_id(store, STORAGE_KEY, DEFAULT_REQUESTS.as_slice(), request_id);
}
