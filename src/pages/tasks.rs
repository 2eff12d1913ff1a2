use crate::models::{SaveTaskPayload, Task, TaskFilters, TaskStatus};
use crate::services::{tasks, users};
use crate::store::KeyValueStore;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskTab {
    All,
    /// Active tasks only.
    #[default]
    Current,
    Completed,
    Overdue,
}

impl TaskTab {
    fn status(self) -> Option<TaskStatus> {
        match self {
            Self::All => None,
            Self::Current => Some(TaskStatus::Active),
            Self::Completed => Some(TaskStatus::Completed),
            Self::Overdue => Some(TaskStatus::Overdue),
        }
    }
}

pub struct TasksPage {
    store: Arc<KeyValueStore>,
    tab: TaskTab,
    filters: TaskFilters,
    tasks: Vec<Task>,
}

impl TasksPage {
    /// Refreshes `daysLeft` before the first load.
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        tasks::update_days_left(&store);
        let loaded = tasks::get_all_tasks(&store);
        Self {
            store,
            tab: TaskTab::default(),
            filters: TaskFilters::default(),
            tasks: loaded,
        }
    }

    pub fn reload(&mut self) {
        self.tasks = tasks::get_all_tasks(&self.store);
    }

    pub fn tab(&self) -> TaskTab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: TaskTab) {
        self.tab = tab;
    }

    pub fn set_filters(&mut self, filters: TaskFilters) {
        self.filters = filters;
    }

    pub fn visible_tasks(&self) -> Vec<Task> {
        let mut in_tab = self.tasks.clone();
        if let Some(status) = self.tab.status() {
            in_tab.retain(|task| task.status == status);
        }
        tasks::apply_task_filters(in_tab, &self.filters)
    }

    /// Saves the form. New tasks without an assignee or author are
    /// attributed to the current user.
    pub fn save(&mut self, mut payload: SaveTaskPayload) -> Task {
        if payload.id.is_none() {
            let current = users::get_current_user(&self.store);
            if payload.assignee.trim().is_empty() {
                payload.assignee = current.full_name.clone();
            }
            if payload.author.trim().is_empty() {
                payload.author = current.full_name;
            }
        }
        let saved = tasks::save_task(&self.store, payload);
        self.reload();
        saved
    }

    pub fn complete(&mut self, task_id: &str) {
        tasks::complete_task(&self.store, task_id);
        self.reload();
    }

    /// Duplicates a task as a new active task titled "Copy: ...".
    pub fn copy(&mut self, task_id: &str) -> Option<Task> {
        let original = self.tasks.iter().find(|task| task.id == task_id)?.clone();
        let mut payload = SaveTaskPayload::from(original);
        payload.id = None;
        payload.number = None;
        payload.created_at = None;
        payload.completed_date = None;
        payload.status = TaskStatus::Active;
        payload.title = format!("Copy: {}", payload.title);
        Some(self.save(payload))
    }

    pub fn delete(&mut self, task_id: &str) {
        tasks::delete_task(&self.store, task_id);
        self.reload();
    }
}
