use crate::config::SimulatorSettings;
use crate::models::{NewNotification, Notification, NotificationKind, NotificationState};
use crate::services::notifications;
use crate::store::KeyValueStore;
use rand::Rng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Panel state for the header bell, backed by the notification collection.
///
/// Every mutation goes through the notification service first and then
/// reloads the in-memory snapshot, so the unread badge always matches what
/// is persisted.
#[derive(Clone)]
pub struct NotificationCenter {
    store: Arc<KeyValueStore>,
    state: Arc<Mutex<NotificationState>>,
}

impl NotificationCenter {
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        let center = Self {
            store,
            state: Arc::new(Mutex::new(NotificationState::default())),
        };
        center.refresh();
        center
    }

    pub fn state(&self) -> NotificationState {
        self.lock().clone()
    }

    pub fn unread_count(&self) -> usize {
        self.lock().unread_count
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_open
    }

    /// Reloads notifications from the store, keeping the panel open/closed.
    pub fn refresh(&self) {
        let notifications = notifications::get_all_notifications(&self.store);
        let unread_count = notifications.iter().filter(|notification| !notification.read).count();
        let mut state = self.lock();
        state.notifications = notifications;
        state.unread_count = unread_count;
    }

    pub fn open(&self) {
        self.lock().is_open = true;
    }

    pub fn close(&self) {
        self.lock().is_open = false;
    }

    pub fn mark_as_read(&self, notification_id: &str) {
        notifications::mark_as_read(&self.store, notification_id);
        self.refresh();
    }

    pub fn mark_all_as_read(&self) {
        notifications::mark_all_as_read(&self.store);
        self.refresh();
    }

    pub fn add_notification(&self, notification: NewNotification) -> Notification {
        let created = notifications::add_notification(&self.store, notification);
        self.refresh();
        created
    }

    /// Marks the notification read if needed, closes the panel and returns
    /// the link to follow, if any.
    pub fn handle_click(&self, notification_id: &str) -> Option<String> {
        let clicked = self
            .lock()
            .notifications
            .iter()
            .find(|notification| notification.id == notification_id)
            .cloned();

        if let Some(notification) = clicked.as_ref().filter(|notification| !notification.read) {
            self.mark_as_read(&notification.id);
        }
        self.close();
        clicked.and_then(|notification| notification.url)
    }

    /// Spawns the demo feed that occasionally injects a notification.
    pub fn start_simulator(&self, settings: &SimulatorSettings) -> SimulatorHandle {
        let shutdown = Arc::new(Notify::new());
        let center = self.clone();
        let settings = settings.clone();
        let signal = shutdown.clone();

        let task = tokio::spawn(async move {
            tracing::debug!(
                min_delay_ms = settings.min_delay_ms,
                max_delay_ms = settings.max_delay_ms,
                "notification simulator started"
            );
            loop {
                let delay = next_delay(&settings);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = signal.notified() => break,
                }

                if let Some(message) = draw_message(settings.probability) {
                    let created = center.add_notification(message);
                    tracing::debug!(notification_id = %created.id, "simulator delivered notification");
                }
            }
            tracing::debug!("notification simulator stopped");
        });

        SimulatorHandle {
            shutdown,
            task: Some(task),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NotificationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the simulator task. Dropping the handle aborts the task.
pub struct SimulatorHandle {
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl SimulatorHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Signals the loop to stop and waits for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            self.shutdown.notify_one();
            if let Err(error) = task.await {
                if !error.is_cancelled() {
                    tracing::warn!(error = %error, "notification simulator exited abnormally");
                }
            }
        }
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn next_delay(settings: &SimulatorSettings) -> Duration {
    let low = settings.min_delay_ms.min(settings.max_delay_ms);
    let high = settings.min_delay_ms.max(settings.max_delay_ms);
    Duration::from_millis(rand::rng().random_range(low..=high))
}

fn draw_message(probability: f64) -> Option<NewNotification> {
    let probability = if probability.is_nan() { 0.0 } else { probability.clamp(0.0, 1.0) };
    let mut rng = rand::rng();
    if !rng.random_bool(probability) {
        return None;
    }
    let pool = demo_messages();
    let index = rng.random_range(0..pool.len());
    pool.into_iter().nth(index)
}

fn demo_messages() -> Vec<NewNotification> {
    vec![
        NewNotification {
            title: "New request requires approval".to_string(),
            description: "An equipment purchase request is waiting for your approval".to_string(),
            url: Some("#".to_string()),
            document_number: Some("1110045".to_string()),
            system: Some("MPG".to_string()),
            kind: NotificationKind::Warning,
        },
        NewNotification {
            title: "Task completed".to_string(),
            description: "The task \"Prepare the report\" has been completed".to_string(),
            url: Some("#".to_string()),
            document_number: None,
            system: Some("ITSM".to_string()),
            kind: NotificationKind::Success,
        },
    ]
}
