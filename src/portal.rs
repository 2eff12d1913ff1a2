use crate::config::{self, PortalSettings};
use crate::debounce::Debouncer;
use crate::errors::AppResult;
use crate::models::PortalStats;
use crate::notification_center::{NotificationCenter, SimulatorHandle};
use crate::pages::{AdminPage, RequestsPage, ServicesCatalogPage, SupportPage, SystemsCatalogPage, TasksPage};
use crate::services::{self, notifications};
use crate::store::KeyValueStore;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::Duration;

const DATABASE_FILE: &str = "portal.sqlite";
const RETENTION_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Default)]
struct BackgroundTasks {
    simulator: Option<SimulatorHandle>,
    retention: Option<JoinHandle<()>>,
}

/// Application root: owns the store, seeds it, and runs the background
/// jobs (notification feed and retention sweep).
pub struct PortalCore {
    store: Arc<KeyValueStore>,
    base_settings: PortalSettings,
    notifications: NotificationCenter,
    data_dir: Option<PathBuf>,
    background: Mutex<BackgroundTasks>,
}

impl PortalCore {
    pub fn new(data_dir: PathBuf, settings: PortalSettings) -> AppResult<Arc<Self>> {
        settings.validate()?;
        let store = KeyValueStore::open(&data_dir.join(DATABASE_FILE), &settings.storage_prefix)?;
        Ok(Self::build(store, settings, Some(data_dir)))
    }

    /// Same as [`PortalCore::new`] but backed by an in-memory store.
    pub fn in_memory(settings: PortalSettings) -> AppResult<Arc<Self>> {
        settings.validate()?;
        let store = KeyValueStore::open_in_memory(&settings.storage_prefix)?;
        Ok(Self::build(store, settings, None))
    }

    fn build(store: KeyValueStore, settings: PortalSettings, data_dir: Option<PathBuf>) -> Arc<Self> {
        let store = Arc::new(store);
        let stats = services::initialize_all(&store);
        let notifications = NotificationCenter::new(store.clone());
        tracing::info!(
            prefix = %settings.storage_prefix,
            data_dir = ?data_dir,
            requests = stats.requests,
            tasks = stats.tasks,
            "portal core ready"
        );

        Arc::new(Self {
            store,
            base_settings: settings,
            notifications,
            data_dir,
            background: Mutex::new(BackgroundTasks::default()),
        })
    }

    pub fn store(&self) -> &Arc<KeyValueStore> {
        &self.store
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// File settings with stored overrides applied.
    pub fn settings(&self) -> PortalSettings {
        config::get_settings(&self.store, &self.base_settings)
    }

    pub fn update_settings(&self, patch: serde_json::Value) -> AppResult<PortalSettings> {
        config::update_settings(&self.store, &self.base_settings, patch)
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn stats(&self) -> PortalStats {
        services::collect_stats(&self.store)
    }

    pub fn debouncer(&self) -> Debouncer {
        Debouncer::from_settings(&self.settings())
    }

    pub fn systems_page(&self) -> SystemsCatalogPage {
        SystemsCatalogPage::new(self.store.clone())
    }

    pub fn services_page(&self) -> ServicesCatalogPage {
        ServicesCatalogPage::new(self.store.clone())
    }

    pub fn requests_page(&self) -> RequestsPage {
        RequestsPage::new(self.store.clone())
    }

    pub fn tasks_page(&self) -> TasksPage {
        TasksPage::new(self.store.clone())
    }

    pub fn support_page(&self) -> SupportPage {
        SupportPage::new(self.store.clone())
    }

    pub fn admin_page(&self) -> AdminPage {
        AdminPage::new(self.store.clone())
    }

    /// Purges read notifications past the configured retention window.
    pub fn run_retention(&self) -> usize {
        let days = self.settings().notification_retention_days;
        let removed = notifications::clear_old_notifications(&self.store, days);
        self.notifications.refresh();
        removed
    }

    /// Starts the notification simulator (when enabled) and the hourly
    /// retention sweep. Calling it again while running is a no-op.
    pub fn start_background(self: &Arc<Self>) {
        let settings = self.settings();
        let mut background = self.background();

        if background.simulator.is_none() && settings.simulator.enabled {
            background.simulator = Some(self.notifications.start_simulator(&settings.simulator));
        }

        if background.retention.is_none() {
            let weak = Arc::downgrade(self);
            background.retention = Some(tokio::spawn(async move {
                let mut interval = tokio::time::interval(RETENTION_INTERVAL);
                loop {
                    interval.tick().await;
                    let Some(core) = weak.upgrade() else {
                        break;
                    };
                    let removed = core.run_retention();
                    if removed > 0 {
                        tracing::info!(removed, "notification retention sweep");
                    }
                }
            }));
        }
    }

    pub fn is_background_running(&self) -> bool {
        let background = self.background();
        background.simulator.as_ref().is_some_and(SimulatorHandle::is_running)
            || background.retention.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops the background jobs and waits for the simulator to exit.
    pub async fn shutdown(&self) {
        let (simulator, retention) = {
            let mut background = self.background();
            (background.simulator.take(), background.retention.take())
        };

        if let Some(retention) = retention {
            retention.abort();
        }
        if let Some(simulator) = simulator {
            simulator.shutdown().await;
        }
        tracing::info!("portal background tasks stopped");
    }

    fn background(&self) -> MutexGuard<'_, BackgroundTasks> {
        self.background.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PortalCore {
    fn drop(&mut self) {
        let background = self.background.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(retention) = background.retention.take() {
            retention.abort();
        }
    }
}
