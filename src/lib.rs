pub mod config;
pub mod debounce;
pub mod errors;
pub mod models;
pub mod notification_center;
pub mod pages;
pub mod permissions;
pub mod portal;
pub mod services;
pub mod store;

pub use crate::config::{PortalSettings, SimulatorSettings};
pub use crate::errors::{AppError, AppResult};
pub use crate::notification_center::{NotificationCenter, SimulatorHandle};
pub use crate::portal::PortalCore;
pub use crate::store::KeyValueStore;

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const SETTINGS_FILE: &str = "portal.yaml";
const LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "portal.log";

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Boots the portal in `data_dir`, runs the background jobs until ctrl-c,
/// then stops them.
pub async fn run(data_dir: PathBuf) -> AppResult<()> {
    std::fs::create_dir_all(&data_dir)?;
    let settings = PortalSettings::load(&data_dir.join(SETTINGS_FILE))?;
    init_tracing(&data_dir, &settings)?;

    let portal = PortalCore::new(data_dir, settings)?;
    portal.start_background();
    tracing::info!(
        unread = portal.notifications().unread_count(),
        "service portal running"
    );

    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "failed to listen for shutdown signal");
    }
    portal.shutdown().await;
    Ok(())
}

/// JSON logs, rolled daily under `<data_dir>/logs`. `RUST_LOG` wins over
/// the configured `logLevel`.
pub fn init_tracing(data_dir: &Path, settings: &PortalSettings) -> AppResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.log_level).map_err(|error| {
            AppError::Validation(format!("invalid logLevel {:?}: {error}", settings.log_level))
        })?,
    };

    let log_dir = data_dir.join(LOG_DIR);
    std::fs::create_dir_all(&log_dir)?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX));
    if LOG_GUARD.set(guard).is_err() {
        return Err(AppError::Internal("tracing already initialized".to_string()));
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_writer(writer)
        .try_init()
        .map_err(|error| AppError::Internal(error.to_string()))?;
    tracing::info!(log_dir = %log_dir.display(), level = %settings.log_level, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_log_level_fails_before_touching_the_data_dir() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = PortalSettings {
            log_level: "portal=loudest".to_string(),
            ..PortalSettings::default()
        };

        let error = init_tracing(dir.path(), &settings).expect_err("should reject");
        assert!(error.to_string().starts_with("VALIDATION"));
        assert!(!dir.path().join(LOG_DIR).exists());
    }
}
