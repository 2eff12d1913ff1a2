use crate::errors::{AppError, AppResult};
use crate::store::KeyValueStore;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

const SETTINGS_KEY: &str = "settings";

/// Upper bound for `notificationRetentionDays` (one hundred years).
pub const MAX_RETENTION_DAYS: u32 = 36_500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulatorSettings {
    pub enabled: bool,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub probability: f64,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_delay_ms: 30_000,
            max_delay_ms: 120_000,
            probability: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortalSettings {
    pub storage_prefix: String,
    pub notification_retention_days: u32,
    pub search_debounce_ms: u64,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    pub simulator: SimulatorSettings,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            storage_prefix: "portal".to_string(),
            notification_retention_days: 30,
            search_debounce_ms: 300,
            log_level: "info".to_string(),
            simulator: SimulatorSettings::default(),
        }
    }
}

impl PortalSettings {
    /// Reads `path` as YAML. A missing file yields the defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.to_string_lossy(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        let settings = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str::<Self>(&raw)?
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.storage_prefix.trim().is_empty() {
            return Err(AppError::Validation("storagePrefix must not be empty".to_string()));
        }
        if self.log_level.trim().is_empty() {
            return Err(AppError::Validation("logLevel must not be empty".to_string()));
        }
        if self.notification_retention_days > MAX_RETENTION_DAYS {
            return Err(AppError::Validation(format!(
                "notificationRetentionDays must be at most {MAX_RETENTION_DAYS}, got {}",
                self.notification_retention_days
            )));
        }
        if self.simulator.min_delay_ms > self.simulator.max_delay_ms {
            return Err(AppError::Validation(format!(
                "simulator.minDelayMs ({}) exceeds simulator.maxDelayMs ({})",
                self.simulator.min_delay_ms, self.simulator.max_delay_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.simulator.probability) {
            return Err(AppError::Validation(format!(
                "simulator.probability must be within [0, 1], got {}",
                self.simulator.probability
            )));
        }
        Ok(())
    }
}

/// Effective settings: `base` with any overrides persisted in the store applied.
pub fn get_settings(store: &KeyValueStore, base: &PortalSettings) -> PortalSettings {
    let overrides: serde_json::Value = store.get(SETTINGS_KEY, serde_json::Value::Null);
    if overrides.is_null() {
        return base.clone();
    }
    match apply_overrides(base, overrides) {
        Ok(settings) => settings,
        Err(error) => {
            tracing::warn!(error = %error, "ignoring invalid stored settings overrides");
            base.clone()
        }
    }
}

/// Merges `update` into the stored overrides and returns the resulting settings.
pub fn update_settings(
    store: &KeyValueStore,
    base: &PortalSettings,
    update: serde_json::Value,
) -> AppResult<PortalSettings> {
    let mut overrides: serde_json::Value = store.get(SETTINGS_KEY, serde_json::json!({}));
    if !overrides.is_object() {
        overrides = serde_json::json!({});
    }
    merge_json(&mut overrides, update);

    let settings = apply_overrides(base, overrides.clone())?;
    store.set(SETTINGS_KEY, &overrides);
    Ok(settings)
}

fn apply_overrides(base: &PortalSettings, overrides: serde_json::Value) -> AppResult<PortalSettings> {
    let mut merged = serde_json::to_value(base)?;
    merge_json(&mut merged, overrides);
    let settings: PortalSettings = serde_json::from_value(merged)?;
    settings.validate()?;
    Ok(settings)
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = PortalSettings::load(&dir.path().join("portal.yaml")).expect("settings");
        assert_eq!(settings, PortalSettings::default());
    }

    #[test]
    fn yaml_overrides_only_named_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("portal.yaml");
        std::fs::write(
            &path,
            "storagePrefix: moex\nsimulator:\n  enabled: false\n  probability: 0.25\n",
        )
        .expect("write yaml");

        let settings = PortalSettings::load(&path).expect("settings");
        assert_eq!(settings.storage_prefix, "moex");
        assert!(!settings.simulator.enabled);
        assert_eq!(settings.simulator.probability, 0.25);
        assert_eq!(settings.simulator.min_delay_ms, 30_000);
        assert_eq!(settings.notification_retention_days, 30);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn inverted_delay_bounds_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("portal.yaml");
        std::fs::write(&path, "simulator:\n  minDelayMs: 5000\n  maxDelayMs: 10\n").expect("write yaml");

        let error = PortalSettings::load(&path).expect_err("should reject");
        assert!(error.to_string().starts_with("VALIDATION"));
    }

    #[test]
    fn stored_overrides_merge_over_base() {
        let store = KeyValueStore::open_in_memory("test").expect("store");
        let base = PortalSettings::default();

        let updated = update_settings(&store, &base, serde_json::json!({ "simulator": { "enabled": false } }))
            .expect("update");
        assert!(!updated.simulator.enabled);
        assert_eq!(updated.simulator.max_delay_ms, 120_000);

        let updated = update_settings(&store, &base, serde_json::json!({ "notificationRetentionDays": 7 }))
            .expect("update");
        assert!(!updated.simulator.enabled);
        assert_eq!(updated.notification_retention_days, 7);
        assert_eq!(get_settings(&store, &base), updated);
    }

    #[test]
    fn invalid_override_is_not_persisted() {
        let store = KeyValueStore::open_in_memory("test").expect("store");
        let base = PortalSettings::default();
        let result = update_settings(&store, &base, serde_json::json!({ "simulator": { "probability": 3.0 } }));
        assert!(result.is_err());
        assert_eq!(get_settings(&store, &base), base);
    }

    #[test]
    fn retention_window_is_bounded() {
        let store = KeyValueStore::open_in_memory("test").expect("store");
        let base = PortalSettings::default();

        let error = update_settings(&store, &base, serde_json::json!({ "notificationRetentionDays": 4_000_000_000u64 }))
            .expect_err("should reject");
        assert!(error.to_string().starts_with("VALIDATION"));
        assert_eq!(get_settings(&store, &base), base);

        let updated = update_settings(&store, &base, serde_json::json!({ "notificationRetentionDays": MAX_RETENTION_DAYS }))
            .expect("boundary value");
        assert_eq!(updated.notification_retention_days, MAX_RETENTION_DAYS);
    }
}
