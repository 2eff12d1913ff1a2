use crate::errors::{AppError, AppResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// JSON key-value store standing in for browser-local storage.
///
/// Every collection lives under one `<prefix>_<name>` key. Reads and writes
/// never fail from the caller's point of view: errors are logged and reads
/// fall back to the caller's default.
#[derive(Debug)]
pub struct KeyValueStore {
    conn: Mutex<Connection>,
    prefix: String,
    db_path: Option<PathBuf>,
}

impl KeyValueStore {
    pub fn open(path: &Path, prefix: &str) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;
        tracing::debug!(path = %path.to_string_lossy(), prefix, "opened key-value store");

        Ok(Self {
            conn: Mutex::new(conn),
            prefix: prefix.to_string(),
            db_path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory(prefix: &str) -> AppResult<Self> {
        let conn = Connection::open_in_memory().map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
            prefix: prefix.to_string(),
            db_path: None,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn key(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }

    pub fn get<T: DeserializeOwned>(&self, name: &str, default: T) -> T {
        let key = self.key(name);
        match self.try_get::<T>(&key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(error) => {
                tracing::error!(key = %key, error = %error, "failed to read value, using default");
                default
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, name: &str, value: &T) {
        let key = self.key(name);
        if let Err(error) = self.try_set(&key, value) {
            tracing::error!(key = %key, error = %error, "failed to write value");
        }
    }

    pub fn remove(&self, name: &str) {
        let key = self.key(name);
        let result = self
            .lock()
            .and_then(|conn| Ok(conn.execute("DELETE FROM kv_entries WHERE key = ?1", [&key])?));
        if let Err(error) = result {
            tracing::error!(key = %key, error = %error, "failed to remove value");
        }
    }

    /// Wipes every key owned by this store's prefix.
    pub fn clear(&self) {
        let namespace = format!("{}_", self.prefix);
        let result = self.lock().and_then(|conn| {
            Ok(conn.execute(
                "DELETE FROM kv_entries WHERE substr(key, 1, ?2) = ?1",
                params![namespace, namespace.chars().count() as i64],
            )?)
        });
        match result {
            Ok(removed) => tracing::debug!(prefix = %self.prefix, removed, "cleared key-value store"),
            Err(error) => tracing::error!(prefix = %self.prefix, error = %error, "failed to clear store"),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        let key = self.key(name);
        let result = self.lock().and_then(|conn| {
            Ok(conn
                .query_row("SELECT 1 FROM kv_entries WHERE key = ?1", [&key], |_| Ok(()))
                .optional()?
                .is_some())
        });
        result.unwrap_or_else(|error| {
            tracing::error!(key = %key, error = %error, "failed to probe key");
            false
        })
    }

    pub fn keys(&self) -> Vec<String> {
        let namespace = format!("{}_", self.prefix);
        let result = self.lock().and_then(|conn| {
            let mut statement = conn.prepare(
                "SELECT key FROM kv_entries WHERE substr(key, 1, ?2) = ?1 ORDER BY key",
            )?;
            let rows = statement.query_map(
                params![namespace, namespace.chars().count() as i64],
                |row| row.get::<_, String>(0),
            )?;
            let mut keys = Vec::new();
            for row in rows {
                keys.push(row?);
            }
            Ok(keys)
        });
        result.unwrap_or_else(|error| {
            tracing::error!(prefix = %self.prefix, error = %error, "failed to list keys");
            Vec::new()
        })
    }

    /// Raw write used by tests to simulate a corrupted entry.
    #[cfg(test)]
    pub(crate) fn set_raw(&self, name: &str, raw: &str) -> AppResult<()> {
        let key = self.key(name);
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv_entries (key, value_json, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![key, raw, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn try_get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let raw = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT value_json FROM kv_entries WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?
        };

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str::<T>(&raw)?)),
            None => Ok(None),
        }
    }

    fn try_set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> AppResult<()> {
        let raw = serde_json::to_string(value)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv_entries (key, value_json, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![key, raw, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("store mutex poisoned".to_string()))
    }
}
