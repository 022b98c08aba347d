//! Durable key-value option stores backing `DatabaseCache`.
//!
//! Values are opaque JSON documents; the cache decides what shape it expects.
//!
//! - `MemoryOptionStore`: DashMap-backed, process lifetime only
//! - `SqliteOptionStore`: one `options` table in a SQLite file

use std::path::Path;
use std::sync::Mutex;

use dashmap::DashMap;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::StoreError;

/// Read/write access to named options.
pub trait OptionStore: Send + Sync {
    /// Raw stored value, or `None` when the option does not exist.
    fn read(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Insert or overwrite an option.
    fn write(&self, key: &str, value: &Value) -> Result<(), StoreError>;
}

impl<S: OptionStore + ?Sized> OptionStore for std::sync::Arc<S> {
    fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        (**self).write(key, value)
    }
}

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    options: DashMap<String, Value>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl OptionStore for MemoryOptionStore {
    fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.options.get(key).map(|v| v.value().clone()))
    }

    fn write(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.options.insert(key.to_string(), value.clone());
        Ok(())
    }
}

// =============================================================================
// SQLite store
// =============================================================================

/// Option store persisted in SQLite.
///
/// Each option is one row holding its JSON text.
pub struct SqliteOptionStore {
    db: Mutex<Connection>,
}

impl SqliteOptionStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Connection::open(path)?;
        db.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(db, &path.display().to_string())
    }

    /// Database that lives only as long as this store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, ":memory:")
    }

    fn init(db: Connection, label: &str) -> Result<Self, StoreError> {
        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS options (
                option_name TEXT PRIMARY KEY,
                option_value TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            );",
        )?;
        info!(path = label, "Option store initialized");
        Ok(Self { db: Mutex::new(db) })
    }

    /// Names of all stored options, sorted.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = db.prepare_cached("SELECT option_name FROM options ORDER BY option_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

impl OptionStore for SqliteOptionStore {
    fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = db.prepare_cached("SELECT option_value FROM options WHERE option_name = ?1")?;
        let raw: Option<String> = stmt.query_row([key], |row| row.get(0)).optional()?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let text = serde_json::to_string(value)?;
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        db.execute(
            "INSERT INTO options (option_name, option_value, updated_at)
             VALUES (?1, ?2, strftime('%s', 'now'))
             ON CONFLICT(option_name) DO UPDATE SET option_value = ?2, updated_at = strftime('%s', 'now')",
            rusqlite::params![key, text],
        )?;
        debug!(key, bytes = text.len(), "Saved option");
        Ok(())
    }
}
