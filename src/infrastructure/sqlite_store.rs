//! `SQLite` record store for the host's status and device rows.
//!
//! Holds the singleton `metadata` row (main status) and the `devices`
//! table. The connection sits behind a mutex so the store can be shared
//! with the background reconciliation worker.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::application::RecordStore;
use crate::domain::{AppError, DeviceRecord, MainStatus, Result, StatusRecord};

/// Record store repository using `SQLite`.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Opens or creates the record store database.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or schema creation fails.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create store directory", e))?;
        }

        let conn = Connection::open(path).map_err(AppError::database)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(AppError::database)?;

        Self::with_connection(conn)
    }

    #[cfg(test)]
    /// Opens a private in-memory store.
    ///
    /// # Errors
    /// Returns error if schema creation fails.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(AppError::database)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize database schema. The status row is not created here.
    fn init_schema(&self) -> Result<()> {
        self.conn()?
            .execute_batch(
                r"
            -- Singleton main status row
            CREATE TABLE IF NOT EXISTS metadata (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                status INTEGER NOT NULL,
                last_updated TEXT NOT NULL
            );

            -- Known devices
            CREATE TABLE IF NOT EXISTS devices (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL DEFAULT '',
                is_using INTEGER NOT NULL DEFAULT 0,
                last_seen TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_devices_using
                ON devices(is_using);
            ",
            )
            .map_err(AppError::database)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| AppError::lock_poisoned())
    }

    /// Insert the status row with `status` unless one already exists.
    ///
    /// Returns `true` if a row was inserted.
    pub fn seed_status_record(&self, status: MainStatus) -> Result<bool> {
        let inserted = self
            .conn()?
            .execute(
                "INSERT OR IGNORE INTO metadata (id, status, last_updated) VALUES (1, ?1, ?2)",
                params![status.code(), Utc::now().to_rfc3339()],
            )
            .map_err(AppError::database)?;

        Ok(inserted > 0)
    }

    /// Register a device, or rename it if already known.
    pub fn upsert_device(&self, id: &str, name: &str) -> Result<()> {
        self.conn()?
            .execute(
                r"
            INSERT INTO devices (id, name) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name
            ",
                params![id, name],
            )
            .map_err(AppError::database)?;

        Ok(())
    }

    /// Set the in-use flag of a known device and stamp its activity time.
    ///
    /// # Errors
    /// Returns `InvalidData` if the device is unknown.
    pub fn set_device_using(&self, id: &str, using: bool) -> Result<()> {
        let updated = self
            .conn()?
            .execute(
                "UPDATE devices SET is_using = ?2, last_seen = ?3 WHERE id = ?1",
                params![id, using, Utc::now().to_rfc3339()],
            )
            .map_err(AppError::database)?;

        if updated == 0 {
            return Err(AppError::InvalidData {
                message: format!("Device not found: {id}"),
            });
        }

        Ok(())
    }

    /// Get all devices ordered by id.
    pub fn list_devices(&self) -> Result<Vec<DeviceRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, name, is_using, last_seen FROM devices ORDER BY id")
            .map_err(AppError::database)?;

        let rows = stmt
            .query_map([], |row| {
                let last_seen: Option<String> = row.get(3)?;
                Ok(DeviceRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    using: row.get(2)?,
                    last_seen: last_seen.as_deref().and_then(parse_timestamp),
                })
            })
            .map_err(AppError::database)?;

        let mut devices = Vec::new();
        for row in rows {
            match row {
                Ok(device) => devices.push(device),
                Err(e) => tracing::warn!("Failed to read device row: {}", e),
            }
        }

        Ok(devices)
    }
}

impl RecordStore for SqliteRecordStore {
    fn status_record(&self) -> Result<Option<StatusRecord>> {
        let row = self
            .conn()?
            .query_row(
                "SELECT status, last_updated FROM metadata WHERE id = 1",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(AppError::database)?;

        let Some((code, last_updated)) = row else {
            return Ok(None);
        };

        let status =
            MainStatus::try_from(code).map_err(|message| AppError::InvalidData { message })?;
        let last_updated = parse_timestamp(&last_updated).ok_or_else(|| AppError::InvalidData {
            message: format!("Invalid status timestamp: {last_updated}"),
        })?;

        Ok(Some(StatusRecord {
            status,
            last_updated,
        }))
    }

    fn count_active_devices(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM devices WHERE is_using = 1", [], |row| {
                row.get(0)
            })
            .map_err(AppError::database)?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn save_status_record(&self, record: &StatusRecord) -> Result<()> {
        self.conn()?
            .execute(
                r"
            INSERT INTO metadata (id, status, last_updated) VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                last_updated = excluded.last_updated
            ",
                params![record.status.code(), record.last_updated.to_rfc3339()],
            )
            .map_err(AppError::database)?;

        Ok(())
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("hub.db");

        let store = SqliteRecordStore::open(&db_path).unwrap();

        let count: i64 = store
            .conn()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(count, 2);
        assert!(store.status_record().unwrap().is_none());
    }

    #[test]
    fn test_seed_is_idempotent() {
        let store = SqliteRecordStore::open_in_memory().unwrap();

        assert!(store.seed_status_record(MainStatus::Sleepy).unwrap());
        assert!(!store.seed_status_record(MainStatus::Awake).unwrap());

        let record = store.status_record().unwrap().unwrap();
        assert_eq!(record.status, MainStatus::Sleepy);
    }

    #[test]
    fn test_status_record_roundtrip() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.seed_status_record(MainStatus::Sleepy).unwrap();

        let record = StatusRecord::now(MainStatus::Awake);
        store.save_status_record(&record).unwrap();

        let loaded = store.status_record().unwrap().unwrap();
        assert_eq!(loaded.status, MainStatus::Awake);
        assert_eq!(loaded.last_updated.timestamp(), record.last_updated.timestamp());
    }

    #[test]
    fn test_counts_only_active_devices() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.upsert_device("lamp", "Desk lamp").unwrap();
        store.upsert_device("tv", "").unwrap();
        store.upsert_device("fan", "").unwrap();
        assert_eq!(store.count_active_devices().unwrap(), 0);

        store.set_device_using("lamp", true).unwrap();
        store.set_device_using("tv", true).unwrap();
        assert_eq!(store.count_active_devices().unwrap(), 2);

        store.set_device_using("tv", false).unwrap();
        assert_eq!(store.count_active_devices().unwrap(), 1);
    }

    #[test]
    fn test_unknown_device_is_rejected() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let err = store.set_device_using("ghost", true).unwrap_err();
        assert!(matches!(err, AppError::InvalidData { .. }));
    }

    #[test]
    fn test_list_devices() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.upsert_device("b", "Second").unwrap();
        store.upsert_device("a", "First").unwrap();
        store.set_device_using("a", true).unwrap();
        store.upsert_device("a", "Renamed").unwrap();

        let devices = store.list_devices().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].id, "a");
        assert_eq!(devices[0].name, "Renamed");
        assert!(devices[0].using);
        assert!(devices[0].last_seen.is_some());
        assert!(!devices[1].using);
        assert!(devices[1].last_seen.is_none());
    }

    #[test]
    fn test_invalid_status_code() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO metadata (id, status, last_updated) VALUES (1, 9, ?1)",
                [Utc::now().to_rfc3339()],
            )
            .unwrap();

        assert!(matches!(
            store.status_record(),
            Err(AppError::InvalidData { .. })
        ));
    }
}
