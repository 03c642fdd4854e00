use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::kv::{KvBackend, KvError, StorageErrorCode};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv_entries (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at_ms INTEGER NOT NULL
)";

/// Durable backend for native shells, one row per raw key.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KvError> {
        let conn = Connection::open(path).map_err(map_sqlite_error)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, KvError> {
        let conn = Connection::open_in_memory().map_err(map_sqlite_error)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, KvError> {
        conn.execute_batch(SCHEMA).map_err(map_sqlite_error)?;
        Ok(Self { conn })
    }

    pub fn len(&self) -> Result<usize, KvError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM kv_entries", [], |row| row.get(0))
            .map_err(map_sqlite_error)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn is_empty(&self) -> Result<bool, KvError> {
        Ok(self.len()? == 0)
    }
}

impl KvBackend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sqlite_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.conn
            .execute(
                "INSERT INTO kv_entries (key, value, updated_at_ms) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at_ms = excluded.updated_at_ms",
                params![key, value, Utc::now().timestamp_millis()],
            )
            .map_err(map_sqlite_error)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, KvError> {
        let removed = self
            .conn
            .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
            .map_err(map_sqlite_error)?;
        Ok(removed > 0)
    }
}

fn map_sqlite_error(err: rusqlite::Error) -> KvError {
    let code = match &err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::DatabaseBusy => StorageErrorCode::Busy,
            ErrorCode::DatabaseLocked => StorageErrorCode::Locked,
            ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase => StorageErrorCode::Corrupted,
            ErrorCode::DiskFull | ErrorCode::TooBig => StorageErrorCode::QuotaExceeded,
            ErrorCode::PermissionDenied | ErrorCode::ReadOnly => StorageErrorCode::PermissionDenied,
            ErrorCode::SystemIoFailure | ErrorCode::CannotOpen => StorageErrorCode::IoError,
            _ => StorageErrorCode::Unknown,
        },
        rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::InvalidColumnType(..) => {
            StorageErrorCode::Corrupted
        }
        _ => StorageErrorCode::Unknown,
    };
    KvError::storage(code, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::kv::{KvOperation, KvOutput};

    #[test]
    fn test_set_get_delete() {
        let backend = SqliteBackend::open_in_memory().unwrap();

        assert_eq!(backend.get("rr_theme").unwrap(), None);
        backend.set("rr_theme", "\"light\"").unwrap();
        backend.set("rr_theme", "\"dark\"").unwrap();
        assert_eq!(backend.get("rr_theme").unwrap().as_deref(), Some("\"dark\""));
        assert_eq!(backend.len().unwrap(), 1);

        assert!(backend.delete("rr_theme").unwrap());
        assert!(!backend.delete("rr_theme").unwrap());
        assert!(backend.is_empty().unwrap());
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");

        {
            let backend = SqliteBackend::open(&path).unwrap();
            let op = KvOperation::Set {
                key: "rr_camera".to_string(),
                value: "true".to_string(),
            };
            assert_eq!(backend.execute(&op), Ok(KvOutput::Written));
        }

        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(backend.get("rr_camera").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn test_open_non_database_reports_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.db");
        std::fs::write(&path, vec![0x42_u8; 4096]).unwrap();

        let err = SqliteBackend::open(&path).unwrap_err();
        assert!(matches!(
            err,
            KvError::Storage {
                code: StorageErrorCode::Corrupted,
                ..
            }
        ));
    }
}
