use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{Result, SubdeckError};
use crate::store::KvStore;

/// Key-value substrate backed by a single SQLite table.
pub struct SqliteKv {
    conn: Mutex<Connection>,
}

impl SqliteKv {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| SubdeckError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            SubdeckError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }
}

impl KvStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    fn total_bytes(&self) -> Result<u64> {
        let conn = self.lock()?;
        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(key) + LENGTH(value)), 0) FROM kv",
            [],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_absent_key() {
        let kv = SqliteKv::in_memory().unwrap();
        assert_eq!(kv.get("missing").unwrap(), None);
    }

    #[test]
    fn test_set_and_get() {
        let kv = SqliteKv::in_memory().unwrap();
        kv.set("a", "[1,2,3]").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("[1,2,3]"));
    }

    #[test]
    fn test_set_overwrites() {
        let kv = SqliteKv::in_memory().unwrap();
        kv.set("a", "old").unwrap();
        kv.set("a", "new").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn test_total_bytes_sums_keys_and_values() {
        let kv = SqliteKv::in_memory().unwrap();
        assert_eq!(kv.total_bytes().unwrap(), 0);
        kv.set("ab", "xyz").unwrap();
        kv.set("c", "12").unwrap();
        assert_eq!(kv.total_bytes().unwrap(), 5 + 3);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subdeck.db");

        {
            let kv = SqliteKv::new(&path).unwrap();
            kv.set("a", "persisted").unwrap();
        }

        let kv = SqliteKv::new(&path).unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("persisted"));
    }
}
