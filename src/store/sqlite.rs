use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection};
use rusqlite_migration::{Migrations, M};

use crate::app::{ArchiveError, Result};
use crate::store::Store;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
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

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            ArchiveError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| ArchiveError::Other(format!("Ledger migration failed: {}", e)))?;

        Ok(())
    }
}

impl Store for SqliteStore {
    fn record_post(&self, channel_id: &str, post_id: i64, comment_count: usize) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO archived_posts (channel_id, post_id, comment_count, archived_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                channel_id,
                post_id,
                comment_count as i64,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn last_archived_id(&self, channel_id: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let id = conn.query_row(
            "SELECT MAX(post_id) FROM archived_posts WHERE channel_id = ?1",
            params![channel_id],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        Ok(id)
    }

    fn archived_count(&self, channel_id: &str) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM archived_posts WHERE channel_id = ?1",
            params![channel_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
