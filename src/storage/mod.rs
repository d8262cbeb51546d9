use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{config::Database, storage::error::StorageError};

pub mod blobs;
pub mod db;
pub mod error;
pub mod records;
pub(crate) mod schema;

pub use blobs::BlobStore;
pub use records::RecordStore;

/// SQLite-backed record and blob store sharing a single connection.
///
/// Each call locks the connection for the duration of one statement, so
/// per-key operations are atomic while sequences of calls are not.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// when called, opens a data base connection
    pub fn open(config: &Database) -> Result<Self, StorageError> {
        let db = db::open(config)?;
        Ok(Self::from_existing_conn(db))
    }

    pub fn from_existing_conn(db: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(db)),
        }
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        f(&conn)
    }
}

#[cfg(test)]
impl SqliteStore {
    pub(crate) fn blob_count(&self) -> Result<usize, StorageError> {
        self.with_conn(|db| {
            let count: i64 = db.query_row(
                &format!("SELECT COUNT(*) FROM {}", schema::BLOBS),
                [],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
    }
}
