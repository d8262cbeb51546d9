use std::path::Path;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::{
    config::Database,
    storage::{error::StorageError, schema},
};

pub type MillisSinceUnix = i64;

fn open_in_memory() -> Result<rusqlite::Connection, rusqlite::Error> {
    Connection::open_in_memory()
}

fn open_from_file(path: &Path) -> Result<rusqlite::Connection, rusqlite::Error> {
    Connection::open(path)
}

pub fn open(config: &Database) -> Result<rusqlite::Connection, StorageError> {
    let db = match config {
        Database::InMemory => open_in_memory()?,
        Database::OnDisk { path } => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StorageError::Internal(anyhow!(
                            "failed to create database directory {}: {e}",
                            parent.to_string_lossy()
                        ))
                    })?;
                }
            }
            open_from_file(path)?
        }
    };
    schema::init(&db)?;
    Ok(db)
}

/// current time as milliseconds since unix epoch
pub fn now_millis() -> MillisSinceUnix {
    Utc::now().timestamp_millis()
}

/// converts milliseconds since unix epoch to utc date time
pub fn millis_to_utc(since_unix: MillisSinceUnix) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(since_unix)
        .ok_or(anyhow!("failed to convert {since_unix} ms timestamp to datetime"))
}
