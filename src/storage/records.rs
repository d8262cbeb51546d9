//! Keyed persistence of track metadata records

use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row, params};

use crate::{
    domain::{BlobId, MusicCategory, TrackId, TrackRecord},
    storage::{
        SqliteStore,
        error::StorageError,
        schema::{columns::*, tables::*},
    },
};

/// Record store contract. Listing order is unspecified.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// inserts the record or replaces the one with the same id
    async fn put(&self, record: &TrackRecord) -> Result<(), StorageError>;
    async fn get(&self, id: TrackId) -> Result<Option<TrackRecord>, StorageError>;
    /// deleting a missing record is not an error
    async fn delete(&self, id: TrackId) -> Result<(), StorageError>;
    async fn list_all(&self) -> Result<Vec<TrackRecord>, StorageError>;
}

/// Row as it comes out of sqlite, before ids and categories are validated
struct RawRecord {
    id: String,
    title: String,
    artist: String,
    description: Option<String>,
    category: String,
    duration: f64,
    audio_file_id: String,
    cover_image_id: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            artist: row.get(2)?,
            description: row.get(3)?,
            category: row.get(4)?,
            duration: row.get(5)?,
            audio_file_id: row.get(6)?,
            cover_image_id: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<TrackRecord, StorageError> {
        let invalid = |reason: anyhow::Error| StorageError::InvalidRecord {
            id: self.id.clone(),
            reason: reason.to_string(),
        };
        let id = TrackId::parse(&self.id).map_err(invalid)?;
        let category = self.category.parse::<MusicCategory>().map_err(invalid)?;

        Ok(TrackRecord {
            id,
            title: self.title,
            artist: self.artist,
            description: self.description,
            category,
            duration: self.duration,
            audio_file_id: BlobId(self.audio_file_id),
            cover_image_id: self.cover_image_id.map(BlobId),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn select_columns() -> String {
    format!(
        "SELECT {ID}, {TITLE}, {ARTIST}, {DESCRIPTION}, {CATEGORY}, {DURATION}, \
         {AUDIO_FILE_ID}, {COVER_IMAGE_ID}, {CREATED_AT}, {UPDATED_AT} FROM {TRACKS}"
    )
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn put(&self, record: &TrackRecord) -> Result<(), StorageError> {
        self.with_conn(|db| {
            db.execute(
                &format!(
                    "INSERT OR REPLACE INTO {TRACKS} ({ID}, {TITLE}, {ARTIST}, {DESCRIPTION}, \
                     {CATEGORY}, {DURATION}, {AUDIO_FILE_ID}, {COVER_IMAGE_ID}, {CREATED_AT}, \
                     {UPDATED_AT}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    record.id.to_string(),
                    record.title,
                    record.artist,
                    record.description,
                    record.category.as_str(),
                    record.duration,
                    record.audio_file_id.as_str(),
                    record.cover_image_id.as_ref().map(BlobId::as_str),
                    record.created_at,
                    record.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    async fn get(&self, id: TrackId) -> Result<Option<TrackRecord>, StorageError> {
        let raw = self.with_conn(|db| {
            Ok(db
                .query_row(
                    &format!("{} WHERE {ID} = ?1", select_columns()),
                    params![id.to_string()],
                    RawRecord::from_row,
                )
                .optional()?)
        })?;

        raw.map(RawRecord::into_record).transpose()
    }

    async fn delete(&self, id: TrackId) -> Result<(), StorageError> {
        self.with_conn(|db| {
            db.execute(
                &format!("DELETE FROM {TRACKS} WHERE {ID} = ?1"),
                params![id.to_string()],
            )?;
            Ok(())
        })
    }

    async fn list_all(&self) -> Result<Vec<TrackRecord>, StorageError> {
        let raw = self.with_conn(|db| {
            let mut stmt = db.prepare(&select_columns())?;
            let rows = stmt
                .query_map([], RawRecord::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        raw.into_iter()
            .filter_map(|raw| match raw.into_record() {
                Ok(record) => Some(Ok(record)),
                Err(StorageError::InvalidRecord { id, reason }) => {
                    log::warn!("Table {TRACKS} contains invalid record {id}: {reason}, skipping");
                    None
                }
                Err(e) => Some(Err(e)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::params;

    use crate::{
        config::Database,
        domain::{BlobId, MusicCategory, TrackId, TrackRecord},
        storage::{
            SqliteStore,
            error::StorageError,
            records::RecordStore,
            schema::{self, *},
        },
    };

    fn mock_record(title: &str, created_at: i64) -> TrackRecord {
        let id = TrackId::generate();
        TrackRecord {
            id,
            title: title.to_string(),
            artist: "Artist".to_string(),
            description: Some("desc".to_string()),
            category: MusicCategory::Rock,
            duration: 3.0,
            audio_file_id: BlobId(format!("audio-{id}")),
            cover_image_id: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn test_put_then_get() -> anyhow::Result<()> {
        let store = SqliteStore::open(&Database::InMemory)?;
        let record = mock_record("Song", 100);

        store.put(&record).await?;

        assert_eq!(store.get(record.id).await?, Some(record));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_missing_is_none() -> anyhow::Result<()> {
        let store = SqliteStore::open(&Database::InMemory)?;
        assert_eq!(store.get(TrackId::generate()).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_put_replaces_existing() -> anyhow::Result<()> {
        let store = SqliteStore::open(&Database::InMemory)?;
        let mut record = mock_record("Song", 100);
        store.put(&record).await?;

        record.title = "Renamed".to_string();
        record.cover_image_id = Some(BlobId::from("cover-x"));
        record.updated_at = 200;
        store.put(&record).await?;

        let stored = store.get(record.id).await?.unwrap();
        assert_eq!(stored.title, "Renamed");
        assert_eq!(stored.cover_image_id, Some(BlobId::from("cover-x")));
        assert_eq!(store.list_all().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_and_delete_missing() -> anyhow::Result<()> {
        let store = SqliteStore::open(&Database::InMemory)?;
        let record = mock_record("Song", 100);
        store.put(&record).await?;

        store.delete(record.id).await?;
        assert_eq!(store.get(record.id).await?, None);

        // deleting again is fine
        store.delete(record.id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_list_all_returns_everything() -> anyhow::Result<()> {
        let store = SqliteStore::open(&Database::InMemory)?;
        let a = mock_record("A", 1);
        let b = mock_record("B", 2);
        store.put(&a).await?;
        store.put(&b).await?;

        let mut titles = store
            .list_all()
            .await?
            .into_iter()
            .map(|r| r.title)
            .collect::<Vec<_>>();
        titles.sort();

        assert_eq!(titles, vec!["A".to_string(), "B".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_rows_are_reported_or_skipped() -> anyhow::Result<()> {
        let conn = rusqlite::Connection::open_in_memory()?;
        schema::init(&conn)?;
        let good = mock_record("Good", 1);

        conn.execute(
            &format!(
                "INSERT INTO {TRACKS} ({ID}, {TITLE}, {ARTIST}, {CATEGORY}, {DURATION}, \
                 {AUDIO_FILE_ID}, {CREATED_AT}, {UPDATED_AT}) \
                 VALUES (?1, 'Bad', 'X', 'polka', 0, 'audio-bad', 1, 1)"
            ),
            params!["not-a-uuid"],
        )?;

        let store = SqliteStore::from_existing_conn(conn);
        store.put(&good).await?;

        // bulk listing skips what it cannot read
        let all = store.list_all().await?;
        assert_eq!(all, vec![good]);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_reports_invalid_category() -> anyhow::Result<()> {
        let conn = rusqlite::Connection::open_in_memory()?;
        schema::init(&conn)?;
        let id = TrackId::generate();

        conn.execute(
            &format!(
                "INSERT INTO {TRACKS} ({ID}, {TITLE}, {ARTIST}, {CATEGORY}, {DURATION}, \
                 {AUDIO_FILE_ID}, {CREATED_AT}, {UPDATED_AT}) \
                 VALUES (?1, 'Bad', 'X', 'polka', 0, 'audio-bad', 1, 1)"
            ),
            params![id.to_string()],
        )?;

        let store = SqliteStore::from_existing_conn(conn);
        let err = store.get(id).await.unwrap_err();

        assert!(matches!(err, StorageError::InvalidRecord { .. }));
        Ok(())
    }
}
