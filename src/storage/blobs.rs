//! Opaque byte store for the audio and cover artifacts of tracks

use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};

use crate::{
    domain::{BlobId, BlobKind, BlobRecord},
    storage::{
        SqliteStore,
        error::StorageError,
        schema::{columns::*, tables::*},
    },
};

/// Blob store contract, keyed by `(kind, id)`
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// stores the blob, replacing any blob with the same kind and id
    async fn put(&self, blob: BlobRecord) -> Result<(), StorageError>;
    async fn get(&self, kind: BlobKind, id: &BlobId) -> Result<Option<BlobRecord>, StorageError>;
    /// deleting a missing blob is not an error
    async fn delete(&self, kind: BlobKind, id: &BlobId) -> Result<(), StorageError>;
}

#[async_trait]
impl BlobStore for SqliteStore {
    async fn put(&self, blob: BlobRecord) -> Result<(), StorageError> {
        let size = i64::try_from(blob.size).map_err(|e| StorageError::InvalidRecord {
            id: blob.id.to_string(),
            reason: format!("blob size does not fit the store: {e}"),
        })?;

        self.with_conn(|db| {
            db.execute(
                &format!(
                    "INSERT OR REPLACE INTO {BLOBS} ({KIND}, {ID}, {NAME}, {SIZE}, {MIME_TYPE}, \
                     {DATA}, {CREATED_AT}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
                ),
                params![
                    blob.kind.as_str(),
                    blob.id.as_str(),
                    blob.name,
                    size,
                    blob.mime_type,
                    blob.data,
                    blob.created_at,
                ],
            )?;
            Ok(())
        })?;

        log::debug!("Stored {} blob {} ({} bytes)", blob.kind, blob.id, blob.size);
        Ok(())
    }

    async fn get(&self, kind: BlobKind, id: &BlobId) -> Result<Option<BlobRecord>, StorageError> {
        let row = self.with_conn(|db| {
            Ok(db
                .query_row(
                    &format!(
                        "SELECT {NAME}, {SIZE}, {MIME_TYPE}, {DATA}, {CREATED_AT} FROM {BLOBS} \
                         WHERE {KIND} = ?1 AND {ID} = ?2"
                    ),
                    params![kind.as_str(), id.as_str()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, Vec<u8>>(3)?,
                            row.get::<_, i64>(4)?,
                        ))
                    },
                )
                .optional()?)
        })?;

        let Some((name, size, mime_type, data, created_at)) = row else {
            return Ok(None);
        };

        let size = u64::try_from(size).map_err(|e| StorageError::InvalidRecord {
            id: id.to_string(),
            reason: format!("negative blob size: {e}"),
        })?;

        Ok(Some(BlobRecord {
            id: id.clone(),
            kind,
            name,
            size,
            mime_type,
            data,
            created_at,
        }))
    }

    async fn delete(&self, kind: BlobKind, id: &BlobId) -> Result<(), StorageError> {
        let removed = self.with_conn(|db| {
            Ok(db.execute(
                &format!("DELETE FROM {BLOBS} WHERE {KIND} = ?1 AND {ID} = ?2"),
                params![kind.as_str(), id.as_str()],
            )?)
        })?;

        if removed == 0 {
            log::debug!("Nothing to delete for {kind} blob {id}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::Database,
        domain::{BlobId, BlobKind, BlobUpload},
        storage::{SqliteStore, blobs::BlobStore},
    };

    #[tokio::test]
    async fn test_put_get_delete() -> anyhow::Result<()> {
        let store = SqliteStore::open(&Database::InMemory)?;
        let id = BlobId::from("audio-1");
        let blob = BlobUpload::new("song.mp3", vec![1, 2, 3]).into_record(
            BlobKind::Audio,
            id.clone(),
            10,
        );

        store.put(blob.clone()).await?;
        assert_eq!(store.get(BlobKind::Audio, &id).await?, Some(blob));

        store.delete(BlobKind::Audio, &id).await?;
        assert_eq!(store.get(BlobKind::Audio, &id).await?, None);

        // deleting again is fine
        store.delete(BlobKind::Audio, &id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_kinds_are_separate_namespaces() -> anyhow::Result<()> {
        let store = SqliteStore::open(&Database::InMemory)?;
        let id = BlobId::from("shared");

        store
            .put(BlobUpload::new("a.mp3", vec![1]).into_record(BlobKind::Audio, id.clone(), 1))
            .await?;

        assert!(store.get(BlobKind::Cover, &id).await?.is_none());

        store
            .put(BlobUpload::new("c.png", vec![2]).into_record(BlobKind::Cover, id.clone(), 1))
            .await?;
        store.delete(BlobKind::Audio, &id).await?;

        let cover = store.get(BlobKind::Cover, &id).await?.unwrap();
        assert_eq!(cover.data, vec![2]);
        assert_eq!(cover.mime_type, "image/png");
        Ok(())
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() -> anyhow::Result<()> {
        let store = SqliteStore::open(&Database::InMemory)?;
        let id = BlobId::from("cover-1");

        store
            .put(BlobUpload::new("old.png", vec![1]).into_record(BlobKind::Cover, id.clone(), 1))
            .await?;
        store
            .put(BlobUpload::new("new.jpg", vec![9, 9]).into_record(BlobKind::Cover, id.clone(), 2))
            .await?;

        let blob = store.get(BlobKind::Cover, &id).await?.unwrap();
        assert_eq!(blob.name, "new.jpg");
        assert_eq!(blob.size, 2);
        Ok(())
    }
}
