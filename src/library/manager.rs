use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;

use crate::{
    config::Config,
    domain::{
        BlobId, BlobKind, BlobRecord, BlobUpload, Track, TrackForm, TrackId, TrackRecord,
        TrackUpdate, track::normalize_description,
    },
    library::{
        error::LibraryError,
        locator::{BlobUrl, BlobUrls},
    },
    probe::{DurationProber, SymphoniaProber},
    storage::{BlobStore, RecordStore, SqliteStore, db::now_millis, error::StorageError},
};

/// Owns the write path to the record and blob stores and keeps a track's
/// record, audio blob and cover blob consistent with each other.
///
/// Multi-step operations are not atomic. Primary steps (the audio write on
/// create, new blob writes and the record write on update, the record
/// lookup on update and delete) abort the operation. Secondary steps
/// (cover write on create, removal of replaced or abandoned blobs) are
/// best effort: their failures are logged and swallowed, which may leave
/// orphaned blobs behind.
pub struct LibraryManager {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    prober: Arc<dyn DurationProber>,
    urls: BlobUrls,
    cleanup: TaskTracker,
    settling: Mutex<()>,
}

impl LibraryManager {
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        prober: Arc<dyn DurationProber>,
    ) -> Self {
        Self {
            records,
            blobs,
            prober,
            urls: BlobUrls::default(),
            cleanup: TaskTracker::new(),
            settling: Mutex::new(()),
        }
    }

    /// sqlite store for both records and blobs, symphonia for durations
    pub fn from_config(config: &Config) -> Result<Self, StorageError> {
        let store = SqliteStore::open(&config.database)?;
        info!("Opened track library, database: {:?}", config.database);
        Ok(Self::new(
            Arc::new(store.clone()),
            Arc::new(store),
            Arc::new(SymphoniaProber),
        ))
    }

    pub async fn create_track(&self, form: TrackForm) -> Result<Track, LibraryError> {
        let id = TrackId::generate();
        let now = now_millis();
        let TrackForm {
            title,
            artist,
            category,
            description,
            audio,
            cover,
        } = form;

        let audio_id = BlobId::initial(BlobKind::Audio, id);
        let (audio_name, audio_data) = (audio.name.clone(), audio.data.clone());
        self.blobs
            .put(audio.into_record(BlobKind::Audio, audio_id.clone(), now))
            .await
            .map_err(LibraryError::write(format!("audio blob {audio_id}")))?;

        let duration = self.probe_duration(audio_data, audio_name).await;

        let cover_image_id = match cover {
            Some(cover) => self.store_initial_cover(id, cover, now).await,
            None => None,
        };

        let record = TrackRecord {
            id,
            title: title.trim().to_string(),
            artist: artist.trim().to_string(),
            description: normalize_description(description),
            category,
            duration,
            audio_file_id: audio_id,
            cover_image_id,
            created_at: now,
            updated_at: now,
        };

        if let Err(source) = self.records.put(&record).await {
            self.discard_in_background(BlobKind::Audio, record.audio_file_id.clone());
            if let Some(cover_id) = record.cover_image_id.clone() {
                self.discard_in_background(BlobKind::Cover, cover_id);
            }
            return Err(LibraryError::write(format!("track record {id}"))(source));
        }

        info!(
            "Created track {id} '{} - {}' ({:.1}s)",
            record.artist, record.title, record.duration
        );
        hydrate(&record)
    }

    /// cover failures never abort track creation
    async fn store_initial_cover(&self, id: TrackId, cover: BlobUpload, now: i64) -> Option<BlobId> {
        if !cover.is_image() {
            warn!(
                "Ignoring cover '{}' for track {id}: {} is not an image",
                cover.name,
                cover.resolved_mime_type()
            );
            return None;
        }

        let cover_id = BlobId::initial(BlobKind::Cover, id);
        match self
            .blobs
            .put(cover.into_record(BlobKind::Cover, cover_id.clone(), now))
            .await
        {
            Ok(()) => Some(cover_id),
            Err(e) => {
                warn!("Failed to store cover for track {id}, continuing without it: {e}");
                None
            }
        }
    }

    pub async fn update_track(
        &self,
        id: TrackId,
        update: TrackUpdate,
    ) -> Result<Track, LibraryError> {
        let existing = self.load_record(id).await?;
        let now = now_millis();
        let TrackUpdate {
            title,
            artist,
            description,
            category,
            audio,
            cover,
        } = update;

        if let Some(cover) = &cover {
            if !cover.is_image() {
                return Err(LibraryError::InvalidInput(format!(
                    "cover '{}' is {}, not an image",
                    cover.name,
                    cover.resolved_mime_type()
                )));
            }
        }

        let mut record = existing.clone();
        if let Some(title) = title {
            record.title = title.trim().to_string();
        }
        if let Some(artist) = artist {
            record.artist = artist.trim().to_string();
        }
        if description.is_some() {
            record.description = normalize_description(description);
        }
        if let Some(category) = category {
            record.category = category;
        }

        // blobs written by this update, and blobs they supersede
        let mut written: Vec<(BlobKind, BlobId)> = Vec::new();
        let mut replaced: Vec<(BlobKind, BlobId)> = Vec::new();

        if let Some(audio) = audio {
            let audio_id =
                BlobId::replacing(BlobKind::Audio, id, now, Some(&existing.audio_file_id));
            let (audio_name, audio_data) = (audio.name.clone(), audio.data.clone());
            self.blobs
                .put(audio.into_record(BlobKind::Audio, audio_id.clone(), now))
                .await
                .map_err(LibraryError::write(format!("audio blob {audio_id}")))?;

            written.push((BlobKind::Audio, audio_id.clone()));
            replaced.push((BlobKind::Audio, existing.audio_file_id.clone()));
            record.duration = self.probe_duration(audio_data, audio_name).await;
            record.audio_file_id = audio_id;
        }

        if let Some(cover) = cover {
            let cover_id = BlobId::replacing(
                BlobKind::Cover,
                id,
                now,
                existing.cover_image_id.as_ref(),
            );
            if let Err(source) = self
                .blobs
                .put(cover.into_record(BlobKind::Cover, cover_id.clone(), now))
                .await
            {
                self.discard_unreferenced(written, &existing);
                return Err(LibraryError::write(format!("cover blob {cover_id}"))(source));
            }

            written.push((BlobKind::Cover, cover_id.clone()));
            if let Some(old) = existing.cover_image_id.clone() {
                replaced.push((BlobKind::Cover, old));
            }
            record.cover_image_id = Some(cover_id);
        }

        record.updated_at = now;

        // old blobs are dropped only once the record no longer points at them
        if let Err(source) = self.records.put(&record).await {
            self.discard_unreferenced(written, &existing);
            return Err(LibraryError::write(format!("track record {id}"))(source));
        }
        self.discard_unreferenced(replaced, &record);

        info!("Updated track {id}");
        hydrate(&record)
    }

    pub async fn delete_track(&self, id: TrackId) -> Result<(), LibraryError> {
        let record = self.load_record(id).await?;

        let (audio, stored, cover) = tokio::join!(
            self.blobs.delete(BlobKind::Audio, &record.audio_file_id),
            self.records.delete(id),
            async {
                match &record.cover_image_id {
                    Some(cover_id) => self.blobs.delete(BlobKind::Cover, cover_id).await,
                    None => Ok(()),
                }
            },
        );

        let mut failures = [
            audio.map_err(LibraryError::delete(format!("audio blob {}", record.audio_file_id))),
            stored.map_err(LibraryError::delete(format!("track record {id}"))),
            cover.map_err(LibraryError::delete(format!("cover blob of track {id}"))),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect::<Vec<_>>();

        if failures.is_empty() {
            info!("Deleted track {id}");
            return Ok(());
        }

        for failure in &failures {
            error!("Deleting track {id}: {failure}");
        }
        Err(failures.remove(0))
    }

    pub async fn get_track(&self, id: TrackId) -> Result<Option<Track>, LibraryError> {
        self.records
            .get(id)
            .await
            .map_err(LibraryError::read(format!("track record {id}")))?
            .as_ref()
            .map(hydrate)
            .transpose()
    }

    /// all tracks, newest first
    pub async fn list_tracks(&self) -> Result<Vec<Track>, LibraryError> {
        let mut records = self
            .records
            .list_all()
            .await
            .map_err(LibraryError::read("track records"))?;

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.iter().map(hydrate).collect()
    }

    /// pins the audio bytes, the locator must be revoked with [`Self::revoke_url`]
    pub async fn resolve_audio_url(&self, audio_file_id: &BlobId) -> Option<BlobUrl> {
        self.resolve_url(BlobKind::Audio, audio_file_id).await
    }

    /// pins the cover bytes, the locator must be revoked with [`Self::revoke_url`]
    pub async fn resolve_cover_url(&self, cover_image_id: &BlobId) -> Option<BlobUrl> {
        self.resolve_url(BlobKind::Cover, cover_image_id).await
    }

    async fn resolve_url(&self, kind: BlobKind, id: &BlobId) -> Option<BlobUrl> {
        match self.blobs.get(kind, id).await {
            Ok(Some(blob)) => {
                let url = self.urls.pin(blob);
                debug!("Pinned {kind} blob {id} as {url}");
                Some(url)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read {kind} blob {id}: {e}");
                None
            }
        }
    }

    pub fn open_url(&self, url: &BlobUrl) -> Option<Arc<BlobRecord>> {
        self.urls.open(url)
    }

    pub fn revoke_url(&self, url: &BlobUrl) -> bool {
        self.urls.revoke(url)
    }

    /// number of locators not yet revoked
    pub fn pinned_urls(&self) -> usize {
        self.urls.len()
    }

    /// Waits until every best-effort cleanup spawned so far has finished.
    ///
    /// Operations never wait for their own cleanups; this is for shutdown.
    /// Concurrent callers settle one after another.
    pub async fn settle_cleanup(&self) {
        let _turn = self.settling.lock().await;
        self.cleanup.close();
        self.cleanup.wait().await;
        self.cleanup.reopen();
    }

    async fn load_record(&self, id: TrackId) -> Result<TrackRecord, LibraryError> {
        self.records
            .get(id)
            .await
            .map_err(LibraryError::read(format!("track record {id}")))?
            .ok_or(LibraryError::NotFound(id))
    }

    async fn probe_duration(&self, data: Vec<u8>, name: String) -> f64 {
        let prober = Arc::clone(&self.prober);
        tokio::task::spawn_blocking(move || prober.probe(&data, Some(name.as_str())))
            .await
            .unwrap_or_else(|e| {
                warn!("Duration probe did not complete: {e}, using 0");
                0.0
            })
    }

    /// removes blobs in the background, skipping those `record` still points at
    fn discard_unreferenced(&self, blobs: Vec<(BlobKind, BlobId)>, record: &TrackRecord) {
        for (kind, id) in blobs {
            let referenced = match kind {
                BlobKind::Audio => record.audio_file_id == id,
                BlobKind::Cover => record.cover_image_id.as_ref() == Some(&id),
            };
            if !referenced {
                self.discard_in_background(kind, id);
            }
        }
    }

    fn discard_in_background(&self, kind: BlobKind, id: BlobId) {
        let blobs = Arc::clone(&self.blobs);
        self.cleanup.spawn(async move {
            match blobs.delete(kind, &id).await {
                Ok(()) => debug!("Removed stale {kind} blob {id}"),
                Err(e) => warn!("Failed to remove stale {kind} blob {id}, leaving it orphaned: {e}"),
            }
        });
    }
}

fn hydrate(record: &TrackRecord) -> Result<Track, LibraryError> {
    record
        .hydrate()
        .map_err(|e| LibraryError::read(format!("track record {}", record.id))(e.into()))
}
