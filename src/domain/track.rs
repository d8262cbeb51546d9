use std::{fmt::Display, str::FromStr};

use anyhow::anyhow;
use chrono::{DateTime, Utc};

use super::{
    blob::BlobUpload,
    id::{BlobId, TrackId},
};
use crate::storage::db::millis_to_utc;

/// Closed set of genres a track can be filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MusicCategory {
    Rock,
    Pop,
    Jazz,
    Classical,
    Electronic,
    HipHop,
    Country,
    Blues,
    Metal,
    Folk,
    Ambient,
    Other,
}

impl MusicCategory {
    pub const ALL: &'static [MusicCategory] = &[
        MusicCategory::Rock,
        MusicCategory::Pop,
        MusicCategory::Jazz,
        MusicCategory::Classical,
        MusicCategory::Electronic,
        MusicCategory::HipHop,
        MusicCategory::Country,
        MusicCategory::Blues,
        MusicCategory::Metal,
        MusicCategory::Folk,
        MusicCategory::Ambient,
        MusicCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MusicCategory::Rock => "rock",
            MusicCategory::Pop => "pop",
            MusicCategory::Jazz => "jazz",
            MusicCategory::Classical => "classical",
            MusicCategory::Electronic => "electronic",
            MusicCategory::HipHop => "hiphop",
            MusicCategory::Country => "country",
            MusicCategory::Blues => "blues",
            MusicCategory::Metal => "metal",
            MusicCategory::Folk => "folk",
            MusicCategory::Ambient => "ambient",
            MusicCategory::Other => "other",
        }
    }
}

impl Display for MusicCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MusicCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_', ' '], "");
        Self::ALL
            .iter()
            .find(|c| c.as_str() == normalized)
            .copied()
            .ok_or_else(|| anyhow!("unknown music category '{s}'"))
    }
}

/// Track metadata as it is persisted in the record store
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRecord {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub description: Option<String>,
    pub category: MusicCategory,
    /// seconds, derived from the stored audio
    pub duration: f64,
    pub audio_file_id: BlobId,
    pub cover_image_id: Option<BlobId>,
    /// milliseconds since unix epoch
    pub created_at: i64,
    /// milliseconds since unix epoch
    pub updated_at: i64,
}

/// Represent a music track as handed out to consumers
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub description: Option<String>,
    pub category: MusicCategory,
    pub duration: f64,
    pub audio_file_id: BlobId,
    pub cover_image_id: Option<BlobId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackRecord {
    pub fn hydrate(&self) -> anyhow::Result<Track> {
        Ok(Track {
            id: self.id,
            title: self.title.clone(),
            artist: self.artist.clone(),
            description: self.description.clone(),
            category: self.category,
            duration: self.duration,
            audio_file_id: self.audio_file_id.clone(),
            cover_image_id: self.cover_image_id.clone(),
            created_at: millis_to_utc(self.created_at)?,
            updated_at: millis_to_utc(self.updated_at)?,
        })
    }
}

/// Input for creating a track
#[derive(Debug, Clone)]
pub struct TrackForm {
    pub title: String,
    pub artist: String,
    pub category: MusicCategory,
    pub description: Option<String>,
    pub audio: BlobUpload,
    pub cover: Option<BlobUpload>,
}

impl TrackForm {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        category: MusicCategory,
        audio: BlobUpload,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            category,
            description: None,
            audio,
            cover: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_cover(mut self, cover: BlobUpload) -> Self {
        self.cover = Some(cover);
        self
    }
}

/// Partial update of a track. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TrackUpdate {
    pub title: Option<String>,
    pub artist: Option<String>,
    /// an empty (after trimming) description clears it
    pub description: Option<String>,
    pub category: Option<MusicCategory>,
    pub audio: Option<BlobUpload>,
    pub cover: Option<BlobUpload>,
}

impl TrackUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.audio.is_none()
            && self.cover.is_none()
    }
}

/// trims text fields, turning a blank description into none
pub(crate) fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_loosely() -> anyhow::Result<()> {
        assert_eq!("Rock".parse::<MusicCategory>()?, MusicCategory::Rock);
        assert_eq!("hip-hop".parse::<MusicCategory>()?, MusicCategory::HipHop);
        assert_eq!(" Electronic ".parse::<MusicCategory>()?, MusicCategory::Electronic);
        assert!("polka".parse::<MusicCategory>().is_err());
        Ok(())
    }

    #[test]
    fn every_category_roundtrips_through_its_name() {
        for category in MusicCategory::ALL {
            assert_eq!(category.as_str().parse::<MusicCategory>().unwrap(), *category);
        }
    }

    #[test]
    fn blank_description_is_dropped() {
        assert_eq!(normalize_description(Some("   ".into())), None);
        assert_eq!(
            normalize_description(Some(" live take ".into())),
            Some("live take".to_string())
        );
        assert_eq!(normalize_description(None), None);
    }

    #[test]
    fn hydrate_converts_timestamps() -> anyhow::Result<()> {
        let record = TrackRecord {
            id: TrackId::generate(),
            title: "Song".into(),
            artist: "Band".into(),
            description: None,
            category: MusicCategory::Jazz,
            duration: 1.5,
            audio_file_id: BlobId::from("audio-x"),
            cover_image_id: None,
            created_at: 1_000,
            updated_at: 2_500,
        };

        let track = record.hydrate()?;
        assert_eq!(track.created_at.timestamp_millis(), 1_000);
        assert_eq!(track.updated_at.timestamp_millis(), 2_500);
        assert_eq!(track.title, "Song");
        Ok(())
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(TrackUpdate::default().is_empty());
        let update = TrackUpdate {
            category: Some(MusicCategory::Pop),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
