use std::fmt::Display;

use anyhow::Context;
use uuid::Uuid;

use crate::domain::blob::BlobKind;

/// Represents the track ID.
///
/// Generated once when the track is created and never changes afterwards.
/// Blob ids owned by the track are derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(pub Uuid);

impl TrackId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let uuid = Uuid::parse_str(s).with_context(|| format!("invalid track id '{s}'"))?;
        Ok(Self(uuid))
    }
}

impl Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Key of a blob inside the blob store, scoped to the owning track
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobId(pub String);

impl BlobId {
    /// id of the blob written when the track is created
    pub fn initial(kind: BlobKind, track: TrackId) -> Self {
        Self(format!("{}-{track}", kind.as_str()))
    }

    /// id of a blob replacing an earlier one, qualified by the write time
    pub fn replacement(kind: BlobKind, track: TrackId, millis: i64) -> Self {
        Self(format!("{}-{track}-{millis}", kind.as_str()))
    }

    /// Replacement id that never equals `current`.
    ///
    /// Two replacements within the same millisecond would otherwise share an
    /// id and the second write would overwrite the blob the record points at.
    pub fn replacing(
        kind: BlobKind,
        track: TrackId,
        millis: i64,
        current: Option<&BlobId>,
    ) -> Self {
        let mut millis = millis;
        loop {
            let id = Self::replacement(kind, track, millis);
            if current != Some(&id) {
                return id;
            }
            millis += 1;
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BlobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_id_roundtrips_through_display() -> anyhow::Result<()> {
        let id = TrackId::generate();
        assert_eq!(TrackId::parse(&id.to_string())?, id);
        Ok(())
    }

    #[test]
    fn track_id_rejects_garbage() {
        assert!(TrackId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn blob_ids_are_scoped_to_the_track() {
        let track = TrackId::parse("6f1c2b1e-8c1a-4c5e-9d0e-1b2c3d4e5f60").unwrap();

        assert_eq!(
            BlobId::initial(BlobKind::Audio, track).as_str(),
            "audio-6f1c2b1e-8c1a-4c5e-9d0e-1b2c3d4e5f60"
        );
        assert_eq!(
            BlobId::replacement(BlobKind::Cover, track, 1700000000123).as_str(),
            "cover-6f1c2b1e-8c1a-4c5e-9d0e-1b2c3d4e5f60-1700000000123"
        );
    }

    #[test]
    fn replacing_skips_the_id_it_replaces() {
        let track = TrackId::generate();
        let current = BlobId::replacement(BlobKind::Audio, track, 42);

        let next = BlobId::replacing(BlobKind::Audio, track, 42, Some(&current));
        assert_ne!(next, current);
        assert_eq!(next, BlobId::replacement(BlobKind::Audio, track, 43));

        let initial = BlobId::initial(BlobKind::Audio, track);
        assert_eq!(
            BlobId::replacing(BlobKind::Audio, track, 42, Some(&initial)),
            current
        );
        assert_eq!(
            BlobId::replacing(BlobKind::Cover, track, 7, None).as_str(),
            format!("cover-{track}-7")
        );
    }
}
