use std::fmt::Display;

use super::id::BlobId;

/// Kind of binary artifact a track owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobKind {
    Audio,
    Cover,
}

impl BlobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobKind::Audio => "audio",
            BlobKind::Cover => "cover",
        }
    }
}

impl Display for BlobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted binary artifact
#[derive(Debug, Clone, PartialEq)]
pub struct BlobRecord {
    pub id: BlobId,
    pub kind: BlobKind,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub data: Vec<u8>,
    /// milliseconds since unix epoch
    pub created_at: i64,
}

/// Binary payload supplied by a caller, before it gets an id
#[derive(Debug, Clone)]
pub struct BlobUpload {
    pub name: String,
    pub mime_type: Option<String>,
    pub data: Vec<u8>,
}

impl BlobUpload {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            data,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// explicit mime type if given, otherwise guessed from the file name
    pub fn resolved_mime_type(&self) -> String {
        match &self.mime_type {
            Some(mime) if !mime.trim().is_empty() => mime.trim().to_lowercase(),
            _ => mime_guess::from_path(&self.name)
                .first_or_octet_stream()
                .to_string(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.resolved_mime_type().starts_with("image/")
    }

    pub fn into_record(self, kind: BlobKind, id: BlobId, created_at: i64) -> BlobRecord {
        let mime_type = self.resolved_mime_type();
        BlobRecord {
            id,
            kind,
            size: self.data.len() as u64,
            name: self.name,
            mime_type,
            data: self.data,
            created_at,
        }
    }
}
