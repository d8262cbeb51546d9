use rusqlite::Connection;

pub mod tables {
    pub const TRACKS: &str = "tracks";
    pub const BLOBS: &str = "blobs";

    pub const ALL_TABLES: &[&str] = &[TRACKS, BLOBS];
}

pub mod columns {
    pub const ID: &str = "id";
    pub const TITLE: &str = "title";
    pub const ARTIST: &str = "artist";
    pub const DESCRIPTION: &str = "description";
    pub const CATEGORY: &str = "category";
    pub const DURATION: &str = "duration";
    pub const AUDIO_FILE_ID: &str = "audio_file_id";
    pub const COVER_IMAGE_ID: &str = "cover_image_id";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";

    pub const KIND: &str = "kind";
    pub const NAME: &str = "name";
    pub const SIZE: &str = "size";
    pub const MIME_TYPE: &str = "mime_type";
    pub const DATA: &str = "data";
}

pub use columns::*;
pub use tables::*;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tracks (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    artist TEXT NOT NULL,
    description TEXT,
    category TEXT NOT NULL,
    duration REAL NOT NULL,
    audio_file_id TEXT NOT NULL,
    cover_image_id TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS tracks_created_at ON tracks (created_at);

CREATE TABLE IF NOT EXISTS blobs (
    kind TEXT NOT NULL,
    id TEXT NOT NULL,
    name TEXT NOT NULL,
    size INTEGER NOT NULL,
    mime_type TEXT NOT NULL,
    data BLOB NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (kind, id)
);

CREATE INDEX IF NOT EXISTS blobs_kind ON blobs (kind);
"#;

pub fn init(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}
