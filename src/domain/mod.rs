pub mod blob;
pub mod id;
pub mod track;

pub use blob::{BlobKind, BlobRecord, BlobUpload};
pub use id::{BlobId, TrackId};
pub use track::{MusicCategory, Track, TrackForm, TrackRecord, TrackUpdate};
