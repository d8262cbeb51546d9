//! Personal library of audio tracks.
//!
//! A track is a metadata record plus an audio blob and an optional cover
//! blob. [`LibraryManager`] owns the multi-step operations that keep the
//! three consistent, [`LibraryProjection`] mirrors the library for
//! observers.

pub mod config;
pub mod domain;
pub mod library;
pub mod probe;
pub mod projection;
pub mod storage;

pub use config::Config;
pub use library::{BlobUrl, LibraryError, LibraryManager};
pub use projection::{LibraryProjection, LibrarySnapshot, OperationState};
