use std::fmt::Display;

use thiserror::Error;

use crate::{domain::TrackId, storage::error::StorageError};

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("track {0} not found")]
    NotFound(TrackId),

    #[error("failed to {what}: {source}")]
    WriteFailure {
        what: String,
        #[source]
        source: StorageError,
    },

    #[error("failed to {what}: {source}")]
    ReadFailure {
        what: String,
        #[source]
        source: StorageError,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl LibraryError {
    pub(crate) fn write(what: impl Display) -> impl FnOnce(StorageError) -> Self {
        let what = format!("write {what}");
        move |source| LibraryError::WriteFailure { what, source }
    }

    pub(crate) fn delete(what: impl Display) -> impl FnOnce(StorageError) -> Self {
        let what = format!("delete {what}");
        move |source| LibraryError::WriteFailure { what, source }
    }

    pub(crate) fn read(what: impl Display) -> impl FnOnce(StorageError) -> Self {
        let what = format!("read {what}");
        move |source| LibraryError::ReadFailure { what, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LibraryError::NotFound(_))
    }
}
