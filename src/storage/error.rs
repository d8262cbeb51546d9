use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("stored record {id} is invalid: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("database connection lock poisoned")]
    Poisoned,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
