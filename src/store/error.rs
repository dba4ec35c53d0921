use std::io;

use thiserror::Error;

use crate::codec::WireError;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found in store")]
    NotFound,
    #[error("found zero-length resource in store")]
    FoundEmpty,
    #[error("resource is being written (private marker present)")]
    WriteInProgress,
    #[error("resource already stored")]
    AlreadyStored,
    #[error("malformed stored record: {0}")]
    Malformed(#[from] WireError),
    #[error("upstream transport error: {0}")]
    Transport(String),
    #[error("store I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound => "not_found",
            StoreError::FoundEmpty => "found_empty",
            StoreError::WriteInProgress => "write_in_progress",
            StoreError::AlreadyStored => "already_stored",
            StoreError::Malformed(_) => "malformed",
            StoreError::Transport(_) => "transport",
            StoreError::Io(_) => "io",
        }
    }

    /// Whether a caching caller should treat this as a miss and go upstream.
    pub fn is_miss(&self) -> bool {
        matches!(self, StoreError::NotFound | StoreError::FoundEmpty)
    }

    pub(crate) fn from_open(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound
        } else {
            StoreError::Io(err)
        }
    }
}
