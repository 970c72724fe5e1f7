//! Error types for pseudo-sync.

use std::path::PathBuf;

use thiserror::Error;

use pseudo_core::{FileId, StoreError};

/// All errors that can arise from sync, import and export operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the in-memory stores.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema '{0}' not found")]
    UnknownSchema(String),

    #[error("schema '{0}' is not a sync schema")]
    NotASyncSchema(String),

    /// A pair member vanished between planning and applying.
    #[error("sync counterpart {0} no longer exists")]
    MissingCounterpart(FileId),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
