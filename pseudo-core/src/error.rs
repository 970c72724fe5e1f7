//! Error types for pseudo-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{FileId, JobId, JobStatus};

/// All errors that can arise from store and on-disk registry operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (config save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error (snapshot save path).
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Snapshot parse error on load, with the offending file.
    #[error("failed to parse snapshot {path}: {source}")]
    SnapshotParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// `dirs::home_dir()` returned `None`, so `~/.pseudo/` cannot be located.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The project directory does not exist under `~/.pseudo/projects/`.
    #[error("project not found at {path}")]
    ProjectNotFound { path: PathBuf },

    #[error("invalid path '{0}'")]
    InvalidPath(String),

    #[error("file {0} not found")]
    FileNotFound(String),

    #[error("no file with id {0}")]
    UnknownFile(FileId),

    #[error("{path} already exists")]
    AlreadyExists { path: String },

    #[error("{path} is a folder, not a file")]
    NotAFile { path: String },

    #[error("job {0} not found")]
    JobNotFound(JobId),

    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    /// A store mutex was poisoned by a panicking writer.
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
