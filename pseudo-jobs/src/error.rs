use thiserror::Error;

use pseudo_core::StoreError;
use pseudo_schema::SchemaError;
use pseudo_sync::SyncError;

/// Failure of the external model capability.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The model could not be reached (spawn, pipe or transport failure).
    #[error("network error: {0}")]
    Network(String),

    /// The model answered with a failure.
    #[error("provider error: {0}")]
    Provider(String),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("no model configured under '{0}'")]
    UnknownModel(String),
}

/// Error surface of job processing. The display text is what ends up in a
/// failed job's `error_message`.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("No model selected")]
    NoModel,

    #[error("schema '{0}' not found")]
    MissingSchema(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// A file the job depends on is missing or unusable.
    #[error("{0}")]
    Consistency(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("template error: {0}")]
    Template(#[from] SchemaError),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("worker task failed: {0}")]
    Join(String),
}
