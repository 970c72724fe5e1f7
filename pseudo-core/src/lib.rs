//! pseudo core library: domain types, in-memory stores, on-disk persistence.
//!
//! - [`types`]: newtypes and persisted row shapes
//! - [`path`] / [`hash`]: store path and content-hash helpers
//! - [`file_store`], [`schema_store`], [`job_store`]: thread-safe stores
//! - [`registry`], [`config`], [`snapshot`]: `~/.pseudo/` layout
//! - [`error`]: [`StoreError`]

pub mod config;
pub mod error;
pub mod file_store;
pub mod hash;
pub mod job_store;
pub mod path;
pub mod registry;
pub mod schema_store;
pub mod snapshot;
pub mod types;

pub use config::{Config, ModelCommand};
pub use error::StoreError;
pub use file_store::{FileStore, StoredFile};
pub use hash::content_hash;
pub use job_store::JobStore;
pub use schema_store::SchemaStore;
pub use snapshot::ProjectSnapshot;
pub use types::{
    ChatMessage, ChatRole, Content, ContentKind, FileId, FileNode, Job, JobId, JobSpec, JobStatus,
    ProcessingMode, ProjectId, Schema, SchemaSection, SchemaSettings, SectionKind,
};
