//! Domain types for pseudo-code projects.
//!
//! Rows mirror the logical persisted shapes: file nodes, contents, schemas,
//! schema settings and jobs. Everything is serde-serializable so a project can
//! be snapshotted to disk.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed project identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Row id of a [`FileNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Auto-assigned id of a [`Job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// What a file's content represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Bullet,
    Raw,
    Schema,
    #[default]
    None,
}

impl ContentKind {
    /// Infer the kind from a file name: `*.schema.yaml` is a schema,
    /// `*.pseudo` a bullet file, anything else raw code.
    pub fn for_name(name: &str) -> Self {
        if name.ends_with(path::SCHEMA_SUFFIX) {
            ContentKind::Schema
        } else if path::is_bullet_name(name) {
            ContentKind::Bullet
        } else {
            ContentKind::Raw
        }
    }
}

/// A node in a project's hierarchical file store.
///
/// `(project, path, name)` is unique. `path` is the parent folder (`/` for
/// top-level nodes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub id: FileId,
    pub project: ProjectId,
    pub path: String,
    pub name: String,
    pub is_file: bool,
    pub size_bytes: u64,
    #[serde(default)]
    pub content_hash: Option<String>,
    /// Content hash of the counterpart at the time the pair was last reconciled.
    #[serde(default)]
    pub sync_hash: Option<String>,
    #[serde(default)]
    pub to_delete: bool,
}

impl FileNode {
    pub fn full_path(&self) -> String {
        path::join(&self.path, &self.name)
    }

    pub fn is_bullet(&self) -> bool {
        self.is_file && path::is_bullet_name(&self.name)
    }

    /// Bullet name without its pseudo-file suffix; the raw sibling's name.
    pub fn stem(&self) -> Option<&str> {
        path::raw_name(&self.name)
    }
}

/// Body text owned 1:1 by a [`FileNode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub file_id: FileId,
    pub body: String,
    pub kind: ContentKind,
}

// ---------------------------------------------------------------------------
// Schemas
// ---------------------------------------------------------------------------

/// Role of a schema section when building model messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    System,
    User,
    Comment,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSection {
    pub kind: SectionKind,
    pub template: String,
    /// Simple placeholder keys in first-seen order, without duplicates.
    #[serde(default)]
    pub referenced_keys: Vec<String>,
}

/// A named prompt template made of ordered sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub sections: Vec<SchemaSection>,
}

/// How a job against a schema is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    #[default]
    Single,
    PerFile,
    SyncBullets,
    SyncRaw,
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingMode::Single => write!(f, "single"),
            ProcessingMode::PerFile => write!(f, "per_file"),
            ProcessingMode::SyncBullets => write!(f, "sync_bullets"),
            ProcessingMode::SyncRaw => write!(f, "sync_raw"),
        }
    }
}

/// Per-project dispatch settings of one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSettings {
    pub schema_name: String,
    pub project: ProjectId,
    pub processing_mode: ProcessingMode,
    pub is_agent: bool,
    pub multi_files_output: bool,
    pub override_files: bool,
    pub input_extension: Option<String>,
    pub purpose: String,
    pub visible_to_agent: bool,
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// Lifecycle status of a [`Job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Draft; not yet queued.
    #[default]
    Prompting,
    Submitted,
    Processing,
    Responded,
    Error,
    /// Re-submission of a finished job; claimable like `Submitted`.
    ReApplying,
}

impl JobStatus {
    pub fn is_claimable(self) -> bool {
        matches!(self, JobStatus::Submitted | JobStatus::ReApplying)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Responded | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Prompting => write!(f, "prompting"),
            JobStatus::Submitted => write!(f, "submitted"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Responded => write!(f, "responded"),
            JobStatus::Error => write!(f, "error"),
            JobStatus::ReApplying => write!(f, "re_applying"),
        }
    }
}

/// Everything needed to create a job; the store assigns id, status and
/// timestamps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobSpec {
    pub project: ProjectId,
    pub schema_name: String,
    pub prompt: String,
    pub path: String,
    pub target_file_name: Option<String>,
    pub context_file_ids: Vec<FileId>,
    pub sync_bullet_file_ids: Vec<FileId>,
    pub sync_raw_file_ids: Vec<Option<FileId>>,
    pub model_ref: Option<String>,
    pub is_native_code: bool,
}

impl JobSpec {
    pub fn new(project: ProjectId, schema_name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            project,
            schema_name: schema_name.into(),
            prompt: prompt.into(),
            path: path::ROOT.to_string(),
            ..Self::default()
        }
    }
}

/// One queued unit of AI work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub project: ProjectId,
    pub schema_name: String,
    pub prompt: String,
    pub status: JobStatus,
    pub path: String,
    #[serde(default)]
    pub target_file_name: Option<String>,
    #[serde(default)]
    pub context_file_ids: Vec<FileId>,
    #[serde(default)]
    pub sync_bullet_file_ids: Vec<FileId>,
    /// Parallel to `sync_bullet_file_ids`; `None` when no raw sibling exists yet.
    #[serde(default)]
    pub sync_raw_file_ids: Vec<Option<FileId>>,
    #[serde(default)]
    pub model_ref: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// `0.0..=1.0`, or `None` while indeterminate.
    #[serde(default)]
    pub progress: Option<f32>,
    #[serde(default)]
    pub is_native_code: bool,
    /// Raw model replies, oldest first.
    #[serde(default)]
    pub responses: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Job {
    pub(crate) fn from_spec(id: JobId, spec: JobSpec, status: JobStatus) -> Self {
        let now = Utc::now();
        Self {
            id,
            project: spec.project,
            schema_name: spec.schema_name,
            prompt: spec.prompt,
            status,
            path: path::normalize(&spec.path),
            target_file_name: spec.target_file_name,
            context_file_ids: spec.context_file_ids,
            sync_bullet_file_ids: spec.sync_bullet_file_ids,
            sync_raw_file_ids: spec.sync_raw_file_ids,
            model_ref: spec.model_ref,
            error_message: None,
            progress: None,
            is_native_code: spec.is_native_code,
            responses: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    pub fn last_response(&self) -> Option<&str> {
        self.responses.last().map(String::as_str)
    }

    /// Full path of the target file, if the job names one.
    pub fn target_path(&self) -> Option<String> {
        self.target_file_name
            .as_deref()
            .map(|name| path::join(&self.path, name))
    }
}

// ---------------------------------------------------------------------------
// Model messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

/// One message sent to the external model capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
