//! Serialisable image of one project's stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::file_store::{FileStore, StoredFile};
use crate::job_store::JobStore;
use crate::types::{Job, ProjectId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub project: ProjectId,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub files: Vec<StoredFile>,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl ProjectSnapshot {
    pub fn empty(project: ProjectId) -> Self {
        Self {
            project,
            saved_at: Utc::now(),
            files: Vec::new(),
            jobs: Vec::new(),
        }
    }

    /// Copy the current rows of `project` out of the stores.
    pub fn capture(project: &ProjectId, files: &FileStore, jobs: &JobStore) -> Result<Self, StoreError> {
        Ok(Self {
            project: project.clone(),
            saved_at: Utc::now(),
            files: files.snapshot(project)?,
            jobs: jobs.snapshot(project)?,
        })
    }

    /// Load the rows into the stores, replacing whatever they held for this project.
    pub fn restore_into(self, files: &FileStore, jobs: &JobStore) -> Result<(), StoreError> {
        files.restore(&self.project, self.files)?;
        jobs.restore(&self.project, self.jobs)?;
        Ok(())
    }
}
