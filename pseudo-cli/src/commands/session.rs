//! Loading a project into memory and saving it back.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::debug;

use pseudo_core::{registry, FileStore, JobStore, ProjectId, ProjectSnapshot, SchemaStore};
use pseudo_schema::RefreshReport;

pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// One project's stores, restored from its snapshot with schemas loaded.
pub struct Session {
    pub home: PathBuf,
    pub project: ProjectId,
    pub files: Arc<FileStore>,
    pub schemas: Arc<SchemaStore>,
    pub jobs: Arc<JobStore>,
}

impl Session {
    pub fn open(project: &str) -> Result<Self> {
        let home = home_dir()?;
        let project = ProjectId::from(project);
        let snapshot = registry::load_snapshot_at(&home, &project).with_context(|| {
            format!("cannot load project '{project}'; run `pseudo init {project}` first")
        })?;

        let snapshot_time = snapshot.saved_at;
        let session = Self {
            home,
            project,
            files: Arc::new(FileStore::new()),
            schemas: Arc::new(SchemaStore::new()),
            jobs: Arc::new(JobStore::new()),
        };
        snapshot
            .restore_into(&session.files, &session.jobs)
            .context("failed to restore project snapshot")?;
        let report = session.refresh_schemas()?;
        debug!(
            project = %session.project,
            saved_at = %snapshot_time,
            schemas = report.loaded.len(),
            "project loaded"
        );
        Ok(session)
    }

    /// Reload schemas from the project's files. Rejected schema files are
    /// reported on stderr.
    pub fn refresh_schemas(&self) -> Result<RefreshReport> {
        let report = pseudo_schema::refresh(&self.files, &self.schemas, &self.project)
            .context("failed to load schemas")?;
        for (origin, err) in &report.rejected {
            eprintln!("{} {origin}: {err}", "✗ schema rejected".red());
        }
        Ok(report)
    }

    pub fn save(&self) -> Result<()> {
        let snapshot = ProjectSnapshot::capture(&self.project, &self.files, &self.jobs)
            .context("failed to capture project state")?;
        registry::save_snapshot_at(&self.home, &snapshot)
            .with_context(|| format!("failed to save project '{}'", self.project))?;
        debug!(
            project = %self.project,
            files = snapshot.files.len(),
            jobs = snapshot.jobs.len(),
            "project saved"
        );
        Ok(())
    }
}
