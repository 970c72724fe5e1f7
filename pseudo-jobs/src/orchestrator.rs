//! Claiming jobs and dispatching them by schema settings.
//!
//! [`Orchestrator::process_job`] is the single entry point. A job is only
//! worked on after [`JobStore::try_claim`] moved it to `Processing`; losing
//! that race is not an error. Every failure after the claim is recorded on
//! the job as a terminal `Error` and never retried here.

use std::sync::Arc;

use tracing::{debug, info, warn};

use pseudo_core::{
    ChatMessage, FileStore, Job, JobId, JobStatus, JobStore, ProcessingMode, ProjectId, Schema,
    SchemaSettings, SchemaStore,
};
use pseudo_schema::{ContextFile, TemplateValues, SCHEMA_EDITOR};
use pseudo_sync::Direction;

use crate::error::JobError;
use crate::model::ModelClient;

/// What happened to a job handed to [`Orchestrator::process_job`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Not claimable (already claimed elsewhere, draft, finished or gone).
    Skipped,
    Responded,
    /// Terminal error; the message is also stored on the job.
    Failed(String),
}

/// Shared handles a worker needs. Cloning is cheap.
#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) files: Arc<FileStore>,
    pub(crate) schemas: Arc<SchemaStore>,
    pub(crate) jobs: Arc<JobStore>,
    pub(crate) model: Arc<dyn ModelClient>,
}

/// Settings and compiled template of the schema a job runs against.
pub(crate) struct Resolved {
    pub schema: Schema,
    pub settings: SchemaSettings,
}

impl Orchestrator {
    pub fn new(
        files: Arc<FileStore>,
        schemas: Arc<SchemaStore>,
        jobs: Arc<JobStore>,
        model: Arc<dyn ModelClient>,
    ) -> Self {
        Self {
            files,
            schemas,
            jobs,
            model,
        }
    }

    pub fn files(&self) -> &FileStore {
        &self.files
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    pub fn schemas(&self) -> &SchemaStore {
        &self.schemas
    }

    /// Claim and run one job to a terminal state.
    ///
    /// `Err` is reserved for store failures while recording the outcome;
    /// job-level failures come back as [`JobOutcome::Failed`].
    pub async fn process_job(&self, id: JobId) -> Result<JobOutcome, JobError> {
        let Some(job) = self.jobs.get(id)? else {
            return Ok(JobOutcome::Skipped);
        };
        if !job.status.is_claimable() {
            return Ok(JobOutcome::Skipped);
        }
        if job.model_ref.is_none() {
            let claimable = [JobStatus::Submitted, JobStatus::ReApplying];
            if !self.jobs.transition(id, &claimable, JobStatus::Error)? {
                return Ok(JobOutcome::Skipped);
            }
            let message = JobError::NoModel.to_string();
            self.jobs.mark_error(id, &message)?;
            warn!(job_id = %id, "job has no model");
            return Ok(JobOutcome::Failed(message));
        }

        let Some(job) = self.jobs.try_claim(id)? else {
            debug!(job_id = %id, "claim lost");
            return Ok(JobOutcome::Skipped);
        };
        info!(job_id = %id, schema = %job.schema_name, path = %job.path, "job claimed");

        match self.dispatch(&job).await {
            Ok(()) => {
                self.jobs.mark_responded(id)?;
                info!(job_id = %id, "job responded");
                if job.schema_name == SCHEMA_EDITOR {
                    self.refresh_schemas(&job.project);
                }
                Ok(JobOutcome::Responded)
            }
            Err(err) => {
                let message = err.to_string();
                self.jobs.mark_error(id, &message)?;
                warn!(job_id = %id, error = %message, "job failed");
                Ok(JobOutcome::Failed(message))
            }
        }
    }

    fn refresh_schemas(&self, project: &ProjectId) {
        match pseudo_schema::refresh(&self.files, &self.schemas, project) {
            Ok(report) => debug!(project = %project, loaded = report.loaded.len(), "schemas reloaded"),
            Err(err) => warn!(project = %project, error = %err, "schema refresh failed"),
        }
    }

    fn resolve(&self, job: &Job) -> Result<Resolved, JobError> {
        let missing = || JobError::MissingSchema(job.schema_name.clone());
        let settings = self
            .schemas
            .settings(&job.project, &job.schema_name)?
            .ok_or_else(missing)?;
        let schema = self
            .schemas
            .schema(&job.project, &job.schema_name)?
            .ok_or_else(missing)?;
        Ok(Resolved { schema, settings })
    }

    async fn dispatch(&self, job: &Job) -> Result<(), JobError> {
        let model_ref = job.model_ref.clone().ok_or(JobError::NoModel)?;
        let resolved = self.resolve(job)?;
        if resolved.settings.is_agent {
            return self.run_agent(job, &resolved, &model_ref).await;
        }
        match resolved.settings.processing_mode {
            ProcessingMode::Single => self.run_single(job, &resolved, &model_ref).await,
            ProcessingMode::PerFile => self.run_per_file(job, resolved, model_ref).await,
            ProcessingMode::SyncBullets => {
                self.run_sync(job, resolved, model_ref, Direction::BulletsFromRaw)
                    .await
            }
            ProcessingMode::SyncRaw => {
                self.run_sync(job, resolved, model_ref, Direction::RawFromBullets)
                    .await
            }
        }
    }

    // -----------------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------------

    /// Values common to every prompt of `job`.
    pub(crate) fn base_values(&self, job: &Job, settings: &SchemaSettings) -> TemplateValues {
        TemplateValues::for_schema(settings)
            .with("prompt", job.prompt.as_str())
            .with("path", job.path.as_str())
    }

    /// The job's context files, in id order.
    pub(crate) fn context_files(&self, job: &Job) -> Result<Vec<ContextFile>, JobError> {
        Ok(self
            .files
            .contents(&job.context_file_ids)?
            .into_iter()
            .map(|(node, content)| ContextFile::new(node.full_path(), content.body))
            .collect())
    }

    /// Send one request and record the reply on the job before it is applied.
    pub(crate) async fn send(
        &self,
        job_id: JobId,
        model_ref: &str,
        messages: &[ChatMessage],
    ) -> Result<String, JobError> {
        debug!(job_id = %job_id, model = model_ref, messages = messages.len(), "sending");
        let reply = self.model.send(model_ref, messages).await?;
        if reply.trim().is_empty() {
            return Err(crate::error::ModelError::EmptyResponse.into());
        }
        self.jobs.append_response(job_id, &reply)?;
        Ok(reply)
    }
}
