//! Job queue with compare-and-set status transitions.
//!
//! The claim protocol: a worker may process a job only after
//! [`JobStore::try_claim`] moved it from `Submitted`/`ReApplying` to
//! `Processing`. The check and the write happen under one lock, so at most
//! one concurrent claimer wins; every other caller gets `None`.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::error::StoreError;
use crate::types::{Job, JobId, JobSpec, JobStatus, ProjectId};

#[derive(Debug, Default)]
struct JobTable {
    next_id: u64,
    jobs: BTreeMap<JobId, Job>,
}

impl JobTable {
    fn job_mut(&mut self, id: JobId) -> Result<&mut Job, StoreError> {
        self.jobs.get_mut(&id).ok_or(StoreError::JobNotFound(id))
    }
}

#[derive(Debug, Default)]
pub struct JobStore {
    inner: Mutex<JobTable>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, JobTable>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned("job store"))
    }

    fn insert(&self, spec: JobSpec, status: JobStatus) -> Result<JobId, StoreError> {
        let mut table = self.lock()?;
        table.next_id += 1;
        let id = JobId(table.next_id);
        table.jobs.insert(id, Job::from_spec(id, spec, status));
        Ok(id)
    }

    /// Queue a job for processing (`Submitted`).
    pub fn enqueue(&self, spec: JobSpec) -> Result<JobId, StoreError> {
        self.insert(spec, JobStatus::Submitted)
    }

    /// Store a draft job (`Prompting`) that no worker will pick up.
    pub fn draft(&self, spec: JobSpec) -> Result<JobId, StoreError> {
        self.insert(spec, JobStatus::Prompting)
    }

    pub fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.lock()?.jobs.get(&id).cloned())
    }

    /// Jobs of `project`, oldest first.
    pub fn list(&self, project: &ProjectId) -> Result<Vec<Job>, StoreError> {
        Ok(self
            .lock()?
            .jobs
            .values()
            .filter(|j| &j.project == project)
            .cloned()
            .collect())
    }

    /// Ids of every job currently in a claimable state, oldest first.
    pub fn claimable(&self) -> Result<Vec<JobId>, StoreError> {
        Ok(self
            .lock()?
            .jobs
            .values()
            .filter(|j| j.status.is_claimable())
            .map(|j| j.id)
            .collect())
    }

    /// Move `id` to `to` only if it is currently in one of `expected`.
    ///
    /// Returns `false` (zero rows affected) when the job is in any other state.
    pub fn transition(&self, id: JobId, expected: &[JobStatus], to: JobStatus) -> Result<bool, StoreError> {
        let mut table = self.lock()?;
        let job = table.job_mut(id)?;
        if !expected.contains(&job.status) {
            return Ok(false);
        }
        job.status = to;
        job.last_updated = Utc::now();
        Ok(true)
    }

    /// Atomically claim a claimable job for processing.
    ///
    /// Returns the claimed job (already `Processing`), or `None` when the job
    /// was claimed by someone else or is gone.
    pub fn try_claim(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let mut table = self.lock()?;
        let Some(job) = table.jobs.get_mut(&id) else {
            return Ok(None);
        };
        if !job.status.is_claimable() {
            return Ok(None);
        }
        job.status = JobStatus::Processing;
        job.error_message = None;
        job.progress = None;
        job.last_updated = Utc::now();
        Ok(Some(job.clone()))
    }

    pub fn set_progress(&self, id: JobId, progress: Option<f32>) -> Result<(), StoreError> {
        let mut table = self.lock()?;
        let job = table.job_mut(id)?;
        job.progress = progress.map(|p| p.clamp(0.0, 1.0));
        job.last_updated = Utc::now();
        Ok(())
    }

    /// Append a raw model reply to the job's response history.
    pub fn append_response(&self, id: JobId, reply: &str) -> Result<(), StoreError> {
        let mut table = self.lock()?;
        let job = table.job_mut(id)?;
        job.responses.push(reply.to_string());
        job.last_updated = Utc::now();
        Ok(())
    }

    /// `Processing → Responded`.
    pub fn mark_responded(&self, id: JobId) -> Result<(), StoreError> {
        let mut table = self.lock()?;
        let job = table.job_mut(id)?;
        if job.status != JobStatus::Processing {
            return Err(StoreError::InvalidTransition {
                id,
                from: job.status,
                to: JobStatus::Responded,
            });
        }
        job.status = JobStatus::Responded;
        job.progress = Some(1.0);
        job.last_updated = Utc::now();
        Ok(())
    }

    /// Record a terminal error. Allowed from any state: configuration checks
    /// fail jobs before they are claimed.
    pub fn mark_error(&self, id: JobId, message: &str) -> Result<(), StoreError> {
        let mut table = self.lock()?;
        let job = table.job_mut(id)?;
        job.status = JobStatus::Error;
        job.error_message = Some(message.to_string());
        job.last_updated = Utc::now();
        Ok(())
    }

    /// User-initiated recovery: `Prompting → Submitted`, and
    /// `Responded | Error → ReApplying`. Returns the new status.
    pub fn resubmit(&self, id: JobId) -> Result<JobStatus, StoreError> {
        let mut table = self.lock()?;
        let job = table.job_mut(id)?;
        let to = match job.status {
            JobStatus::Prompting => JobStatus::Submitted,
            JobStatus::Responded | JobStatus::Error => JobStatus::ReApplying,
            from => {
                return Err(StoreError::InvalidTransition {
                    id,
                    from,
                    to: JobStatus::ReApplying,
                })
            }
        };
        job.status = to;
        job.last_updated = Utc::now();
        Ok(to)
    }

    /// All jobs of `project`.
    pub fn snapshot(&self, project: &ProjectId) -> Result<Vec<Job>, StoreError> {
        self.list(project)
    }

    /// Replace every job of `project` with `rows`, keeping their ids.
    ///
    /// Jobs persisted mid-flight (`Processing`) come back as `Error`: no
    /// worker survives a restart.
    pub fn restore(&self, project: &ProjectId, rows: Vec<Job>) -> Result<(), StoreError> {
        let mut table = self.lock()?;
        table.jobs.retain(|_, j| &j.project != project);
        for mut job in rows {
            if job.status == JobStatus::Processing {
                job.status = JobStatus::Error;
                job.error_message = Some("interrupted while processing".to_string());
            }
            table.next_id = table.next_id.max(job.id.0);
            table.jobs.insert(job.id, Job { project: project.clone(), ..job });
        }
        Ok(())
    }
}
