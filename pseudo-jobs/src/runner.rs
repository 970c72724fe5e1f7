//! Draining the job queue with bounded concurrency.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use pseudo_core::JobId;

use crate::error::JobError;
use crate::orchestrator::{JobOutcome, Orchestrator};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub responded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Responded => self.responded += 1,
            JobOutcome::Failed(_) => self.failed += 1,
            JobOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Process claimable jobs until none are left or in flight, with at most
/// `max_concurrent` jobs running at once. Jobs queued while running (agent
/// follow-ups) are picked up in the same run.
pub async fn run_until_idle(
    orchestrator: &Orchestrator,
    max_concurrent: usize,
) -> Result<RunSummary, JobError> {
    let permits = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut started: HashSet<JobId> = HashSet::new();
    let mut set: JoinSet<(JobId, Result<JobOutcome, JobError>)> = JoinSet::new();
    let mut summary = RunSummary::default();

    loop {
        for id in orchestrator.jobs().claimable()? {
            if !started.insert(id) {
                continue;
            }
            let orchestrator = orchestrator.clone();
            let permits = permits.clone();
            set.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (id, Ok(JobOutcome::Skipped));
                };
                (id, orchestrator.process_job(id).await)
            });
        }

        let Some(joined) = set.join_next().await else {
            break;
        };
        let (id, result) = joined.map_err(|e| JobError::Join(e.to_string()))?;
        match result {
            Ok(outcome) => summary.record(&outcome),
            Err(err) => {
                warn!(job_id = %id, error = %err, "job could not be recorded");
                summary.failed += 1;
            }
        }
    }

    info!(
        responded = summary.responded,
        failed = summary.failed,
        skipped = summary.skipped,
        "queue drained"
    );
    Ok(summary)
}
