//! Turning a sync plan into a queued job.

use tracing::info;

use pseudo_core::{path, FileStore, JobId, JobSpec, JobStore, ProjectId, SchemaStore};

use crate::error::SyncError;
use crate::plan::{plan, Direction, PlanOptions, SyncPlan};

/// Resolve the sync direction of `schema_name` for `project`.
pub fn direction_of(
    schemas: &SchemaStore,
    project: &ProjectId,
    schema_name: &str,
) -> Result<Direction, SyncError> {
    let settings = schemas
        .settings(project, schema_name)?
        .ok_or_else(|| SyncError::UnknownSchema(schema_name.to_string()))?;
    Direction::for_mode(settings.processing_mode)
        .ok_or_else(|| SyncError::NotASyncSchema(schema_name.to_string()))
}

/// Plan `project` and enqueue one `Submitted` job for `schema_name` carrying
/// every pair its direction has to process. Returns `None` when nothing is
/// stale in that direction.
pub fn seed_job(
    files: &FileStore,
    schemas: &SchemaStore,
    jobs: &JobStore,
    project: &ProjectId,
    schema_name: &str,
    options: &PlanOptions,
    model_ref: Option<String>,
) -> Result<(SyncPlan, Option<JobId>), SyncError> {
    let direction = direction_of(schemas, project, schema_name)?;
    let plan = plan(files, project, options)?;
    let pairs = plan.pairs_for(direction);
    if pairs.is_empty() {
        return Ok((plan, None));
    }

    let spec = JobSpec {
        path: options
            .prefix
            .as_deref()
            .map(path::normalize)
            .unwrap_or_else(|| path::ROOT.to_string()),
        sync_bullet_file_ids: pairs.iter().map(|p| p.bullet.id).collect(),
        sync_raw_file_ids: pairs.iter().map(|p| p.raw_id()).collect(),
        model_ref,
        ..JobSpec::new(project.clone(), schema_name, "")
    };
    let id = jobs.enqueue(spec)?;
    info!(job_id = %id, schema = schema_name, pairs = pairs.len(), "sync job queued");
    Ok((plan, Some(id)))
}
