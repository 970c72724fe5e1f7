//! Per-file and sync jobs: one concurrent sub-task per file or pair.
//!
//! Sub-tasks commit independently. The first failure becomes the job's
//! error, but siblings that already wrote their result are kept.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use pseudo_core::{path, ContentKind, FileId, FileNode, Job, JobId};
use pseudo_parser::{extract_code, parse_raw_files};
use pseudo_schema::{build_messages, ContextFile};
use pseudo_sync::{apply_bullets, apply_raw, plan, Direction, PlanOptions, SyncError};

use crate::deps::{imports_of, with_dependencies};
use crate::error::JobError;
use crate::orchestrator::{Orchestrator, Resolved};

/// Read-only state every sub-task of one job shares.
struct Shared {
    job: Job,
    resolved: Resolved,
    model_ref: String,
    context: Vec<ContextFile>,
}

impl Orchestrator {
    /// Run `tasks` concurrently, publishing `completed / total` as progress.
    async fn fan_out<F>(&self, job_id: JobId, tasks: Vec<F>) -> Result<(), JobError>
    where
        F: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        let total = tasks.len();
        if total == 0 {
            info!(job_id = %job_id, "nothing to process");
            return Ok(());
        }
        self.jobs.set_progress(job_id, Some(0.0))?;

        let completed = Arc::new(AtomicUsize::new(0));
        let mut set = JoinSet::new();
        for task in tasks {
            let completed = completed.clone();
            let jobs = self.jobs.clone();
            set.spawn(async move {
                let result = task.await;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Err(err) = jobs.set_progress(job_id, Some(done as f32 / total as f32)) {
                    warn!(job_id = %job_id, error = %err, "progress update failed");
                }
                result
            });
        }

        let mut first_error = None;
        let mut failed = 0usize;
        while let Some(joined) = set.join_next().await {
            let result = joined
                .map_err(|e| JobError::Join(e.to_string()))
                .and_then(|r| r);
            if let Err(err) = result {
                failed += 1;
                warn!(job_id = %job_id, error = %err, "sub-task failed");
                first_error.get_or_insert(err);
            }
        }
        info!(job_id = %job_id, total, failed, "sub-tasks finished");
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // PerFile
    // -----------------------------------------------------------------------

    pub(crate) async fn run_per_file(
        &self,
        job: &Job,
        resolved: Resolved,
        model_ref: String,
    ) -> Result<(), JobError> {
        let targets: Vec<FileNode> = match job.target_path() {
            Some(target) => {
                let node = self
                    .files
                    .find(&job.project, &target)?
                    .filter(|n| n.is_file && !n.to_delete)
                    .ok_or_else(|| JobError::Consistency(format!("{target} not found")))?;
                vec![node]
            }
            None => self.files.files_under(
                &job.project,
                &job.path,
                resolved.settings.input_extension.as_deref(),
            )?,
        };
        debug!(job_id = %job.id, files = targets.len(), "per-file fan-out");

        let shared = Arc::new(Shared {
            job: job.clone(),
            context: self.context_files(job)?,
            resolved,
            model_ref,
        });
        let tasks = targets
            .into_iter()
            .map(|node| {
                let this = self.clone();
                let shared = shared.clone();
                async move { this.per_file_task(&shared, node).await }
            })
            .collect();
        self.fan_out(job.id, tasks).await
    }

    async fn per_file_task(&self, shared: &Shared, node: FileNode) -> Result<(), JobError> {
        let full = node.full_path();
        let content = self
            .files
            .content(node.id)?
            .ok_or_else(|| JobError::Consistency(format!("{full} has no content")))?;
        let values = self
            .base_values(&shared.job, &shared.resolved.settings)
            .with("file", node.name.as_str())
            .with("path", full.as_str())
            .with("content", content.body);
        let messages = build_messages(&shared.resolved.schema, &values, &shared.context)?;
        let reply = self.send(shared.job.id, &shared.model_ref, &messages).await?;

        if shared.resolved.settings.override_files {
            self.files.update_content(node.id, &extract_code(&reply))?;
            debug!(path = %full, "file overwritten");
            return Ok(());
        }
        let parsed = parse_raw_files(&reply);
        if parsed.is_empty() {
            warn!(path = %full, "reply named no files");
        }
        for file in parsed {
            let target = path::join(&node.path, &file.path);
            self.files
                .write_file(&node.project, &target, &file.content, ContentKind::for_name(&target))?;
            debug!(source = %full, path = %target, "sibling file written");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sync
    // -----------------------------------------------------------------------

    pub(crate) async fn run_sync(
        &self,
        job: &Job,
        resolved: Resolved,
        model_ref: String,
        direction: Direction,
    ) -> Result<(), JobError> {
        let pairs: Vec<(FileId, Option<FileId>)> = if job.sync_bullet_file_ids.is_empty() {
            let options = PlanOptions {
                prefix: Some(job.path.clone()),
                force: None,
            };
            plan(&self.files, &job.project, &options)?
                .pairs_for(direction)
                .iter()
                .map(|p| (p.bullet.id, p.raw_id()))
                .collect()
        } else {
            job.sync_bullet_file_ids
                .iter()
                .enumerate()
                .map(|(idx, id)| (*id, job.sync_raw_file_ids.get(idx).copied().flatten()))
                .collect()
        };
        debug!(job_id = %job.id, pairs = pairs.len(), ?direction, "sync fan-out");

        let shared = Arc::new(Shared {
            job: job.clone(),
            context: self.context_files(job)?,
            resolved,
            model_ref,
        });
        let tasks = pairs
            .into_iter()
            .map(|(bullet, raw)| {
                let this = self.clone();
                let shared = shared.clone();
                async move { this.sync_task(&shared, bullet, raw, direction).await }
            })
            .collect();
        self.fan_out(job.id, tasks).await
    }

    /// Live node and body of `id`, or the pair's consistency error.
    fn live_file(&self, id: FileId) -> Result<(FileNode, String), JobError> {
        let node = self
            .files
            .get(id)?
            .filter(|n| n.is_file && !n.to_delete)
            .ok_or(SyncError::MissingCounterpart(id))?;
        let body = self
            .files
            .content(id)?
            .map(|c| c.body)
            .ok_or(SyncError::MissingCounterpart(id))?;
        Ok((node, body))
    }

    /// Context for one pair: the job's own context plus the bullet file's
    /// imports, transitively.
    fn pair_context(&self, shared: &Shared, bullet: &FileNode) -> Result<Vec<ContextFile>, JobError> {
        let mut context = shared.context.clone();
        let deps = with_dependencies(&self.files, &bullet.project, &[bullet.id])?;
        let extra: Vec<FileId> = deps
            .into_iter()
            .skip(1)
            .filter(|id| !shared.job.context_file_ids.contains(id))
            .collect();
        for (node, content) in self.files.contents(&extra)? {
            context.push(ContextFile::new(node.full_path(), content.body));
        }
        Ok(context)
    }

    async fn sync_task(
        &self,
        shared: &Shared,
        bullet_id: FileId,
        raw_id: Option<FileId>,
        direction: Direction,
    ) -> Result<(), JobError> {
        let (bullet, bullet_body) = self.live_file(bullet_id)?;
        let raw = raw_id.map(|id| self.live_file(id)).transpose()?;
        let raw_path = path::join(&bullet.path, bullet.stem().unwrap_or(&bullet.name));
        let missing_raw = || JobError::Consistency(format!("{raw_path} does not exist"));
        if direction == Direction::BulletsFromRaw && raw.is_none() {
            return Err(missing_raw());
        }

        let (_, raw_name) = path::split(&raw_path);
        let mut values = self
            .base_values(&shared.job, &shared.resolved.settings)
            .with("file", raw_name)
            .with("path", raw_path.as_str())
            .with("imports", imports_of(&bullet_body).join("\n"))
            .with("bullet", bullet_body.as_str());
        values.set_opt("raw", raw.as_ref().map(|(_, body)| body.clone()));
        let context = self.pair_context(shared, &bullet)?;
        let messages = build_messages(&shared.resolved.schema, &values, &context)?;
        let reply = self.send(shared.job.id, &shared.model_ref, &messages).await?;
        let text = extract_code(&reply);

        match direction {
            Direction::RawFromBullets => {
                apply_raw(&self.files, bullet.id, raw_id, &text)?;
            }
            Direction::BulletsFromRaw => {
                apply_bullets(&self.files, bullet.id, raw_id.ok_or_else(missing_raw)?, &text)?;
            }
        }
        debug!(bullet = %bullet.full_path(), ?direction, "pair reconciled");
        Ok(())
    }
}
