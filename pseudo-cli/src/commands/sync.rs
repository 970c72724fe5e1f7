//! `pseudo sync` plans bullet/raw drift and queues a sync job.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use pseudo_core::config::load_config_at;
use pseudo_core::JobId;
use pseudo_sync::{direction_of, plan, seed_job, PlanOptions, SyncSummary};

use super::session::Session;

/// Arguments for `pseudo sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    pub project: String,

    /// Sync schema to run (`to-raw`, `to-bullets` or a project schema).
    #[arg(long, short = 's')]
    pub schema: String,

    /// Only consider bullet files at or below this folder.
    #[arg(long)]
    pub path: Option<String>,

    /// Regenerate every paired file in the schema's direction, stale or not.
    #[arg(long)]
    pub force: bool,

    /// Model ref for the job; defaults to `default_model` from config.yaml.
    #[arg(long, short = 'm')]
    pub model: Option<String>,

    /// Print the plan without queueing a job.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct SyncReportJson {
    schema: String,
    dry_run: bool,
    plan: SyncSummary,
    job_id: Option<JobId>,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open(&self.project)?;
        let direction = direction_of(&session.schemas, &session.project, &self.schema)
            .with_context(|| format!("cannot sync with schema '{}'", self.schema))?;
        let options = PlanOptions {
            prefix: self.path.clone(),
            force: self.force.then_some(direction),
        };

        let (summary, job_id) = if self.dry_run {
            let plan = plan(&session.files, &session.project, &options).context("sync planning failed")?;
            (plan.summary(), None)
        } else {
            let config = load_config_at(&session.home).context("failed to load config.yaml")?;
            let model = self.model.clone().or(config.default_model);
            let (plan, job_id) = seed_job(
                &session.files,
                &session.schemas,
                &session.jobs,
                &session.project,
                &self.schema,
                &options,
                model,
            )
            .context("failed to queue sync job")?;
            if job_id.is_some() {
                session.save()?;
            }
            (plan.summary(), job_id)
        };

        if self.json {
            let payload = SyncReportJson {
                schema: self.schema,
                dry_run: self.dry_run,
                plan: summary,
                job_id,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize sync JSON")?
            );
            return Ok(());
        }

        let prefix = if self.dry_run { "[dry-run] " } else { "" };
        println!(
            "{prefix}'{}': {} bullets stale, {} raw missing, {} raw stale, {} in sync",
            self.project,
            summary.bullets_needing_update,
            summary.raw_needing_creation,
            summary.raw_needing_update,
            summary.in_sync
        );
        match job_id {
            Some(id) => println!("✓ Queued job {id} ({}). Run `pseudo run {}` to process it.", self.schema, self.project),
            None if self.dry_run => {}
            None => println!("✓ Nothing to sync for '{}'", self.schema),
        }
        Ok(())
    }
}
