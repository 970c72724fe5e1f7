//! `pseudo run <project>` drains the job queue.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use pseudo_core::config::load_config_at;
use pseudo_core::JobStatus;
use pseudo_jobs::{run_until_idle, CommandModel, Orchestrator};

use super::session::Session;

/// Process every queued job, including follow-ups queued by agent jobs.
#[derive(Args, Debug)]
pub struct RunArgs {
    pub project: String,

    /// Override `max_concurrent_jobs` from config.yaml.
    #[arg(long, short = 'j')]
    pub jobs: Option<usize>,

    /// Emit the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open(&self.project)?;
        let config = load_config_at(&session.home).context("failed to load config.yaml")?;
        let max_concurrent = self.jobs.unwrap_or(config.max_concurrent_jobs);

        let before: Vec<_> = session
            .jobs
            .list(&session.project)
            .context("failed to read jobs")?
            .into_iter()
            .filter(|j| j.status.is_claimable())
            .map(|j| j.id)
            .collect();

        let orchestrator = Orchestrator::new(
            session.files.clone(),
            session.schemas.clone(),
            session.jobs.clone(),
            Arc::new(CommandModel::from_config(&config)),
        );
        let started = Utc::now();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        let outcome = runtime.block_on(run_until_idle(&orchestrator, max_concurrent));
        // Applied results are saved even when the runner failed.
        session.save()?;
        let summary = outcome.context("job runner failed")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("failed to serialize run JSON")?
            );
            return Ok(());
        }

        if before.is_empty() && summary.responded + summary.failed == 0 {
            println!("✓ No queued jobs in '{}'", self.project);
            return Ok(());
        }
        println!(
            "✓ '{}': {} responded, {} failed, {} skipped",
            self.project, summary.responded, summary.failed, summary.skipped
        );
        for job in session.jobs.list(&session.project).context("failed to read jobs")? {
            if job.status == JobStatus::Error && job.last_updated >= started {
                let message = job.error_message.unwrap_or_default();
                println!("  {} job {} ({}): {message}", "✗".red(), job.id, job.schema_name);
            }
        }
        Ok(())
    }
}
