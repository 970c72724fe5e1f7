//! `pseudo status`: files, bullet/raw drift and jobs of one project.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use pseudo_core::{Job, JobStatus};
use pseudo_sync::{plan, PlanOptions, SyncSummary};

use super::session::Session;

/// Arguments for `pseudo status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    pub project: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open(&self.project)?;
        let report = build_report(&session)?;
        if self.json {
            print_json(report)?;
            return Ok(());
        }

        print_table(report);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct StatusReport {
    project: String,
    files: usize,
    bullet_files: usize,
    sync: SyncSummary,
    jobs: Vec<Job>,
}

#[derive(Serialize)]
struct StatusReportJson {
    project: String,
    files: usize,
    bullet_files: usize,
    sync: SyncSummary,
    jobs: Vec<JobStatusJson>,
}

#[derive(Serialize)]
struct JobStatusJson {
    id: u64,
    schema: String,
    status: String,
    path: String,
    target: Option<String>,
    model: Option<String>,
    progress: Option<f32>,
    responses: usize,
    error: Option<String>,
    last_updated: String,
}

#[derive(Tabled)]
struct JobTableRow {
    #[tabled(rename = "id")]
    id: u64,
    #[tabled(rename = "schema")]
    schema: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "target")]
    target: String,
    #[tabled(rename = "progress")]
    progress: String,
    #[tabled(rename = "updated")]
    updated: String,
    #[tabled(rename = "detail")]
    detail: String,
}

fn build_report(session: &Session) -> Result<StatusReport> {
    let live = session
        .files
        .live_files(&session.project)
        .context("failed to read files")?;
    let plan = plan(&session.files, &session.project, &PlanOptions::default())
        .context("sync planning failed")?;
    let jobs = session
        .jobs
        .list(&session.project)
        .context("failed to read jobs")?;

    Ok(StatusReport {
        project: session.project.to_string(),
        files: live.len(),
        bullet_files: live.iter().filter(|n| n.is_bullet()).count(),
        sync: plan.summary(),
        jobs,
    })
}

fn print_json(report: StatusReport) -> Result<()> {
    let payload = StatusReportJson {
        project: report.project,
        files: report.files,
        bullet_files: report.bullet_files,
        sync: report.sync,
        jobs: report
            .jobs
            .into_iter()
            .map(|job| JobStatusJson {
                id: job.id.0,
                target: job.target_path(),
                schema: job.schema_name,
                status: job.status.to_string(),
                path: job.path,
                model: job.model_ref,
                progress: job.progress,
                responses: job.responses.len(),
                error: job.error_message,
                last_updated: job.last_updated.to_rfc3339(),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(report: StatusReport) {
    println!(
        "pseudo v{} | {} | {} files ({} pseudo-code) | {} jobs",
        env!("CARGO_PKG_VERSION"),
        report.project.bold(),
        report.files,
        report.bullet_files,
        report.jobs.len(),
    );

    let separator = "■".repeat(67).bright_black().to_string();
    println!("{separator}");
    let sync = &report.sync;
    println!(
        "Sync: {} in sync  {} pseudo-code stale  {} code missing  {} code stale",
        sync.in_sync.to_string().green().bold(),
        sync.bullets_needing_update.to_string().yellow().bold(),
        sync.raw_needing_creation.to_string().magenta().bold(),
        sync.raw_needing_update.to_string().yellow().bold(),
    );
    println!("{separator}");

    if report.jobs.is_empty() {
        println!("No jobs yet.");
        return;
    }

    let now = Utc::now();
    let rows: Vec<JobTableRow> = report
        .jobs
        .iter()
        .map(|job| JobTableRow {
            id: job.id.0,
            schema: job.schema_name.clone(),
            status: status_label(job.status),
            target: job.target_path().unwrap_or_else(|| job.path.clone()),
            progress: job
                .progress
                .map(|p| format!("{:.0}%", p * 100.0))
                .unwrap_or_else(|| "-".to_string()),
            updated: format_age(now, job.last_updated),
            detail: job_detail(job),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let waiting = report
        .jobs
        .iter()
        .filter(|j| j.status.is_claimable())
        .count();
    if waiting > 0 {
        println!("Run 'pseudo run {}' to process {waiting} queued jobs.", report.project);
    }
}

fn status_label(status: JobStatus) -> String {
    let label = status.to_string().to_uppercase();
    match status {
        JobStatus::Prompting => label.bright_black().to_string(),
        JobStatus::Submitted | JobStatus::ReApplying => label.cyan().to_string(),
        JobStatus::Processing => label.yellow().to_string(),
        JobStatus::Responded => label.green().to_string(),
        JobStatus::Error => label.red().bold().to_string(),
    }
}

fn job_detail(job: &Job) -> String {
    match (&job.error_message, job.model_ref.as_deref()) {
        (Some(message), _) => message.clone(),
        (None, Some(model)) => format!("model {model}, {} replies", job.responses.len()),
        (None, None) => "no model".to_string(),
    }
}

fn format_age(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    match seconds {
        0..=59 => format!("{seconds}s ago"),
        60..=3599 => format!("{}m ago", seconds / 60),
        3600..=86_399 => format!("{}h ago", seconds / 3600),
        _ => format!("{}d ago", seconds / 86_400),
    }
}
