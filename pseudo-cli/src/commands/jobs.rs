//! `pseudo submit` and `pseudo resubmit`.

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;

use pseudo_core::config::load_config_at;
use pseudo_core::{path, JobId, JobSpec};
use pseudo_jobs::deps::with_dependencies;

use super::session::Session;

/// Queue a job against a schema.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    pub project: String,

    #[arg(long, short = 's')]
    pub schema: String,

    /// Instructions handed to the schema as `prompt`.
    #[arg(long, short = 'p')]
    pub prompt: String,

    /// Folder the job works in.
    #[arg(long, default_value = path::ROOT)]
    pub path: String,

    /// File name (inside `--path`) the reply is applied to.
    #[arg(long, short = 't')]
    pub target: Option<String>,

    /// Extra file sent as context; repeatable. Imports of bullet files are
    /// followed.
    #[arg(long = "context", short = 'c', value_name = "PATH")]
    pub context: Vec<String>,

    /// Model ref; defaults to `default_model` from config.yaml.
    #[arg(long, short = 'm')]
    pub model: Option<String>,

    /// Replies carry native code rather than pseudo-code.
    #[arg(long)]
    pub native: bool,

    /// Save as a draft instead of queueing it.
    #[arg(long)]
    pub draft: bool,
}

impl SubmitArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open(&self.project)?;
        if session
            .schemas
            .settings(&session.project, &self.schema)
            .context("failed to read schemas")?
            .is_none()
        {
            bail!(
                "unknown schema '{}'; see `pseudo schemas {}`",
                self.schema,
                self.project
            );
        }

        let mut roots = Vec::with_capacity(self.context.len());
        for entry in &self.context {
            let node = session
                .files
                .find(&session.project, entry)
                .context("failed to read files")?
                .filter(|n| n.is_file && !n.to_delete)
                .ok_or_else(|| anyhow!("context file '{entry}' not found"))?;
            roots.push(node.id);
        }
        let context_file_ids = with_dependencies(&session.files, &session.project, &roots)
            .context("failed to resolve context imports")?;

        let config = load_config_at(&session.home).context("failed to load config.yaml")?;
        let spec = JobSpec {
            path: path::normalize(&self.path),
            target_file_name: self.target,
            context_file_ids,
            model_ref: self.model.or(config.default_model),
            is_native_code: self.native,
            ..JobSpec::new(session.project.clone(), self.schema.as_str(), self.prompt)
        };
        if spec.model_ref.is_none() && !self.draft {
            eprintln!("! no model selected; the job will fail when run");
        }

        let id = if self.draft {
            session.jobs.draft(spec)
        } else {
            session.jobs.enqueue(spec)
        }
        .context("failed to create job")?;
        session.save()?;

        let state = if self.draft { "Saved draft" } else { "Queued" };
        println!("✓ {state} job {id} ({}) in '{}'", self.schema, self.project);
        Ok(())
    }
}

/// Re-queue a responded or failed job, or submit a draft.
#[derive(Args, Debug)]
pub struct ResubmitArgs {
    pub project: String,

    /// Job id as shown by `pseudo status`.
    pub id: u64,
}

impl ResubmitArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open(&self.project)?;
        let id = JobId(self.id);
        match session.jobs.get(id).context("failed to read jobs")? {
            Some(job) if job.project == session.project => {}
            _ => bail!("job {id} not found in '{}'", self.project),
        }
        let status = session
            .jobs
            .resubmit(id)
            .with_context(|| format!("job {id} cannot be resubmitted"))?;
        session.save()?;

        println!("✓ Job {id} is now {status}");
        Ok(())
    }
}
