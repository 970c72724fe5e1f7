//! pseudo: pseudo-code projects driven by AI jobs.
//!
//! # Usage
//!
//! ```text
//! pseudo init <project>
//! pseudo import <project> <dir>
//! pseudo export <project> <dir> [--dry-run]
//! pseudo schemas <project>
//! pseudo sync <project> --schema <name> [--path <folder>] [--force] [--model <ref>] [--dry-run] [--json]
//! pseudo submit <project> --schema <name> --prompt <text> [--path] [--target] [--context <path>]... [--model] [--native] [--draft]
//! pseudo resubmit <project> <id>
//! pseudo run <project> [--json]
//! pseudo status <project> [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    export::ExportArgs, import::ImportArgs, init::InitArgs, jobs::ResubmitArgs, jobs::SubmitArgs,
    run::RunArgs, schemas::SchemasArgs, status::StatusArgs, sync::SyncArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pseudo",
    version,
    about = "Keep pseudo-code and source code in step with AI jobs",
    long_about = None,
)]
struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty project under ~/.pseudo/projects/.
    Init(InitArgs),

    /// Load every text file of a directory into a project.
    Import(ImportArgs),

    /// Write a project's live files to a directory.
    Export(ExportArgs),

    /// List the schemas a project can run jobs against.
    Schemas(SchemasArgs),

    /// Plan bullet/raw drift and queue a sync job for it.
    Sync(SyncArgs),

    /// Queue a job.
    Submit(SubmitArgs),

    /// Re-queue a finished job or submit a draft.
    Resubmit(ResubmitArgs),

    /// Process queued jobs until none are left.
    Run(RunArgs),

    /// Show files, drift and jobs of a project.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Import(args) => args.run(),
        Commands::Export(args) => args.run(),
        Commands::Schemas(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Submit(args) => args.run(),
        Commands::Resubmit(args) => args.run(),
        Commands::Run(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}
