//! `pseudo export <project> <dir> [--dry-run]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pseudo_sync::{export_project, WriteResult};

use super::session::Session;

/// Write a project's live files to a directory.
#[derive(Args, Debug)]
pub struct ExportArgs {
    pub project: String,

    /// Destination directory; created as needed.
    pub dir: PathBuf,

    /// Show what would be written without actually writing any files.
    #[arg(long)]
    pub dry_run: bool,
}

impl ExportArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open(&self.project)?;
        let writes = export_project(&session.files, &session.project, &self.dir, self.dry_run)
            .with_context(|| format!("export to '{}' failed", self.dir.display()))?;
        print_results(&self.project, &writes, self.dry_run);
        Ok(())
    }
}

fn print_results(project: &str, writes: &[WriteResult], dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    if writes.is_empty() {
        println!("{prefix}✓ '{project}' has no files to export");
        return;
    }

    let unchanged = writes
        .iter()
        .filter(|r| matches!(r, WriteResult::Unchanged { .. }))
        .count();
    println!(
        "{prefix}✓ '{project}' exported ({} written, {} unchanged)",
        writes.len() - unchanged,
        unchanged
    );

    for r in writes {
        match r {
            WriteResult::Written { path } => println!("  ✎  {}", path.display()),
            WriteResult::WouldWrite { path } => println!("  ~  {}", path.display()),
            WriteResult::Unchanged { path } => println!("  ·  {}", path.display()),
        }
    }
}
