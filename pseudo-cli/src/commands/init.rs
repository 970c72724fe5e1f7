//! `pseudo init <project>`

use anyhow::{Context, Result};
use clap::Args;

use pseudo_core::{registry, ProjectId};

use super::session::home_dir;

/// Create a project in the local registry.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project name; becomes ~/.pseudo/projects/<project>/.
    pub project: String,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let project = ProjectId::from(self.project);
        let snapshot = registry::init_project_at(&home, &project)
            .with_context(|| format!("failed to init project '{project}'"))?;

        println!(
            "✓ Project '{}' ready ({} files, {} jobs)",
            project,
            snapshot.files.len(),
            snapshot.jobs.len()
        );
        println!(
            "  Saved to: {}",
            registry::snapshot_path_at(&home, &project).display()
        );
        Ok(())
    }
}
