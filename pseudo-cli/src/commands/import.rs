//! `pseudo import <project> <dir>`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pseudo_sync::import_dir;

use super::session::Session;

/// Load every non-hidden text file under a directory into a project.
#[derive(Args, Debug)]
pub struct ImportArgs {
    pub project: String,

    /// Directory whose tree is mirrored into the project root.
    pub dir: PathBuf,
}

impl ImportArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open(&self.project)?;
        let report = import_dir(&session.files, &session.project, &self.dir)
            .with_context(|| format!("import from '{}' failed", self.dir.display()))?;
        let schemas = session.refresh_schemas()?;
        session.save()?;

        println!(
            "✓ Imported {} files into '{}' ({} schemas loaded)",
            report.imported,
            session.project,
            schemas.loaded.len()
        );
        for path in &report.skipped {
            println!("  ·  skipped non-text file {}", path.display());
        }
        Ok(())
    }
}
