//! `pseudo schemas <project>`

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use super::session::Session;

#[derive(Args, Debug)]
pub struct SchemasArgs {
    pub project: String,
}

#[derive(Tabled)]
struct SchemaRow {
    #[tabled(rename = "schema")]
    name: String,
    #[tabled(rename = "mode")]
    mode: String,
    #[tabled(rename = "agent")]
    agent: String,
    #[tabled(rename = "input")]
    input: String,
    #[tabled(rename = "purpose")]
    purpose: String,
}

impl SchemasArgs {
    pub fn run(self) -> Result<()> {
        let session = Session::open(&self.project)?;
        let settings = session
            .schemas
            .list(&session.project)
            .context("failed to list schemas")?;

        let rows: Vec<SchemaRow> = settings
            .into_iter()
            .map(|s| SchemaRow {
                name: s.schema_name,
                mode: s.processing_mode.to_string(),
                agent: match (s.is_agent, s.visible_to_agent) {
                    (true, _) => "agent".to_string(),
                    (false, true) => "visible".to_string(),
                    (false, false) => "-".to_string(),
                },
                input: s.input_extension.unwrap_or_else(|| "-".to_string()),
                purpose: s.purpose,
            })
            .collect();

        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
