//! Agent jobs: the reply is a plan of file actions and follow-up commands.

use tracing::{debug, info, warn};

use pseudo_core::{path, FileNode, Job, JobSpec, ProcessingMode, ProjectId, StoreError};
use pseudo_parser::{parse_agent_response, AgentAction, AgentCommand};
use pseudo_schema::{build_messages, SCHEMA_EDITOR};
use pseudo_sync::{pairs, plan, Direction, PlanOptions};

use crate::deps::with_dependencies;
use crate::error::JobError;
use crate::orchestrator::{Orchestrator, Resolved};

/// Agent command that edits a schema instead of running one.
pub const UPDATE_SCHEMA: &str = "update-schema";

/// Schema file targeted by an `update-schema` command naming no file.
const UNTITLED_SCHEMA: &str = "untitled.schema.yaml";

fn compose_prompt(preamble: &str, instructions: &str) -> String {
    match (preamble.is_empty(), instructions.is_empty()) {
        (true, _) => instructions.to_string(),
        (false, true) => preamble.to_string(),
        (false, false) => format!("{preamble}\n\n{instructions}"),
    }
}

fn schema_file_name(entry: &str) -> String {
    let (_, name) = path::split(entry);
    if name.ends_with(path::SCHEMA_SUFFIX) {
        name
    } else {
        format!("{name}{}", path::SCHEMA_SUFFIX)
    }
}

/// `true` when a `files:` entry, resolved against `folder`, names `bullet`
/// or its raw sibling.
fn names_bullet(folder: &str, entry: &str, bullet: &FileNode) -> bool {
    path::bullet_name(&path::join(folder, entry)) == bullet.full_path()
}

impl Orchestrator {
    pub(crate) async fn run_agent(
        &self,
        job: &Job,
        resolved: &Resolved,
        model_ref: &str,
    ) -> Result<(), JobError> {
        let mut values = self.base_values(job, &resolved.settings);
        values.set("schemas", self.schema_listing(&job.project)?);
        self.bind_target(job, &mut values)?;
        let context = self.context_files(job)?;
        let messages = build_messages(&resolved.schema, &values, &context)?;
        let reply = self.send(job.id, model_ref, &messages).await?;
        let response = parse_agent_response(&reply);

        let swept = self.files.sweep_deleted(&job.project)?;
        for action in &response.actions {
            self.apply_action(&job.project, action)?;
        }
        let mut queued = 0;
        for command in &response.commands {
            queued += self.enqueue_command(job, command, &response.preamble)?;
        }
        info!(
            job_id = %job.id,
            swept,
            actions = response.actions.len(),
            commands = response.commands.len(),
            queued,
            "agent plan applied"
        );
        Ok(())
    }

    /// One `- name (mode): purpose` line per schema an agent may use.
    fn schema_listing(&self, project: &ProjectId) -> Result<String, JobError> {
        Ok(self
            .schemas
            .visible_to_agent(project)?
            .iter()
            .map(|s| format!("- {} ({}): {}", s.schema_name, s.processing_mode, s.purpose))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Apply one action. Actions naming missing paths are skipped.
    fn apply_action(&self, project: &ProjectId, action: &AgentAction) -> Result<(), JobError> {
        let result = match action {
            AgentAction::Move { from, to } => self.files.move_path(project, from, to),
            AgentAction::Delete { path } => self.files.mark_to_delete(project, path),
        };
        match result {
            Ok(rows) => debug!(?action, rows, "agent action applied"),
            Err(err @ StoreError::Poisoned(_)) => return Err(err.into()),
            Err(err) => warn!(?action, error = %err, "agent action skipped"),
        }
        Ok(())
    }

    /// Queue the jobs one command asks for. Returns how many were queued.
    fn enqueue_command(&self, job: &Job, command: &AgentCommand, preamble: &str) -> Result<usize, JobError> {
        let project = &job.project;
        let folder = command.path.clone().unwrap_or_else(|| job.path.clone());

        let mut roots = Vec::new();
        for entry in &command.context {
            match self.files.find(project, entry)? {
                Some(node) if node.is_file => roots.push(node.id),
                _ => debug!(context = %entry, "agent context file not found"),
            }
        }
        let base = JobSpec {
            path: folder.clone(),
            context_file_ids: with_dependencies(&self.files, project, &roots)?,
            model_ref: job.model_ref.clone(),
            is_native_code: job.is_native_code,
            ..JobSpec::new(
                project.clone(),
                command.schema.as_str(),
                compose_prompt(preamble, &command.instructions),
            )
        };

        if command.schema == UPDATE_SCHEMA {
            let target = command
                .files
                .first()
                .map(|f| schema_file_name(f))
                .unwrap_or_else(|| UNTITLED_SCHEMA.to_string());
            let spec = JobSpec {
                schema_name: SCHEMA_EDITOR.to_string(),
                target_file_name: Some(target),
                ..base
            };
            self.enqueue(spec)?;
            return Ok(1);
        }

        let Some(settings) = self.schemas.settings(project, &command.schema)? else {
            warn!(schema = %command.schema, "agent named an unknown schema");
            return Ok(0);
        };

        match settings.processing_mode {
            ProcessingMode::PerFile => {
                let mut targets =
                    self.files
                        .files_under(project, &folder, settings.input_extension.as_deref())?;
                if !command.files.is_empty() {
                    targets.retain(|node| {
                        command
                            .files
                            .iter()
                            .any(|f| path::join(&folder, f) == node.full_path())
                    });
                }
                for node in &targets {
                    self.enqueue(JobSpec {
                        path: node.path.clone(),
                        target_file_name: Some(node.name.clone()),
                        ..base.clone()
                    })?;
                }
                Ok(targets.len())
            }
            ProcessingMode::SyncBullets | ProcessingMode::SyncRaw => {
                let direction = match settings.processing_mode {
                    ProcessingMode::SyncBullets => Direction::BulletsFromRaw,
                    _ => Direction::RawFromBullets,
                };
                let selected = if command.files.is_empty() {
                    let options = PlanOptions {
                        prefix: Some(folder.clone()),
                        force: None,
                    };
                    plan(&self.files, project, &options)?.pairs_for(direction)
                } else {
                    let mut all = pairs(&self.files, project, Some(&folder))?;
                    all.retain(|p| command.files.iter().any(|f| names_bullet(&folder, f, &p.bullet)));
                    all
                };
                if selected.is_empty() {
                    debug!(schema = %command.schema, "nothing to sync");
                    return Ok(0);
                }
                self.enqueue(JobSpec {
                    sync_bullet_file_ids: selected.iter().map(|p| p.bullet.id).collect(),
                    sync_raw_file_ids: selected.iter().map(|p| p.raw_id()).collect(),
                    ..base
                })?;
                Ok(1)
            }
            ProcessingMode::Single => {
                let mut spec = base;
                if let Some((first, rest)) = command.files.split_first() {
                    let (dir, name) = path::split(&path::join(&folder, first));
                    spec.path = dir;
                    spec.target_file_name = Some(name);
                    for entry in rest {
                        if let Some(node) = self.files.find(project, &path::join(&folder, entry))? {
                            spec.context_file_ids.push(node.id);
                        }
                    }
                }
                self.enqueue(spec)?;
                Ok(1)
            }
        }
    }

    fn enqueue(&self, spec: JobSpec) -> Result<(), JobError> {
        let schema = spec.schema_name.clone();
        let id = self.jobs.enqueue(spec)?;
        info!(job_id = %id, schema = %schema, "follow-up job queued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_joins_preamble_and_instructions() {
        assert_eq!(compose_prompt("", "do it"), "do it");
        assert_eq!(compose_prompt("ctx", ""), "ctx");
        assert_eq!(compose_prompt("ctx", "do it"), "ctx\n\ndo it");
    }

    #[test]
    fn schema_file_names_gain_suffix() {
        assert_eq!(schema_file_name("docs"), "docs.schema.yaml");
        assert_eq!(schema_file_name("/schemas/docs.schema.yaml"), "docs.schema.yaml");
    }
}
