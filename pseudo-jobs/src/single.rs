//! Single-mode jobs: one prompt, one reply, applied to the target file or
//! split into several files.

use tracing::{info, warn};

use pseudo_core::{path, ContentKind, Job, SchemaSettings};
use pseudo_parser::{extract_code, parse_bullet_files, parse_raw_files};
use pseudo_schema::{build_messages, TemplateValues};

use crate::error::JobError;
use crate::orchestrator::{Orchestrator, Resolved};

impl Orchestrator {
    /// Bind `file` and, when the target exists, `content`.
    pub(crate) fn bind_target(&self, job: &Job, values: &mut TemplateValues) -> Result<(), JobError> {
        let (Some(name), Some(target)) = (job.target_file_name.as_deref(), job.target_path()) else {
            return Ok(());
        };
        values.set("file", name);
        if let Some(node) = self.files.find(&job.project, &target)? {
            if let Some(content) = self.files.content(node.id)? {
                values.set("content", content.body);
            }
        }
        Ok(())
    }

    pub(crate) async fn run_single(
        &self,
        job: &Job,
        resolved: &Resolved,
        model_ref: &str,
    ) -> Result<(), JobError> {
        let reply = match job.last_response() {
            Some(previous) => {
                info!(job_id = %job.id, "re-applying stored response");
                previous.to_string()
            }
            None => {
                let mut values = self.base_values(job, &resolved.settings);
                self.bind_target(job, &mut values)?;
                let context = self.context_files(job)?;
                let messages = build_messages(&resolved.schema, &values, &context)?;
                self.send(job.id, model_ref, &messages).await?
            }
        };
        self.apply_single(job, &resolved.settings, &reply)
    }

    fn apply_single(&self, job: &Job, settings: &SchemaSettings, reply: &str) -> Result<(), JobError> {
        if settings.multi_files_output {
            let parsed = if job.is_native_code {
                parse_raw_files(reply)
            } else {
                parse_bullet_files(reply)
            };
            if !parsed.is_empty() {
                for file in &parsed {
                    let full = path::join(&job.path, &file.path);
                    self.files
                        .write_file(&job.project, &full, &file.content, ContentKind::for_name(&full))?;
                }
                info!(job_id = %job.id, files = parsed.len(), "reply split into files");
                return Ok(());
            }
            warn!(job_id = %job.id, "reply named no files; overwriting target instead");
        }

        let target = job.target_path().ok_or_else(|| {
            JobError::Consistency("reply cannot be applied: the job names no target file".to_string())
        })?;
        let code = extract_code(reply);
        self.files
            .write_file(&job.project, &target, &code, ContentKind::for_name(&target))?;
        info!(job_id = %job.id, target = %target, bytes = code.len(), "target overwritten");
        Ok(())
    }
}
