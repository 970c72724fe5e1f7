//! Building the ordered model messages for one request.

use pseudo_core::{ChatMessage, Schema, SectionKind};

use crate::context::TemplateValues;
use crate::error::SchemaError;

/// A file handed to the model as supporting context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFile {
    /// Full store path, e.g. `/lib/main.dart.pseudo`.
    pub path: String,
    pub content: String,
}

impl ContextFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// All context files as one block, for templates using `⟪context⟫`.
pub fn context_digest(files: &[ContextFile]) -> String {
    files
        .iter()
        .map(|f| format!("{}:\n{}", f.path, f.content.trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render `schema` into messages.
///
/// System sections become system messages, then every Context section is
/// rendered once per context file (with `file`, `path` and `content` bound to
/// that file), then User sections. Comment sections and messages that render
/// empty are dropped. `context` is bound to [`context_digest`] unless the
/// caller set it.
pub fn build_messages(
    schema: &Schema,
    values: &TemplateValues,
    context: &[ContextFile],
) -> Result<Vec<ChatMessage>, SchemaError> {
    let mut values = values.clone();
    if !values.contains("context") && !context.is_empty() {
        values.set("context", context_digest(context));
    }

    let mut system = Vec::new();
    let mut contextual = Vec::new();
    let mut user = Vec::new();
    for section in &schema.sections {
        match section.kind {
            SectionKind::Comment => {}
            SectionKind::System => {
                system.push(ChatMessage::system(values.render(&section.template)?));
            }
            SectionKind::User => {
                user.push(ChatMessage::user(values.render(&section.template)?));
            }
            SectionKind::Context => {
                for file in context {
                    let per_file = values
                        .clone()
                        .with("file", file.name())
                        .with("path", file.path.as_str())
                        .with("content", file.content.as_str());
                    contextual.push(ChatMessage::user(per_file.render(&section.template)?));
                }
            }
        }
    }

    Ok(system
        .into_iter()
        .chain(contextual)
        .chain(user)
        .filter(|m| !m.text.is_empty())
        .collect())
}
