//! Schema documents: the YAML form schemas are authored and stored in.
//!
//! ```yaml
//! name: to-raw
//! settings:
//!   processing_mode: sync_raw
//!   purpose: Generate native code from pseudo-code files.
//! sections:
//!   - kind: system
//!     template: |
//!       You turn pseudo-code into source code.
//!   - kind: user
//!     template: ⟪bullet⟫
//! ```

use serde::{Deserialize, Serialize};

use pseudo_core::{ProcessingMode, ProjectId, Schema, SchemaSection, SchemaSettings, SectionKind};

use crate::engine;
use crate::error::SchemaError;

/// Name of the built-in schema that edits other schemas.
pub const SCHEMA_EDITOR: &str = "schema-editor";

/// Built-in documents, baked into the binary. Project schema files with the
/// same name take precedence.
const BUILTINS: &[(&str, &str)] = &[
    ("schema-editor.schema.yaml", include_str!("builtin/schema-editor.schema.yaml")),
    ("agent.schema.yaml", include_str!("builtin/agent.schema.yaml")),
    ("to-raw.schema.yaml", include_str!("builtin/to-raw.schema.yaml")),
    ("to-bullets.schema.yaml", include_str!("builtin/to-bullets.schema.yaml")),
];

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsDocument {
    #[serde(default)]
    pub processing_mode: ProcessingMode,
    #[serde(default)]
    pub is_agent: bool,
    #[serde(default)]
    pub multi_files_output: bool,
    #[serde(default = "default_true")]
    pub override_files: bool,
    #[serde(default)]
    pub input_extension: Option<String>,
    #[serde(default)]
    pub purpose: String,
    #[serde(default = "default_true")]
    pub visible_to_agent: bool,
}

impl Default for SettingsDocument {
    fn default() -> Self {
        Self {
            processing_mode: ProcessingMode::default(),
            is_agent: false,
            multi_files_output: false,
            override_files: true,
            input_extension: None,
            purpose: String::new(),
            visible_to_agent: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDocument {
    pub kind: SectionKind,
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub name: String,
    #[serde(default)]
    pub settings: SettingsDocument,
    #[serde(default)]
    pub sections: Vec<SectionDocument>,
}

impl SchemaDocument {
    /// Parse a document. `origin` names its source in error messages.
    pub fn from_yaml(origin: &str, text: &str) -> Result<Self, SchemaError> {
        let doc: SchemaDocument = serde_yaml::from_str(text).map_err(|e| SchemaError::Parse {
            origin: origin.to_string(),
            source: e,
        })?;
        if doc.name.trim().is_empty() {
            return Err(SchemaError::MissingName {
                origin: origin.to_string(),
            });
        }
        Ok(doc)
    }

    /// Validate every section's keys and produce the store rows.
    pub fn compile(self, project: &ProjectId) -> Result<(Schema, SchemaSettings), SchemaError> {
        let name = self.name.trim().to_string();
        let mut sections = Vec::with_capacity(self.sections.len());
        for section in self.sections {
            let referenced_keys = engine::validate(&name, &section.template)?;
            sections.push(SchemaSection {
                kind: section.kind,
                template: section.template,
                referenced_keys,
            });
        }
        let s = self.settings;
        let settings = SchemaSettings {
            schema_name: name.clone(),
            project: project.clone(),
            processing_mode: s.processing_mode,
            is_agent: s.is_agent,
            multi_files_output: s.multi_files_output,
            override_files: s.override_files,
            input_extension: s.input_extension,
            purpose: s.purpose,
            visible_to_agent: s.visible_to_agent,
        };
        Ok((Schema { name, sections }, settings))
    }
}

/// Parse the built-in documents.
pub fn builtin_documents() -> Result<Vec<SchemaDocument>, SchemaError> {
    BUILTINS
        .iter()
        .map(|(origin, text)| SchemaDocument::from_yaml(origin, text))
        .collect()
}
