//! Template values: the key → nullable value map a schema is rendered with.

use pseudo_core::SchemaSettings;

use crate::engine::{self, Values};
use crate::error::SchemaError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateValues {
    values: Values,
}

impl TemplateValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values every prompt against `settings` starts from: `schema`, `mode`,
    /// `purpose` and `extension`.
    pub fn for_schema(settings: &SchemaSettings) -> Self {
        let mut values = Self::new();
        values
            .set("schema", &settings.schema_name)
            .set("mode", settings.processing_mode.to_string())
            .set("purpose", &settings.purpose)
            .set_opt("extension", settings.input_extension.clone());
        values
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.to_string(), Some(value.into()));
        self
    }

    /// Store `value`, recording an explicit null for `None`.
    pub fn set_opt(&mut self, key: &str, value: Option<String>) -> &mut Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_deref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn as_map(&self) -> &Values {
        &self.values
    }

    pub fn render(&self, template: &str) -> Result<String, SchemaError> {
        engine::render(template, &self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pseudo_core::{ProcessingMode, ProjectId};

    #[test]
    fn for_schema_seeds_settings_keys() {
        let settings = SchemaSettings {
            schema_name: "docs".into(),
            project: ProjectId::from("app"),
            processing_mode: ProcessingMode::PerFile,
            is_agent: false,
            multi_files_output: false,
            override_files: true,
            input_extension: None,
            purpose: "Write docs".into(),
            visible_to_agent: true,
        };
        let values = TemplateValues::for_schema(&settings);
        assert_eq!(values.get("mode"), Some("per_file"));
        assert_eq!(values.get("extension"), None);
        assert!(values.contains("extension"));
        assert_eq!(values.render("⟪schema⟫: ⟪purpose⟫").unwrap(), "docs: Write docs");
    }
}
