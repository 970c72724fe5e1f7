//! Error types for pseudo-schema.

use thiserror::Error;

use pseudo_core::StoreError;

/// All errors that can arise from template rendering and schema loading.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A `⟪` with no acceptable `⟫` before end of input.
    #[error("unterminated template token starting on line {line}")]
    Unterminated { line: usize },

    /// A template references a key outside the known-key allow-list.
    #[error("schema '{schema}' references unknown key '{key}'")]
    UnknownKey { schema: String, key: String },

    /// Schema YAML failed to parse.
    #[error("invalid schema document {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("schema document {origin} has an empty name")]
    MissingName { origin: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
