//! # pseudo-schema
//!
//! Prompt schemas: the `⟪ ⟫` marker template engine, the YAML documents
//! schemas are written in, and the builder that turns a schema plus values
//! into ordered model messages.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pseudo_schema::{render, TemplateValues};
//!
//! let values = TemplateValues::new().with("prompt", "P");
//! let text = render("⟪prompt⟫⟪file=a\nX⟫", values.as_map());
//! assert_eq!(text.ok().as_deref(), Some("P"));
//! ```

pub mod catalog;
pub mod context;
pub mod definition;
pub mod engine;
pub mod error;
pub mod prompt;

pub use catalog::{refresh, RefreshReport};
pub use context::TemplateValues;
pub use definition::{SchemaDocument, SCHEMA_EDITOR};
pub use engine::{referenced_keys, render, KNOWN_KEYS};
pub use error::SchemaError;
pub use prompt::{build_messages, context_digest, ContextFile};
