//! Loading a project's schemas into the [`SchemaStore`].

use std::collections::BTreeMap;

use tracing::{info, warn};

use pseudo_core::path::SCHEMA_SUFFIX;
use pseudo_core::{FileStore, ProjectId, Schema, SchemaSettings, SchemaStore};

use crate::definition::{builtin_documents, SchemaDocument};
use crate::error::SchemaError;

/// Outcome of a schema refresh.
#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Names now in the store, sorted.
    pub loaded: Vec<String>,
    /// Schema files that failed to parse or validate, by full path.
    pub rejected: Vec<(String, SchemaError)>,
}

/// Compile the built-in schemas plus every live `*.schema.yaml` file of
/// `project`. Project files override built-ins of the same name; a bad file
/// is reported and skipped.
pub fn load_project_schemas(
    files: &FileStore,
    project: &ProjectId,
) -> Result<(Vec<(Schema, SchemaSettings)>, Vec<(String, SchemaError)>), SchemaError> {
    let mut rows: BTreeMap<String, (Schema, SchemaSettings)> = BTreeMap::new();
    for doc in builtin_documents()? {
        let (schema, settings) = doc.compile(project)?;
        rows.insert(schema.name.clone(), (schema, settings));
    }

    let mut rejected = Vec::new();
    let nodes = files.files_under(project, pseudo_core::path::ROOT, Some(SCHEMA_SUFFIX))?;
    let ids: Vec<_> = nodes.iter().map(|n| n.id).collect();
    for (node, content) in files.contents(&ids)? {
        let origin = node.full_path();
        match SchemaDocument::from_yaml(&origin, &content.body).and_then(|d| d.compile(project)) {
            Ok((schema, settings)) => {
                rows.insert(schema.name.clone(), (schema, settings));
            }
            Err(e) => rejected.push((origin, e)),
        }
    }
    Ok((rows.into_values().collect(), rejected))
}

/// Replace `project`'s rows in `schemas` with a fresh load.
pub fn refresh(
    files: &FileStore,
    schemas: &SchemaStore,
    project: &ProjectId,
) -> Result<RefreshReport, SchemaError> {
    let (rows, rejected) = load_project_schemas(files, project)?;
    for (origin, err) in &rejected {
        warn!(project = %project, file = %origin, error = %err, "schema rejected");
    }
    let loaded: Vec<String> = rows.iter().map(|(s, _)| s.name.clone()).collect();
    schemas.replace_project(project, rows)?;
    info!(project = %project, count = loaded.len(), "schemas refreshed");
    Ok(RefreshReport { loaded, rejected })
}
