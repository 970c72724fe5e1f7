//! Per-project schema rows.
//!
//! Schemas are immutable for the duration of a run. A refresh replaces every
//! row of a project wholesale.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard};

use crate::error::StoreError;
use crate::types::{ProjectId, Schema, SchemaSettings};

#[derive(Debug, Clone, Default)]
struct ProjectSchemas {
    schemas: BTreeMap<String, Schema>,
    settings: BTreeMap<String, SchemaSettings>,
}

#[derive(Debug, Default)]
pub struct SchemaStore {
    inner: RwLock<HashMap<ProjectId, ProjectSchemas>>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<ProjectId, ProjectSchemas>>, StoreError> {
        self.inner.read().map_err(|_| StoreError::Poisoned("schema store"))
    }

    /// Drop every schema of `project` and load `rows` in their place.
    pub fn replace_project(
        &self,
        project: &ProjectId,
        rows: Vec<(Schema, SchemaSettings)>,
    ) -> Result<(), StoreError> {
        let mut fresh = ProjectSchemas::default();
        for (schema, settings) in rows {
            let settings = SchemaSettings {
                schema_name: schema.name.clone(),
                project: project.clone(),
                ..settings
            };
            fresh.settings.insert(schema.name.clone(), settings);
            fresh.schemas.insert(schema.name.clone(), schema);
        }
        let mut guard = self
            .inner
            .write()
            .map_err(|_| StoreError::Poisoned("schema store"))?;
        guard.insert(project.clone(), fresh);
        Ok(())
    }

    pub fn schema(&self, project: &ProjectId, name: &str) -> Result<Option<Schema>, StoreError> {
        Ok(self
            .read()?
            .get(project)
            .and_then(|p| p.schemas.get(name).cloned()))
    }

    pub fn settings(&self, project: &ProjectId, name: &str) -> Result<Option<SchemaSettings>, StoreError> {
        Ok(self
            .read()?
            .get(project)
            .and_then(|p| p.settings.get(name).cloned()))
    }

    /// Settings of every schema of `project`, sorted by name.
    pub fn list(&self, project: &ProjectId) -> Result<Vec<SchemaSettings>, StoreError> {
        Ok(self
            .read()?
            .get(project)
            .map(|p| p.settings.values().cloned().collect())
            .unwrap_or_default())
    }

    /// Schemas an agent may delegate to.
    pub fn visible_to_agent(&self, project: &ProjectId) -> Result<Vec<SchemaSettings>, StoreError> {
        let mut all = self.list(project)?;
        all.retain(|s| s.visible_to_agent);
        Ok(all)
    }
}
