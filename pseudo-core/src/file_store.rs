//! Hierarchical, path/name-addressed file store.
//!
//! Nodes are unique on `(project, path, name)`. Writing a file materialises
//! every ancestor folder eagerly. Deletion is two-phase: nodes are first
//! marked `to_delete`, then removed by [`FileStore::sweep_deleted`].
//!
//! All operations take a short internal lock and never block on I/O, so the
//! store can be shared between worker tasks behind an `Arc`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::hash::content_hash;
use crate::path;
use crate::types::{Content, ContentKind, FileId, FileNode, ProjectId};

/// One persisted row: a node plus its content, if it is a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub node: FileNode,
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Default)]
struct FileTable {
    next_id: u64,
    nodes: BTreeMap<FileId, FileNode>,
    contents: HashMap<FileId, Content>,
    index: HashMap<(ProjectId, String), FileId>,
}

impl FileTable {
    fn lookup(&self, project: &ProjectId, full: &str) -> Option<FileId> {
        self.index.get(&(project.clone(), full.to_string())).copied()
    }

    fn insert_node(&mut self, project: &ProjectId, parent: &str, name: &str, is_file: bool) -> FileId {
        self.next_id += 1;
        let id = FileId(self.next_id);
        let node = FileNode {
            id,
            project: project.clone(),
            path: parent.to_string(),
            name: name.to_string(),
            is_file,
            size_bytes: 0,
            content_hash: None,
            sync_hash: None,
            to_delete: false,
        };
        self.index.insert((project.clone(), node.full_path()), id);
        self.nodes.insert(id, node);
        id
    }

    /// Create every missing folder down to `folder`; revive marked ones.
    fn ensure_folders(&mut self, project: &ProjectId, folder: &str) -> Result<(), StoreError> {
        for ancestor in path::ancestors(folder) {
            match self.lookup(project, &ancestor) {
                Some(id) => {
                    if let Some(node) = self.nodes.get_mut(&id) {
                        if node.is_file {
                            return Err(StoreError::AlreadyExists { path: ancestor });
                        }
                        node.to_delete = false;
                    }
                }
                None => {
                    let (parent, name) = path::split(&ancestor);
                    self.insert_node(project, &parent, &name, false);
                }
            }
        }
        Ok(())
    }

    fn set_content(&mut self, id: FileId, body: &str, kind: ContentKind) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.size_bytes = body.len() as u64;
            node.content_hash = Some(content_hash(body));
            node.to_delete = false;
        }
        self.contents.insert(
            id,
            Content {
                file_id: id,
                body: body.to_string(),
                kind,
            },
        );
    }

    fn subtree(&self, project: &ProjectId, root_id: FileId, root_full: &str) -> Vec<FileId> {
        self.nodes
            .values()
            .filter(|n| {
                &n.project == project && (n.id == root_id || path::is_within(&n.path, root_full))
            })
            .map(|n| n.id)
            .collect()
    }

    fn remove(&mut self, id: FileId) {
        if let Some(node) = self.nodes.remove(&id) {
            self.index.remove(&(node.project.clone(), node.full_path()));
        }
        self.contents.remove(&id);
    }
}

/// Thread-safe in-memory file store.
#[derive(Debug, Default)]
pub struct FileStore {
    inner: Mutex<FileTable>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, FileTable>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned("file store"))
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Create or replace the file at `full_path`, recomputing its content hash.
    pub fn write_file(
        &self,
        project: &ProjectId,
        full_path: &str,
        body: &str,
        kind: ContentKind,
    ) -> Result<FileId, StoreError> {
        let full = path::normalize(full_path);
        let (parent, name) = path::split(&full);
        if name.is_empty() {
            return Err(StoreError::InvalidPath(full_path.to_string()));
        }

        let mut table = self.lock()?;
        table.ensure_folders(project, &parent)?;
        let id = match table.lookup(project, &full) {
            Some(id) => {
                let is_file = table.nodes.get(&id).map(|n| n.is_file).unwrap_or(false);
                if !is_file {
                    return Err(StoreError::NotAFile { path: full });
                }
                id
            }
            None => table.insert_node(project, &parent, &name, true),
        };
        table.set_content(id, body, kind);
        Ok(id)
    }

    /// Replace the body of an existing file, keeping its content kind.
    pub fn update_content(&self, id: FileId, body: &str) -> Result<FileNode, StoreError> {
        let mut table = self.lock()?;
        let node = table.nodes.get(&id).ok_or(StoreError::UnknownFile(id))?;
        if !node.is_file {
            return Err(StoreError::NotAFile {
                path: node.full_path(),
            });
        }
        let kind = table
            .contents
            .get(&id)
            .map(|c| c.kind)
            .unwrap_or_else(|| ContentKind::for_name(&node.name));
        table.set_content(id, body, kind);
        table.nodes.get(&id).cloned().ok_or(StoreError::UnknownFile(id))
    }

    /// Create a folder (and its ancestors). Idempotent.
    pub fn create_folder(&self, project: &ProjectId, full_path: &str) -> Result<FileId, StoreError> {
        let full = path::normalize(full_path);
        if full == path::ROOT {
            return Err(StoreError::InvalidPath(full_path.to_string()));
        }
        let mut table = self.lock()?;
        table.ensure_folders(project, &full)?;
        table
            .lookup(project, &full)
            .ok_or(StoreError::FileNotFound(full))
    }

    /// Record that a bullet/raw pair is reconciled: each side's sync hash
    /// becomes the other side's current content hash.
    pub fn mark_synced(&self, bullet: FileId, raw: FileId) -> Result<(), StoreError> {
        let mut table = self.lock()?;
        let bullet_hash = table
            .nodes
            .get(&bullet)
            .ok_or(StoreError::UnknownFile(bullet))?
            .content_hash
            .clone();
        let raw_hash = table
            .nodes
            .get(&raw)
            .ok_or(StoreError::UnknownFile(raw))?
            .content_hash
            .clone();
        if let Some(node) = table.nodes.get_mut(&bullet) {
            node.sync_hash = raw_hash;
        }
        if let Some(node) = table.nodes.get_mut(&raw) {
            node.sync_hash = bullet_hash;
        }
        Ok(())
    }

    /// Move or rename a node. Moving a folder rewrites every descendant's
    /// path prefix. Returns the number of rows touched.
    pub fn move_path(&self, project: &ProjectId, from: &str, to: &str) -> Result<usize, StoreError> {
        let from = path::normalize(from);
        let to = path::normalize(to);
        if from == path::ROOT || to == path::ROOT || (to != from && path::is_within(&to, &from)) {
            return Err(StoreError::InvalidPath(to));
        }
        if from == to {
            return Ok(0);
        }

        let mut table = self.lock()?;
        let id = table
            .lookup(project, &from)
            .ok_or_else(|| StoreError::FileNotFound(from.clone()))?;
        if table.lookup(project, &to).is_some() {
            return Err(StoreError::AlreadyExists { path: to });
        }
        let (to_parent, to_name) = path::split(&to);
        table.ensure_folders(project, &to_parent)?;

        let affected = table.subtree(project, id, &from);
        for node_id in &affected {
            let Some(old_full) = table.nodes.get(node_id).map(FileNode::full_path) else {
                continue;
            };
            table.index.remove(&(project.clone(), old_full));
            if let Some(node) = table.nodes.get_mut(node_id) {
                if *node_id == id {
                    node.path = to_parent.clone();
                    node.name = to_name.clone();
                } else if let Some(rebased) = path::rebase(&node.path, &from, &to) {
                    node.path = rebased;
                }
            }
            if let Some(new_full) = table.nodes.get(node_id).map(FileNode::full_path) {
                table.index.insert((project.clone(), new_full), *node_id);
            }
        }
        Ok(affected.len())
    }

    /// Soft-delete a node and everything beneath it.
    pub fn mark_to_delete(&self, project: &ProjectId, full_path: &str) -> Result<usize, StoreError> {
        let full = path::normalize(full_path);
        let mut table = self.lock()?;
        let id = table
            .lookup(project, &full)
            .ok_or_else(|| StoreError::FileNotFound(full.clone()))?;
        let affected = table.subtree(project, id, &full);
        for node_id in &affected {
            if let Some(node) = table.nodes.get_mut(node_id) {
                node.to_delete = true;
            }
        }
        Ok(affected.len())
    }

    /// Hard-delete every node of `project` marked `to_delete`.
    pub fn sweep_deleted(&self, project: &ProjectId) -> Result<usize, StoreError> {
        let mut table = self.lock()?;
        let doomed: Vec<FileId> = table
            .nodes
            .values()
            .filter(|n| &n.project == project && n.to_delete)
            .map(|n| n.id)
            .collect();
        for id in &doomed {
            table.remove(*id);
        }
        Ok(doomed.len())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn get(&self, id: FileId) -> Result<Option<FileNode>, StoreError> {
        Ok(self.lock()?.nodes.get(&id).cloned())
    }

    pub fn find(&self, project: &ProjectId, full_path: &str) -> Result<Option<FileNode>, StoreError> {
        let full = path::normalize(full_path);
        let table = self.lock()?;
        Ok(table
            .lookup(project, &full)
            .and_then(|id| table.nodes.get(&id).cloned()))
    }

    pub fn content(&self, id: FileId) -> Result<Option<Content>, StoreError> {
        Ok(self.lock()?.contents.get(&id).cloned())
    }

    /// Batch fetch by id, in input order. Unknown ids and folders are skipped.
    pub fn contents(&self, ids: &[FileId]) -> Result<Vec<(FileNode, Content)>, StoreError> {
        let table = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                let node = table.nodes.get(id)?;
                let content = table.contents.get(id)?;
                Some((node.clone(), content.clone()))
            })
            .collect())
    }

    /// Live files at or below `folder`, optionally filtered by name suffix,
    /// sorted by full path.
    pub fn files_under(
        &self,
        project: &ProjectId,
        folder: &str,
        extension: Option<&str>,
    ) -> Result<Vec<FileNode>, StoreError> {
        let folder = path::normalize(folder);
        let table = self.lock()?;
        let mut files: Vec<FileNode> = table
            .nodes
            .values()
            .filter(|n| {
                &n.project == project
                    && n.is_file
                    && !n.to_delete
                    && path::is_within(&n.path, &folder)
                    && extension.map(|ext| n.name.ends_with(ext)).unwrap_or(true)
            })
            .cloned()
            .collect();
        files.sort_by_key(FileNode::full_path);
        Ok(files)
    }

    /// Every live file of `project`.
    pub fn live_files(&self, project: &ProjectId) -> Result<Vec<FileNode>, StoreError> {
        self.files_under(project, path::ROOT, None)
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// All rows of `project`, including soft-deleted ones.
    pub fn snapshot(&self, project: &ProjectId) -> Result<Vec<StoredFile>, StoreError> {
        let table = self.lock()?;
        Ok(table
            .nodes
            .values()
            .filter(|n| &n.project == project)
            .map(|n| StoredFile {
                node: n.clone(),
                content: table.contents.get(&n.id).cloned(),
            })
            .collect())
    }

    /// Replace every row of `project` with `rows`, keeping their ids.
    pub fn restore(&self, project: &ProjectId, rows: Vec<StoredFile>) -> Result<(), StoreError> {
        let mut table = self.lock()?;
        let existing: Vec<FileId> = table
            .nodes
            .values()
            .filter(|n| &n.project == project)
            .map(|n| n.id)
            .collect();
        for id in existing {
            table.remove(id);
        }
        for row in rows {
            let id = row.node.id;
            table.next_id = table.next_id.max(id.0);
            table
                .index
                .insert((project.clone(), row.node.full_path()), id);
            table.nodes.insert(
                id,
                FileNode {
                    project: project.clone(),
                    ..row.node
                },
            );
            if let Some(content) = row.content {
                table.contents.insert(id, content);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn proj() -> ProjectId {
        ProjectId::from("app")
    }

    #[test]
    fn write_materializes_ancestors() {
        let store = FileStore::new();
        store
            .write_file(&proj(), "/lib/src/main.dart", "void main() {}", ContentKind::Raw)
            .expect("write");

        let lib = store.find(&proj(), "/lib").unwrap().expect("lib folder");
        assert!(!lib.is_file);
        let src = store.find(&proj(), "/lib/src").unwrap().expect("src folder");
        assert_eq!(src.path, "/lib");
        let file = store.find(&proj(), "/lib/src/main.dart").unwrap().expect("file");
        assert_eq!(file.size_bytes, 14);
        assert_eq!(file.content_hash, Some(content_hash("void main() {}")));
    }

    #[test]
    fn rewrite_keeps_id_and_updates_hash() {
        let store = FileStore::new();
        let a = store.write_file(&proj(), "/a.txt", "one", ContentKind::Raw).unwrap();
        let b = store.write_file(&proj(), "/a.txt", "two", ContentKind::Raw).unwrap();
        assert_eq!(a, b);
        let node = store.get(a).unwrap().unwrap();
        assert_eq!(node.content_hash, Some(content_hash("two")));
        assert_eq!(store.content(a).unwrap().unwrap().body, "two");
    }

    #[test]
    fn writing_over_folder_is_rejected() {
        let store = FileStore::new();
        store.create_folder(&proj(), "/lib").unwrap();
        let err = store
            .write_file(&proj(), "/lib", "x", ContentKind::Raw)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotAFile { .. }));
    }

    #[test]
    fn same_path_in_two_projects_is_distinct() {
        let store = FileStore::new();
        let a = store.write_file(&proj(), "/a.txt", "a", ContentKind::Raw).unwrap();
        let b = store
            .write_file(&ProjectId::from("other"), "/a.txt", "b", ContentKind::Raw)
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(store.live_files(&proj()).unwrap().len(), 1);
    }

    #[test]
    fn contents_preserves_order_and_skips_unknown() {
        let store = FileStore::new();
        let a = store.write_file(&proj(), "/a", "A", ContentKind::Raw).unwrap();
        let b = store.write_file(&proj(), "/b", "B", ContentKind::Raw).unwrap();
        let rows = store.contents(&[b, FileId(999), a]).unwrap();
        let bodies: Vec<_> = rows.iter().map(|(_, c)| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["B", "A"]);
    }

    #[test]
    fn mark_synced_cross_assigns_hashes() {
        let store = FileStore::new();
        let bullet = store
            .write_file(&proj(), "/m.dart.pseudo", "- main", ContentKind::Bullet)
            .unwrap();
        let raw = store
            .write_file(&proj(), "/m.dart", "void main() {}", ContentKind::Raw)
            .unwrap();
        store.mark_synced(bullet, raw).unwrap();
        let b = store.get(bullet).unwrap().unwrap();
        let r = store.get(raw).unwrap().unwrap();
        assert_eq!(b.sync_hash, r.content_hash);
        assert_eq!(r.sync_hash, b.content_hash);
    }
}
