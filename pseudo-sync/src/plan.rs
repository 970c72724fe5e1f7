//! Pairing bullet files with their raw siblings and classifying drift.
//!
//! Every live bullet file `name.pseudo` is paired with the live file `name`
//! in the same folder. Content hashes decide which side is stale:
//!
//! | Condition                                   | Set                      |
//! |---------------------------------------------|--------------------------|
//! | no raw sibling                              | `raw_needing_creation`   |
//! | `raw.sync_hash != bullet.content_hash`      | `raw_needing_update`     |
//! | `bullet.sync_hash != raw.content_hash`      | `bullets_needing_update` |
//!
//! A pair matching both update rows (both sides edited) lands in
//! `raw_needing_update`. The sets are disjoint.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use pseudo_core::{path, FileId, FileNode, FileStore, ProcessingMode, ProjectId};

use crate::error::SyncError;

/// Which side of a pair gets regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Regenerate bullet files from raw code (`sync_bullets`).
    BulletsFromRaw,
    /// Regenerate raw code from bullet files (`sync_raw`).
    RawFromBullets,
}

impl Direction {
    pub fn for_mode(mode: ProcessingMode) -> Option<Self> {
        match mode {
            ProcessingMode::SyncBullets => Some(Direction::BulletsFromRaw),
            ProcessingMode::SyncRaw => Some(Direction::RawFromBullets),
            ProcessingMode::Single | ProcessingMode::PerFile => None,
        }
    }
}

/// A bullet file and its raw sibling, if one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPair {
    pub bullet: FileNode,
    pub raw: Option<FileNode>,
}

impl SyncPair {
    /// Full path of the raw sibling, existing or not.
    pub fn raw_path(&self) -> String {
        let stem = self.bullet.stem().unwrap_or(&self.bullet.name);
        path::join(&self.bullet.path, stem)
    }

    pub fn raw_id(&self) -> Option<FileId> {
        self.raw.as_ref().map(|r| r.id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Only consider bullets at or below this folder.
    pub prefix: Option<String>,
    /// Treat every paired row as stale in this direction.
    pub force: Option<Direction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SyncSummary {
    pub bullets_needing_update: usize,
    pub raw_needing_creation: usize,
    pub raw_needing_update: usize,
    pub in_sync: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub bullets_needing_update: Vec<SyncPair>,
    pub raw_needing_creation: Vec<SyncPair>,
    pub raw_needing_update: Vec<SyncPair>,
    pub in_sync: usize,
}

impl SyncPlan {
    pub fn summary(&self) -> SyncSummary {
        SyncSummary {
            bullets_needing_update: self.bullets_needing_update.len(),
            raw_needing_creation: self.raw_needing_creation.len(),
            raw_needing_update: self.raw_needing_update.len(),
            in_sync: self.in_sync,
        }
    }

    /// Pairs a job regenerating in `direction` has to process.
    pub fn pairs_for(&self, direction: Direction) -> Vec<SyncPair> {
        match direction {
            Direction::BulletsFromRaw => self.bullets_needing_update.clone(),
            Direction::RawFromBullets => self
                .raw_needing_creation
                .iter()
                .chain(self.raw_needing_update.iter())
                .cloned()
                .collect(),
        }
    }
}

/// Pair every live bullet file of `project` with its raw sibling.
pub fn pairs(files: &FileStore, project: &ProjectId, prefix: Option<&str>) -> Result<Vec<SyncPair>, SyncError> {
    let live = files.live_files(project)?;
    let by_path: HashMap<String, &FileNode> = live.iter().map(|n| (n.full_path(), n)).collect();
    let prefix = prefix.map(path::normalize);

    let mut out = Vec::new();
    for bullet in live.iter().filter(|n| n.is_bullet()) {
        if let Some(prefix) = &prefix {
            if !path::is_within(&bullet.full_path(), prefix) {
                continue;
            }
        }
        let Some(stem) = bullet.stem() else { continue };
        let raw = by_path.get(&path::join(&bullet.path, stem)).map(|n| (*n).clone());
        out.push(SyncPair {
            bullet: bullet.clone(),
            raw,
        });
    }
    Ok(out)
}

/// Classify every pair of `project` into the three drift sets.
pub fn plan(files: &FileStore, project: &ProjectId, options: &PlanOptions) -> Result<SyncPlan, SyncError> {
    let mut plan = SyncPlan::default();
    for pair in pairs(files, project, options.prefix.as_deref())? {
        let Some(raw) = &pair.raw else {
            plan.raw_needing_creation.push(pair);
            continue;
        };
        let raw_stale = raw.sync_hash != pair.bullet.content_hash;
        let bullet_stale = pair.bullet.sync_hash != raw.content_hash;
        match (options.force, raw_stale, bullet_stale) {
            (Some(Direction::RawFromBullets), _, _) | (None, true, _) => {
                plan.raw_needing_update.push(pair)
            }
            (Some(Direction::BulletsFromRaw), _, _) | (None, false, true) => {
                plan.bullets_needing_update.push(pair)
            }
            (None, false, false) => plan.in_sync += 1,
        }
    }
    debug!(project = %project, summary = ?plan.summary(), "sync plan");
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pseudo_core::ContentKind;

    fn proj() -> ProjectId {
        ProjectId::from("app")
    }

    fn write(store: &FileStore, path: &str, body: &str) -> FileId {
        store
            .write_file(&proj(), path, body, ContentKind::for_name(path))
            .unwrap()
    }

    #[test]
    fn raw_path_strips_suffix() {
        let store = FileStore::new();
        write(&store, "/lib/a.dart.pseudo", "- a");
        let pairs = pairs(&store, &proj(), None).unwrap();
        assert_eq!(pairs[0].raw_path(), "/lib/a.dart");
        assert!(pairs[0].raw.is_none());
    }

    #[test]
    fn prefix_limits_pairs() {
        let store = FileStore::new();
        write(&store, "/lib/a.dart.pseudo", "- a");
        write(&store, "/test/b.dart.pseudo", "- b");
        assert_eq!(pairs(&store, &proj(), Some("/lib")).unwrap().len(), 1);
        assert_eq!(pairs(&store, &proj(), None).unwrap().len(), 2);
    }

    #[test]
    fn direction_for_mode() {
        assert_eq!(Direction::for_mode(ProcessingMode::SyncRaw), Some(Direction::RawFromBullets));
        assert_eq!(Direction::for_mode(ProcessingMode::PerFile), None);
    }
}
