//! On-disk project registry.
//!
//! # Storage layout
//!
//! ```text
//! ~/.pseudo/
//!   config.yaml               (mode 0600, optional)
//!   projects/
//!     <project>/              (mode 0700)
//!       snapshot.json         (files + jobs, mode 0600)
//! ```
//!
//! # API pattern
//!
//! Every function that touches disk has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use crate::error::{io_err, StoreError};
use crate::snapshot::ProjectSnapshot;
use crate::types::ProjectId;

const SNAPSHOT_FILE: &str = "snapshot.json";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.pseudo/`. Pure, no I/O.
pub fn pseudo_root_at(home: &Path) -> PathBuf {
    home.join(".pseudo")
}

/// `<home>/.pseudo/projects/<project>/`. Pure, no I/O.
pub fn project_dir_at(home: &Path, project: &ProjectId) -> PathBuf {
    pseudo_root_at(home).join("projects").join(&project.0)
}

/// `<home>/.pseudo/projects/<project>/snapshot.json`. Pure, no I/O.
pub fn snapshot_path_at(home: &Path, project: &ProjectId) -> PathBuf {
    project_dir_at(home, project).join(SNAPSHOT_FILE)
}

/// Names of every project directory, sorted.
pub fn list_projects_at(home: &Path) -> Result<Vec<ProjectId>, StoreError> {
    let dir = pseudo_root_at(home).join("projects");
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut names: Vec<ProjectId> = std::fs::read_dir(&dir)
        .map_err(|e| io_err(&dir, e))?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| ProjectId::from(e.file_name().to_string_lossy().into_owned()))
        .collect();
    names.sort();
    Ok(names)
}

/// `list_projects_at` convenience wrapper.
pub fn list_projects() -> Result<Vec<ProjectId>, StoreError> {
    list_projects_at(&home()?)
}

// ---------------------------------------------------------------------------
// 2. Init
// ---------------------------------------------------------------------------

/// Create the project directory (mode `0700`) and an empty snapshot.
///
/// Idempotent: an existing snapshot is loaded and returned unchanged.
pub fn init_project_at(home: &Path, project: &ProjectId) -> Result<ProjectSnapshot, StoreError> {
    let dir = project_dir_at(home, project);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        set_dir_permissions(&dir)?;
    }
    if snapshot_path_at(home, project).exists() {
        return load_snapshot_at(home, project);
    }
    let snapshot = ProjectSnapshot::empty(project.clone());
    save_snapshot_at(home, &snapshot)?;
    Ok(snapshot)
}

/// `init_project_at` convenience wrapper.
pub fn init_project(project: &ProjectId) -> Result<ProjectSnapshot, StoreError> {
    init_project_at(&home()?, project)
}

// ---------------------------------------------------------------------------
// 3. Load / save
// ---------------------------------------------------------------------------

/// Load a project's snapshot.
///
/// Returns `StoreError::ProjectNotFound` if the project was never initialised,
/// `StoreError::SnapshotParse` (with path) if the JSON is malformed.
pub fn load_snapshot_at(home: &Path, project: &ProjectId) -> Result<ProjectSnapshot, StoreError> {
    let dir = project_dir_at(home, project);
    if !dir.exists() {
        return Err(StoreError::ProjectNotFound { path: dir });
    }
    let path = snapshot_path_at(home, project);
    if !path.exists() {
        return Ok(ProjectSnapshot::empty(project.clone()));
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_json::from_str(&contents).map_err(|e| StoreError::SnapshotParse { path, source: e })
}

/// `load_snapshot_at` convenience wrapper.
pub fn load_snapshot(project: &ProjectId) -> Result<ProjectSnapshot, StoreError> {
    load_snapshot_at(&home()?, project)
}

/// Atomically save a snapshot to `<home>/.pseudo/projects/<project>/snapshot.json`.
pub fn save_snapshot_at(home: &Path, snapshot: &ProjectSnapshot) -> Result<(), StoreError> {
    let dir = project_dir_at(home, &snapshot.project);
    if !dir.exists() {
        return Err(StoreError::ProjectNotFound { path: dir });
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    write_atomic(&snapshot_path_at(home, &snapshot.project), json.as_bytes())
}

/// `save_snapshot_at` convenience wrapper.
pub fn save_snapshot(snapshot: &ProjectSnapshot) -> Result<(), StoreError> {
    save_snapshot_at(&home()?, snapshot)
}

// ---------------------------------------------------------------------------
// Crate helpers
// ---------------------------------------------------------------------------

/// Write flow: bytes → `<name>.tmp` sibling → `chmod 0600` → `rename`.
/// The `.tmp` file lives next to the target so the rename never crosses
/// filesystems.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));
    std::fs::write(&tmp_path, bytes).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

pub(crate) fn home() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}

#[cfg(unix)]
pub(crate) fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
pub(crate) fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
