//! Committing one regenerated side of a pair back into the file store.
//!
//! Each call is independent: re-running it with the same input re-derives the
//! same target, so a failed sibling never needs to be rolled back.

use tracing::info;

use pseudo_core::{path, ContentKind, FileId, FileNode, FileStore};

use crate::error::SyncError;

fn live(files: &FileStore, id: FileId) -> Result<FileNode, SyncError> {
    match files.get(id)? {
        Some(node) if node.is_file && !node.to_delete => Ok(node),
        _ => Err(SyncError::MissingCounterpart(id)),
    }
}

/// Write regenerated raw code for `bullet`.
///
/// With `raw == None` the raw sibling is created next to the bullet file;
/// otherwise the existing file is updated in place. Both sides are then
/// marked reconciled. Returns the raw file id.
pub fn apply_raw(
    files: &FileStore,
    bullet: FileId,
    raw: Option<FileId>,
    code: &str,
) -> Result<FileId, SyncError> {
    let bullet_node = live(files, bullet)?;
    let raw_id = match raw {
        Some(id) => {
            live(files, id)?;
            files.update_content(id, code)?;
            id
        }
        None => {
            let stem = bullet_node
                .stem()
                .ok_or(SyncError::MissingCounterpart(bullet))?;
            let full = path::join(&bullet_node.path, stem);
            files.write_file(&bullet_node.project, &full, code, ContentKind::Raw)?
        }
    };
    files.mark_synced(bullet, raw_id)?;
    info!(
        bullet = %bullet_node.full_path(),
        created = raw.is_none(),
        "raw file regenerated"
    );
    Ok(raw_id)
}

/// Write regenerated bullet text for `bullet` from its existing raw sibling.
pub fn apply_bullets(
    files: &FileStore,
    bullet: FileId,
    raw: FileId,
    text: &str,
) -> Result<(), SyncError> {
    let bullet_node = live(files, bullet)?;
    live(files, raw)?;
    files.update_content(bullet, text)?;
    files.mark_synced(bullet, raw)?;
    info!(bullet = %bullet_node.full_path(), "bullet file regenerated");
    Ok(())
}
