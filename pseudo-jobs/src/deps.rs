//! Transitive dependency closure over bullet files' `import X` lines.

use std::collections::{HashSet, VecDeque};

use pseudo_core::{path, FileId, FileNode, FileStore, ProjectId, StoreError};

/// Import targets named by `body`, in order.
pub fn imports_of(body: &str) -> Vec<&str> {
    body.lines()
        .filter_map(|line| line.trim().strip_prefix("import "))
        .map(|target| target.trim().trim_end_matches(';').trim_matches(|c| c == '\'' || c == '"'))
        .filter(|target| !target.is_empty())
        .collect()
}

/// The bullet file an import of `target` inside `from` refers to: first
/// relative to `from`'s folder, then from the project root.
fn resolve(
    files: &FileStore,
    project: &ProjectId,
    from: &FileNode,
    target: &str,
) -> Result<Option<FileNode>, StoreError> {
    let name = path::bullet_name(target);
    for candidate in [path::join(&from.path, &name), path::normalize(&name)] {
        if let Some(node) = files.find(project, &candidate)? {
            if node.is_bullet() && !node.to_delete {
                return Ok(Some(node));
            }
        }
    }
    Ok(None)
}

/// `roots` followed by every bullet file they import, transitively, without
/// duplicates. Unresolvable imports are ignored.
pub fn with_dependencies(
    files: &FileStore,
    project: &ProjectId,
    roots: &[FileId],
) -> Result<Vec<FileId>, StoreError> {
    let mut seen: HashSet<FileId> = HashSet::new();
    let mut out = Vec::new();
    let mut queue: VecDeque<FileId> = VecDeque::new();
    for id in roots {
        if seen.insert(*id) {
            out.push(*id);
            queue.push_back(*id);
        }
    }

    while let Some(id) = queue.pop_front() {
        let Some(node) = files.get(id)? else { continue };
        if !node.is_bullet() {
            continue;
        }
        let Some(content) = files.content(id)? else { continue };
        for target in imports_of(&content.body) {
            if let Some(dep) = resolve(files, project, &node, target)? {
                if seen.insert(dep.id) {
                    out.push(dep.id);
                    queue.push_back(dep.id);
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pseudo_core::ContentKind;

    fn proj() -> ProjectId {
        ProjectId::from("app")
    }

    fn bullet(store: &FileStore, path: &str, body: &str) -> FileId {
        store.write_file(&proj(), path, body, ContentKind::Bullet).unwrap()
    }

    #[test]
    fn import_lines_are_extracted() {
        assert_eq!(
            imports_of("import lib/a.dart\n- Purpose: x\n  import 'b.dart';\n"),
            vec!["lib/a.dart", "b.dart"]
        );
    }

    #[test]
    fn closure_follows_imports_transitively_and_stops_on_cycles() {
        let store = FileStore::new();
        let main = bullet(&store, "/lib/main.dart.pseudo", "import app.dart\n- main");
        let app = bullet(&store, "/lib/app.dart.pseudo", "import /core/db.dart\n- app");
        let db = bullet(&store, "/core/db.dart.pseudo", "import lib/main.dart\n- db");
        bullet(&store, "/lib/unused.dart.pseudo", "- unused");

        let ids = with_dependencies(&store, &proj(), &[main]).unwrap();
        assert_eq!(ids, vec![main, app, db]);
    }

    #[test]
    fn unresolved_imports_are_ignored() {
        let store = FileStore::new();
        let main = bullet(&store, "/main.py.pseudo", "import os\n- main");
        assert_eq!(with_dependencies(&store, &proj(), &[main]).unwrap(), vec![main]);
    }
}
