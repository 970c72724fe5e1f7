//! Store path helpers.
//!
//! Store paths are absolute, `/`-separated and never end with a slash
//! (except the root itself). A node's full path is `join(path, name)`.

/// The project root folder.
pub const ROOT: &str = "/";

/// Suffix carried by every bullet (pseudo-code) file.
pub const BULLET_SUFFIX: &str = ".pseudo";

/// Suffix of schema definition files.
pub const SCHEMA_SUFFIX: &str = ".schema.yaml";

/// Normalise a user- or model-supplied path.
///
/// Backslashes become `/`, empty and `.` segments are dropped, `..` pops.
pub fn normalize(raw: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in raw.split(['/', '\\']) {
        match segment.trim() {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Split a full path into `(parent, name)`. The root splits into `("/", "")`.
pub fn split(full: &str) -> (String, String) {
    let full = normalize(full);
    match full.rfind('/') {
        Some(0) => (ROOT.to_string(), full[1..].to_string()),
        Some(idx) => (full[..idx].to_string(), full[idx + 1..].to_string()),
        None => (ROOT.to_string(), full),
    }
}

/// Join a parent folder and a child name.
pub fn join(parent: &str, name: &str) -> String {
    normalize(&format!("{parent}/{name}"))
}

/// `true` when `path` is `folder` itself or lies beneath it.
pub fn is_within(path: &str, folder: &str) -> bool {
    if folder == ROOT {
        return true;
    }
    path == folder
        || path
            .strip_prefix(folder)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
}

/// Replace the `from` prefix of `path` with `to`. `None` if `path` is not
/// within `from`.
pub fn rebase(path: &str, from: &str, to: &str) -> Option<String> {
    if !is_within(path, from) {
        return None;
    }
    let rest = if from == ROOT { path } else { &path[from.len()..] };
    Some(normalize(&format!("{to}/{rest}")))
}

/// Folders from the top level down to `folder` itself, excluding the root.
pub fn ancestors(folder: &str) -> Vec<String> {
    let folder = normalize(folder);
    let mut out = Vec::new();
    let mut current = String::new();
    for segment in folder.split('/').filter(|s| !s.is_empty()) {
        current.push('/');
        current.push_str(segment);
        out.push(current.clone());
    }
    out
}

pub fn is_bullet_name(name: &str) -> bool {
    name.len() > BULLET_SUFFIX.len() && name.ends_with(BULLET_SUFFIX)
}

/// Name of the bullet file describing raw file `name`.
pub fn bullet_name(name: &str) -> String {
    if is_bullet_name(name) {
        name.to_string()
    } else {
        format!("{name}{BULLET_SUFFIX}")
    }
}

/// Name of the raw counterpart of bullet file `name`.
pub fn raw_name(name: &str) -> Option<&str> {
    if is_bullet_name(name) {
        name.strip_suffix(BULLET_SUFFIX)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_separators() {
        assert_eq!(normalize("lib//src\\main.dart"), "/lib/src/main.dart");
        assert_eq!(normalize("/lib/./a/../b/"), "/lib/b");
        assert_eq!(normalize(""), "/");
    }

    #[test]
    fn split_and_join_are_inverse() {
        assert_eq!(split("/lib/main.dart"), ("/lib".to_string(), "main.dart".to_string()));
        assert_eq!(split("/main.dart"), ("/".to_string(), "main.dart".to_string()));
        assert_eq!(join("/lib", "main.dart"), "/lib/main.dart");
        assert_eq!(join("/", "main.dart"), "/main.dart");
    }

    #[test]
    fn within_requires_segment_boundary() {
        assert!(is_within("/lib/a.dart", "/lib"));
        assert!(is_within("/lib", "/lib"));
        assert!(!is_within("/library/a.dart", "/lib"));
        assert!(is_within("/anything", "/"));
    }

    #[test]
    fn rebase_rewrites_prefix() {
        assert_eq!(rebase("/lib/src/a", "/lib", "/app").as_deref(), Some("/app/src/a"));
        assert_eq!(rebase("/lib", "/lib", "/app").as_deref(), Some("/app"));
        assert_eq!(rebase("/other", "/lib", "/app"), None);
    }

    #[test]
    fn ancestors_top_down() {
        assert_eq!(ancestors("/a/b/c"), vec!["/a", "/a/b", "/a/b/c"]);
        assert!(ancestors("/").is_empty());
    }

    #[test]
    fn bullet_names() {
        assert_eq!(bullet_name("main.dart"), "main.dart.pseudo");
        assert_eq!(bullet_name("main.dart.pseudo"), "main.dart.pseudo");
        assert_eq!(raw_name("main.dart.pseudo"), Some("main.dart"));
        assert_eq!(raw_name("main.dart"), None);
        assert!(!is_bullet_name(".pseudo"));
    }
}
