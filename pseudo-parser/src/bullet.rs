//! Bullet-file grammar: a reply describing one or more pseudo-code files.
//!
//! ```text
//! FileName: lib/main.dart
//! - Purpose: Entry point
//! - Imports:
//!   - lib/app.dart
//! - Functions:
//!   - main: runs the app
//! ```
//!
//! Files start at an explicit `FileName:` line, or at a `- Purpose:` header
//! whose preceding line names a file (`### lib/app.dart`).

use tracing::debug;

use pseudo_core::path;

use crate::ParsedFileContent;

#[derive(Debug, Default)]
struct Block {
    name: Option<String>,
    explicit: bool,
    body: Vec<String>,
    imports: Vec<String>,
}

impl Block {
    fn named(name: String, explicit: bool) -> Self {
        Self {
            name: Some(name),
            explicit,
            ..Self::default()
        }
    }

    /// The last non-empty body line, if it can name a file.
    fn name_candidate(&self) -> Option<(usize, String)> {
        let (idx, line) = self
            .body
            .iter()
            .enumerate()
            .rev()
            .find(|(_, l)| !l.trim().is_empty())?;
        if line.trim_start().starts_with('-') {
            return None;
        }
        let name = clean_name(line);
        if name.is_empty() {
            None
        } else {
            Some((idx, name))
        }
    }

    fn finish(self) -> Option<ParsedFileContent> {
        let Some(name) = self.name else {
            if !self.body.iter().all(|l| l.trim().is_empty()) {
                debug!(lines = self.body.len(), "bullet text without a file name dropped");
            }
            return None;
        };
        let first = self.body.iter().position(|l| has_latin(l));
        let last = self.body.iter().rposition(|l| has_latin(l));
        let body: &[String] = match (first, last) {
            (Some(f), Some(l)) => &self.body[f..=l],
            _ => &[],
        };
        if body.is_empty() && self.imports.is_empty() {
            return None;
        }

        let mut lines: Vec<String> = self.imports.iter().map(|i| format!("import {i}")).collect();
        lines.extend(body.iter().map(|l| strip_emphasis(l)));
        let mut content = lines.join("\n");
        content.push('\n');

        Some(ParsedFileContent {
            path: path::bullet_name(&name),
            content,
            imports: self.imports,
        })
    }
}

fn has_latin(line: &str) -> bool {
    line.chars().any(|c| c.is_ascii_alphabetic())
}

fn strip_emphasis(line: &str) -> String {
    line.replace("__", "").trim_end_matches('*').trim_end().to_string()
}

fn clean_name(line: &str) -> String {
    line.trim()
        .trim_start_matches('#')
        .trim()
        .trim_end_matches(':')
        .trim_matches(|c| c == '*' || c == '_')
        .trim()
        .trim_start_matches('/')
        .to_string()
}

fn looks_like_path(name: &str) -> bool {
    (name.contains('.') || name.contains('/')) && !name.contains(' ')
}

/// Case-insensitive `label` prefix match returning the rest of the line.
fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    if head.eq_ignore_ascii_case(label) {
        Some(&line[label.len()..])
    } else {
        None
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn push_import(imports: &mut Vec<String>, raw: &str) {
    let value = raw.trim().trim_start_matches("import ").trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return;
    }
    if !imports.iter().any(|i| i == value) {
        imports.push(value.to_string());
    }
}

/// Split a reply into bullet files. Names carry the pseudo-file suffix.
pub fn parse_bullet_files(payload: &str) -> Vec<ParsedFileContent> {
    let text = payload
        .replace("\r\n", "\n")
        .replace("**", "")
        .replace('`', "");

    let mut files = Vec::new();
    let mut current = Block::default();
    let mut imports_indent: Option<usize> = None;

    for line in text.lines() {
        let trimmed = line.trim();

        if let Some(indent) = imports_indent {
            if trimmed.is_empty() {
                continue;
            }
            if indent_of(line) > indent {
                if let Some(item) = trimmed.strip_prefix('-') {
                    push_import(&mut current.imports, item);
                    continue;
                }
            }
            imports_indent = None;
        }

        let label_line = trimmed.trim_start_matches('#').trim_start();
        if let Some(rest) = strip_label(label_line, "filename:") {
            files.extend(std::mem::take(&mut current).finish());
            current = Block::named(clean_name(rest), true);
            continue;
        }

        if let Some(rest) = strip_label(trimmed, "- imports:") {
            for item in rest.split(',') {
                push_import(&mut current.imports, item);
            }
            imports_indent = Some(indent_of(line));
            continue;
        }

        if strip_label(trimmed, "- purpose:").is_some() {
            if let Some((idx, name)) = current.name_candidate() {
                let differs = current.name.as_deref() != Some(name.as_str());
                if !current.explicit || (looks_like_path(&name) && differs) {
                    current.body.remove(idx);
                    files.extend(std::mem::take(&mut current).finish());
                    current = Block::named(name, false);
                }
            }
        }

        current.body.push(line.to_string());
    }
    files.extend(current.finish());
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_match_is_case_insensitive() {
        assert_eq!(strip_label("FILENAME: a", "filename:"), Some(" a"));
        assert_eq!(strip_label("file", "filename:"), None);
    }

    #[test]
    fn candidate_ignores_bullet_lines() {
        let block = Block {
            body: vec!["lib/a.dart".into(), "  - item".into()],
            ..Block::default()
        };
        assert!(block.name_candidate().is_none());
    }

    #[test]
    fn imports_none_dropped() {
        let files = parse_bullet_files("FileName: a.py\n- Imports: None\n- Purpose: A\n");
        assert_eq!(files.len(), 1);
        assert!(files[0].imports.is_empty());
        assert_eq!(files[0].content, "- Purpose: A\n");
    }
}
