//! Marker template engine.
//!
//! Templates are literal text with tokens wrapped in `⟪` … `⟫`:
//!
//! - `⟪key⟫` (no newline inside) is a placeholder, replaced by the key's value
//!   or the empty string.
//! - A token spanning several lines is a conditional block. Its first line is
//!   a condition (`file=main.dart and mode=single`), the rest is the body.
//!   The block closes at the first `⟫` that is not matched by an inner `⟪`
//!   and is followed by a line end or the end of input, so bodies may carry
//!   placeholders and stray `⟫` characters.
//!
//! Rendering is a pure function of `(template, values)`.

use std::collections::HashMap;

use crate::error::SchemaError;

pub const OPEN: char = '⟪';
pub const CLOSE: char = '⟫';

/// Keys a schema template may reference.
pub const KNOWN_KEYS: &[&str] = &[
    "prompt",
    "path",
    "file",
    "content",
    "context",
    "schema",
    "schemas",
    "bullet",
    "raw",
    "purpose",
    "extension",
    "mode",
    "imports",
];

pub type Values = HashMap<String, Option<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Placeholder(&'a str),
    Block { condition: &'a str, body: &'a str },
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

/// Byte offset (within `span`) of the `⟫` closing a conditional block.
fn block_end(span: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in span.char_indices() {
        if ch == OPEN {
            depth += 1;
        } else if ch == CLOSE {
            if depth > 0 {
                depth -= 1;
                continue;
            }
            let after = &span[idx + CLOSE.len_utf8()..];
            if after.is_empty() || after.starts_with('\n') || after.starts_with("\r\n") {
                return Some(idx);
            }
        }
    }
    None
}

fn tokenize(template: &str) -> Result<Vec<Token<'_>>, SchemaError> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while let Some(rel) = template[pos..].find(OPEN) {
        let open = pos + rel;
        if open > pos {
            tokens.push(Token::Text(&template[pos..open]));
        }
        let start = open + OPEN.len_utf8();
        let unterminated = || SchemaError::Unterminated {
            line: line_of(template, open),
        };
        let close = template[start..].find(CLOSE).ok_or_else(unterminated)?;
        let span = &template[start..start + close];

        if !span.contains('\n') {
            tokens.push(Token::Placeholder(span.trim()));
            pos = start + close + CLOSE.len_utf8();
            continue;
        }

        let end = block_end(&template[start..]).ok_or_else(unterminated)?;
        let inner = &template[start..start + end];
        let (condition, body) = match inner.find('\n') {
            Some(nl) => (&inner[..nl], &inner[nl..]),
            None => (inner, ""),
        };
        tokens.push(Token::Block { condition, body });
        pos = start + end + CLOSE.len_utf8();
    }
    if pos < template.len() {
        tokens.push(Token::Text(&template[pos..]));
    }
    Ok(tokens)
}

/// `(key, expected)` terms of a condition line. A bare `key` term has no
/// expected value and passes when the key is present and non-empty.
fn condition_terms(condition: &str) -> impl Iterator<Item = (&str, Option<&str>)> {
    condition
        .split(" and ")
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(|term| match term.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim())),
            None => (term, None),
        })
}

fn condition_holds(condition: &str, values: &Values) -> bool {
    condition_terms(condition).all(|(key, expected)| {
        let actual = values.get(key).and_then(|v| v.as_deref());
        match expected {
            Some(expected) => actual == Some(expected),
            None => actual.map(|v| !v.is_empty()).unwrap_or(false),
        }
    })
}

fn render_tokens(template: &str, values: &Values, out: &mut String) -> Result<(), SchemaError> {
    for token in tokenize(template)? {
        match token {
            Token::Text(text) => out.push_str(text),
            Token::Placeholder(key) => {
                if let Some(Some(value)) = values.get(key) {
                    out.push_str(value);
                }
            }
            Token::Block { condition, body } => {
                if condition_holds(condition, values) {
                    render_tokens(body, values, out)?;
                }
            }
        }
    }
    Ok(())
}

/// Render `template` against `values`. Output is trimmed, with `\r` removed.
pub fn render(template: &str, values: &Values) -> Result<String, SchemaError> {
    let mut out = String::with_capacity(template.len());
    render_tokens(template, values, &mut out)?;
    Ok(out.replace('\r', "").trim().to_string())
}

fn collect_keys(
    template: &str,
    placeholders: &mut Vec<String>,
    conditions: &mut Vec<String>,
) -> Result<(), SchemaError> {
    for token in tokenize(template)? {
        match token {
            Token::Text(_) => {}
            Token::Placeholder(key) => push_unique(placeholders, key),
            Token::Block { condition, body } => {
                for (key, _) in condition_terms(condition) {
                    push_unique(conditions, key);
                }
                collect_keys(body, placeholders, conditions)?;
            }
        }
    }
    Ok(())
}

fn push_unique(keys: &mut Vec<String>, key: &str) {
    if !keys.iter().any(|k| k == key) {
        keys.push(key.to_string());
    }
}

/// Placeholder keys of `template` in first-seen order, without duplicates.
/// Placeholders inside conditional bodies are included.
pub fn referenced_keys(template: &str) -> Result<Vec<String>, SchemaError> {
    let mut placeholders = Vec::new();
    let mut conditions = Vec::new();
    collect_keys(template, &mut placeholders, &mut conditions)?;
    Ok(placeholders)
}

/// Check every placeholder and condition key of `template` against
/// [`KNOWN_KEYS`] and return the placeholder keys.
pub fn validate(schema: &str, template: &str) -> Result<Vec<String>, SchemaError> {
    let mut placeholders = Vec::new();
    let mut conditions = Vec::new();
    collect_keys(template, &mut placeholders, &mut conditions)?;
    if let Some(key) = placeholders
        .iter()
        .chain(conditions.iter())
        .find(|k| !KNOWN_KEYS.contains(&k.as_str()))
    {
        return Err(SchemaError::UnknownKey {
            schema: schema.to_string(),
            key: key.clone(),
        });
    }
    Ok(placeholders)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn values(pairs: &[(&str, &str)]) -> Values {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect()
    }

    #[rstest]
    #[case("Hello ⟪prompt⟫!", &[("prompt", "world")], "Hello world!")]
    #[case("Hello ⟪prompt⟫!", &[], "Hello !")]
    #[case("⟪ path ⟫", &[("path", "/lib")], "/lib")]
    #[case("  padded\r\n", &[], "padded")]
    #[case("⟪file⟫ and ⟪file⟫", &[("file", "a")], "a and a")]
    fn placeholders(#[case] template: &str, #[case] pairs: &[(&str, &str)], #[case] expected: &str) {
        assert_eq!(render(template, &values(pairs)).unwrap(), expected);
    }

    #[test]
    fn null_value_renders_empty() {
        let mut map = Values::new();
        map.insert("prompt".into(), None);
        assert_eq!(render("[⟪prompt⟫]", &map).unwrap(), "[]");
    }

    #[test]
    fn block_suppressed_when_condition_fails() {
        let tpl = "⟪prompt⟫⟪file=a and schema=b\nX⟫";
        assert_eq!(render(tpl, &values(&[("prompt", "P")])).unwrap(), "P");
        assert_eq!(
            render(tpl, &values(&[("prompt", "P"), ("file", "a"), ("schema", "c")])).unwrap(),
            "P"
        );
    }

    #[test]
    fn block_emitted_when_all_terms_match() {
        let tpl = "⟪prompt⟫⟪file=a and schema=b\nX⟫";
        let map = values(&[("prompt", "P"), ("file", "a"), ("schema", "b")]);
        assert_eq!(render(tpl, &map).unwrap(), "P\nX");
    }

    #[test]
    fn block_body_resolves_placeholders() {
        let tpl = "⟪mode=single\nTarget: ⟪file⟫\n⟫\ntail";
        let map = values(&[("mode", "single"), ("file", "main.dart")]);
        assert_eq!(render(tpl, &map).unwrap(), "Target: main.dart\n\ntail");
    }

    #[test]
    fn block_body_may_contain_close_marker_mid_line() {
        let tpl = "⟪mode=x\nkeep ⟫ this\n⟫";
        assert_eq!(render(tpl, &values(&[("mode", "x")])).unwrap(), "keep ⟫ this");
    }

    #[test]
    fn bare_key_condition_checks_presence() {
        let tpl = "⟪file\nhas file⟫";
        assert_eq!(render(tpl, &values(&[("file", "a")])).unwrap(), "has file");
        assert_eq!(render(tpl, &values(&[("file", "")])).unwrap(), "");
        assert_eq!(render(tpl, &values(&[])).unwrap(), "");
    }

    #[test]
    fn unterminated_block_is_error() {
        let err = render("intro\n⟪mode=x\nbody ⟫ never closes", &values(&[])).unwrap_err();
        assert!(matches!(err, SchemaError::Unterminated { line: 2 }), "got: {err}");
    }

    #[test]
    fn unterminated_placeholder_is_error() {
        assert!(render("⟪prompt", &values(&[])).is_err());
    }

    #[test]
    fn rerender_is_idempotent() {
        let map = values(&[("prompt", "P"), ("path", "/lib")]);
        let once = render("⟪prompt⟫ in ⟪path⟫", &map).unwrap();
        assert_eq!(render(&once, &map).unwrap(), once);
    }

    #[test]
    fn referenced_keys_in_order_without_duplicates() {
        let keys = referenced_keys("⟪prompt⟫ ⟪file⟫ ⟪prompt⟫\n⟪mode=x\n⟪content⟫⟫").unwrap();
        assert_eq!(keys, vec!["prompt", "file", "content"]);
    }

    #[test]
    fn validate_rejects_unknown_placeholder_and_condition_keys() {
        assert!(matches!(
            validate("s", "⟪secret⟫").unwrap_err(),
            SchemaError::UnknownKey { key, .. } if key == "secret"
        ));
        assert!(matches!(
            validate("s", "⟪colour=red\nx⟫").unwrap_err(),
            SchemaError::UnknownKey { key, .. } if key == "colour"
        ));
        assert_eq!(validate("s", "⟪prompt⟫").unwrap(), vec!["prompt"]);
    }
}
