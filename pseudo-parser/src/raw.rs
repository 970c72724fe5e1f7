//! Raw-file grammar: fenced code blocks, each named by the header line
//! above it.
//!
//! ````text
//! ### lib/main.dart:
//! ```dart
//! void main() {}
//! ```
//! ````

use crate::ParsedFileContent;

const FENCE: &str = "```";

/// Split a reply into the files its fenced blocks carry, in source order.
///
/// Blocks whose name cannot be determined are skipped.
pub fn parse_raw_files(payload: &str) -> Vec<ParsedFileContent> {
    let text = payload.replace("\r\n", "\n");
    let segments: Vec<&str> = text.split(FENCE).collect();
    let mut files = Vec::new();
    for idx in (1..segments.len()).step_by(2) {
        let Some(name) = file_name_from(segments[idx - 1]) else {
            continue;
        };
        files.push(ParsedFileContent {
            path: name,
            content: block_body(segments[idx]),
            imports: Vec::new(),
        });
    }
    files
}

/// Code of the first fenced block of `reply`, or the whole reply when it has
/// no fence. The result always ends with a newline.
pub fn extract_code(reply: &str) -> String {
    let text = reply.replace("\r\n", "\n");
    let mut segments = text.split(FENCE);
    segments.next();
    match segments.next() {
        Some(block) => block_body(block),
        None => with_trailing_newline(text.trim().to_string()),
    }
}

/// Drop the fence's language line and enforce a trailing newline.
fn block_body(segment: &str) -> String {
    let body = match segment.find('\n') {
        Some(nl) => &segment[nl + 1..],
        None => "",
    };
    with_trailing_newline(body.to_string())
}

fn with_trailing_newline(mut body: String) -> String {
    if !body.ends_with('\n') {
        body.push('\n');
    }
    body
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '/' | '\\' | '_' | '-')
}

fn score(token: &str) -> u8 {
    u8::from(token.contains('.')) + u8::from(token.contains('/') || token.contains('\\'))
}

/// File name carried by the text preceding a code block: the most path-like
/// token of the last `#` header line, else of the last non-empty line.
fn file_name_from(preceding: &str) -> Option<String> {
    let line = preceding
        .lines()
        .rev()
        .find(|l| l.contains('#'))
        .or_else(|| preceding.lines().rev().find(|l| !l.trim().is_empty()))?;
    let stripped = line.replace('#', "");
    let stripped = stripped.trim().trim_end_matches(':').trim();

    let mut best: Option<(&str, u8)> = None;
    for token in stripped.split(|c: char| !is_token_char(c)).filter(|t| !t.is_empty()) {
        let s = score(token);
        if best.map(|(_, b)| s > b).unwrap_or(true) {
            best = Some((token, s));
        }
    }
    let name = best.map(|(t, _)| t).unwrap_or(stripped);
    let name = name.trim_start_matches('/').trim_end_matches(':');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
