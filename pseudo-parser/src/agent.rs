//! Agent grammar: a plan of follow-up commands and file actions.
//!
//! ```text
//! Short free-text preamble, passed on to every command.
//!
//! action: move
//! - /lib/old.dart /lib/new.dart
//!
//! command: to-raw
//! path: /lib
//! files:
//! - new.dart
//! context: /lib/app.dart
//! instructions: Use the new router.
//! ```
//!
//! Parsing is lenient: lines that fit no block are recorded in
//! [`AgentResponse::skipped_lines`] and otherwise ignored.

use tracing::warn;

use pseudo_core::path;

/// A file-system change requested by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentAction {
    Move { from: String, to: String },
    Delete { path: String },
}

/// A follow-up job to run against another schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AgentCommand {
    /// Target schema name (or the reserved `update-schema`).
    pub schema: String,
    pub path: Option<String>,
    pub files: Vec<String>,
    /// Normalised to absolute bullet-file paths.
    pub context: Vec<String>,
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AgentResponse {
    /// Free text before the first block.
    pub preamble: String,
    pub commands: Vec<AgentCommand>,
    /// In reply order.
    pub actions: Vec<AgentAction>,
    pub skipped_lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Files,
    Context,
    Path,
    Instructions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    Move,
    Delete,
}

#[derive(Debug)]
enum Block {
    Preamble,
    Command(AgentCommand, Field),
    Action(ActionKind),
    /// After an unrecognised `action:`; swallows lines until the next header.
    Invalid,
}

/// Canonical context path: absolute, carrying the pseudo-file suffix.
pub fn normalize_context_path(entry: &str) -> String {
    let (parent, name) = path::split(entry.trim());
    path::join(&parent, &path::bullet_name(&name))
}

fn header(line: &str) -> Option<(String, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim().to_ascii_lowercase();
    match key.as_str() {
        "command" | "action" | "files" | "context" | "path" | "instructions" => {
            Some((key, value.trim()))
        }
        _ => None,
    }
}

fn push_entries(target: &mut Vec<String>, value: &str, normalize: bool) {
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        target.push(if normalize {
            normalize_context_path(entry)
        } else {
            entry.to_string()
        });
    }
}

fn push_text(target: &mut String, text: &str) {
    if !target.is_empty() {
        target.push('\n');
    }
    target.push_str(text);
}

struct Parser {
    out: AgentResponse,
    block: Block,
}

impl Parser {
    fn flush(&mut self) {
        if let Block::Command(mut command, _) = std::mem::replace(&mut self.block, Block::Invalid) {
            command.instructions = command.instructions.trim().to_string();
            self.out.commands.push(command);
        }
    }

    fn skip(&mut self, line: &str) {
        self.out.skipped_lines.push(line.to_string());
    }

    fn header_line(&mut self, key: &str, value: &str, line: &str) {
        match key {
            "command" => {
                self.flush();
                if value.is_empty() {
                    self.skip(line);
                    self.block = Block::Invalid;
                } else {
                    let command = AgentCommand {
                        schema: value.to_string(),
                        ..AgentCommand::default()
                    };
                    self.block = Block::Command(command, Field::None);
                }
            }
            "action" => {
                self.flush();
                self.block = match value.to_ascii_lowercase().as_str() {
                    "move" => Block::Action(ActionKind::Move),
                    "delete" => Block::Action(ActionKind::Delete),
                    _ => {
                        self.skip(line);
                        Block::Invalid
                    }
                };
            }
            field => {
                let Block::Command(command, current) = &mut self.block else {
                    self.out.skipped_lines.push(line.to_string());
                    return;
                };
                *current = match field {
                    "files" => {
                        push_entries(&mut command.files, value, false);
                        Field::Files
                    }
                    "context" => {
                        push_entries(&mut command.context, value, true);
                        Field::Context
                    }
                    "path" => {
                        if !value.is_empty() {
                            command.path = Some(path::normalize(value));
                        }
                        Field::Path
                    }
                    _ => {
                        push_text(&mut command.instructions, value);
                        Field::Instructions
                    }
                };
            }
        }
    }

    fn item_line(&mut self, item: &str, line: &str) {
        let skipped = &mut self.out.skipped_lines;
        match &mut self.block {
            Block::Command(command, Field::Files) => command.files.push(item.to_string()),
            Block::Command(command, Field::Context) => {
                command.context.push(normalize_context_path(item));
            }
            Block::Command(command, Field::Path) if command.path.is_none() => {
                command.path = Some(path::normalize(item));
            }
            Block::Command(command, Field::Instructions) => {
                push_text(&mut command.instructions, line.trim());
            }
            Block::Action(ActionKind::Move) => {
                let parts: Vec<&str> = item.split_whitespace().collect();
                match parts.as_slice() {
                    [from, to] => self.out.actions.push(AgentAction::Move {
                        from: path::normalize(from),
                        to: path::normalize(to),
                    }),
                    _ => skipped.push(line.to_string()),
                }
            }
            Block::Action(ActionKind::Delete) => self.out.actions.push(AgentAction::Delete {
                path: path::normalize(item),
            }),
            Block::Preamble => push_text(&mut self.out.preamble, line.trim()),
            _ => skipped.push(line.to_string()),
        }
    }

    fn text_line(&mut self, line: &str) {
        match &mut self.block {
            Block::Preamble => push_text(&mut self.out.preamble, line.trim()),
            Block::Command(command, Field::Instructions) => {
                push_text(&mut command.instructions, line.trim());
            }
            _ => self.out.skipped_lines.push(line.to_string()),
        }
    }
}

/// Parse an agent reply. Never fails; see [`AgentResponse::skipped_lines`].
pub fn parse_agent_response(payload: &str) -> AgentResponse {
    let text = payload.replace("\r\n", "\n").replace("**", "").replace('`', "");
    let mut parser = Parser {
        out: AgentResponse::default(),
        block: Block::Preamble,
    };

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some((key, value)) = header(trimmed) {
            parser.header_line(&key, value, line);
        } else if let Some(item) = trimmed.strip_prefix("- ") {
            parser.item_line(item.trim(), line);
        } else {
            parser.text_line(line);
        }
    }
    parser.flush();

    let mut out = parser.out;
    out.preamble = out.preamble.trim().to_string();
    if !out.skipped_lines.is_empty() {
        warn!(
            skipped = out.skipped_lines.len(),
            commands = out.commands.len(),
            actions = out.actions.len(),
            "agent reply had lines outside any block"
        );
    }
    out
}
