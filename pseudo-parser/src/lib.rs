//! Response parsers for `pseudo-parser`.
//!
//! Three line-oriented grammars turn model replies into structured output:
//!
//! - [`raw`]: fenced code blocks named by the header line above them
//! - [`bullet`]: pseudo-code files introduced by `FileName:` or `- Purpose:`
//! - [`agent`]: `command:` / `action:` blocks for follow-up work
//!
//! All three are lenient. Malformed sections are skipped rather than failing
//! the whole reply.

pub mod agent;
pub mod bullet;
pub mod raw;

pub use agent::{
    normalize_context_path, parse_agent_response, AgentAction, AgentCommand, AgentResponse,
};
pub use bullet::parse_bullet_files;
pub use raw::{extract_code, parse_raw_files};

/// One file recovered from a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFileContent {
    /// Relative or absolute path as written in the reply (leading `/` removed
    /// by the raw grammar; pseudo-file suffix appended by the bullet grammar).
    pub path: String,
    pub content: String,
    /// `- Imports:` entries of a bullet file. Empty for raw files.
    pub imports: Vec<String>,
}
