//! Job orchestration: claim a queued job, build its prompt, call the model
//! and apply the reply back to the project.
//!
//! Dispatch follows the job's schema settings: agent schemas produce
//! follow-up jobs and file actions, `single` schemas apply one reply,
//! `per_file` and the two sync modes fan out one sub-task per file or pair.

mod agent;
pub mod deps;
mod error;
mod fanout;
pub mod model;
mod orchestrator;
mod runner;
mod single;

pub use agent::UPDATE_SCHEMA;
pub use error::{JobError, ModelError};
pub use model::{CommandModel, ModelClient, ScriptedModel};
pub use orchestrator::{JobOutcome, Orchestrator};
pub use runner::{run_until_idle, RunSummary};
