//! # pseudo-sync
//!
//! Drift detection between bullet files and their raw siblings, plus the
//! helpers that commit regenerated content and move projects to and from disk.
//!
//! - [`plan`] classifies every pair of a project into three disjoint sets.
//! - [`seed_job`] queues a sync job for the stale pairs of one direction.
//! - [`apply_raw`] / [`apply_bullets`] commit one regenerated side.
//! - [`export_project`] / [`import_dir`] mirror a project on disk.

pub mod apply;
pub mod error;
pub mod plan;
pub mod seed;
pub mod writer;

pub use apply::{apply_bullets, apply_raw};
pub use error::SyncError;
pub use plan::{pairs, plan, Direction, PlanOptions, SyncPair, SyncPlan, SyncSummary};
pub use seed::{direction_of, seed_job};
pub use writer::{atomic_write, export_project, import_dir, ImportReport, WriteResult};
