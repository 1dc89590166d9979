//! `dispatch-core`: shared building blocks for job intake.
//!
//! Holds the error taxonomy and the strongly-typed identifiers every other crate
//! in the workspace speaks. No I/O, no infrastructure concerns.

pub mod error;
pub mod id;

pub use error::{JobError, JobResult};
pub use id::{ExecutionId, JobId, ScenarioId, ScriptId};
