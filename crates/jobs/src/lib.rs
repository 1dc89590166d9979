//! `dispatch-jobs`: job intake for the work-dispatch system.
//!
//! **Responsibility:** define the execution job record, derive its content-addressed
//! identity, and name the stream it belongs in.
//!
//! Everything here is pure and synchronous: no broker client, no clocks (callers
//! pass timestamps), no shared state. Sending, claiming, acknowledging and
//! retrying jobs belong to the broker and worker processes built on top.

pub mod builder;
pub mod config;
pub mod entry;
pub mod identity;
pub mod record;
pub mod settings;
pub mod topology;

pub use builder::{DEFAULT_MAX_ATTEMPTS, ExecutionJobBuilder};
pub use config::{AuthConfig, EnvironmentConfig, ExecutionConfig, Limits, LoadConfig, Stage};
pub use entry::StreamEntry;
pub use identity::{
    IdempotencyKey, UnscheduledIdentity, canonical_timestamp, compute_idempotency_key,
    deterministic_execution_id,
};
pub use record::{
    ExecutionJob, JOB_SCHEMA_VERSION_V1, JobIdentity, JobProgress, Priority,
    SUPPORTED_SCHEMA_VERSION, ScriptRef, TriggerType,
};
pub use settings::IntakeSettings;
pub use topology::{
    DELAYED_ZSET, DLQ_STREAM, NAMESPACE, STREAM_FIELD_ERROR, STREAM_FIELD_ERROR_TYPE,
    STREAM_FIELD_PAYLOAD, StreamTopology, Submission, WorkerPool, resolve_stream_name,
    stream_name,
};

pub use dispatch_core::{ExecutionId, JobError, JobId, JobResult, ScenarioId, ScriptId};
