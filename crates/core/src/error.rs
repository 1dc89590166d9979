//! Job rejection model.

use thiserror::Error;

/// Result type used across job intake.
pub type JobResult<T> = Result<T, JobError>;

/// Reason a single job (or routing request) was rejected.
///
/// Every variant is local to one job: none of them is fatal to the process, and the
/// core never retries or logs on the caller's behalf. Messages name the offending
/// field or value so an operator can act on them directly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The record was written for a schema version this build does not understand.
    ///
    /// Not retryable until the producer or consumer is migrated.
    #[error("unsupported job_schema_version: {found} (supported: {supported})")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },

    /// A required field was absent, empty, nil or zero.
    #[error("{0} is required")]
    MissingRequiredField(&'static str),

    /// Worker pool outside the closed set.
    #[error("invalid worker pool: {0:?}")]
    InvalidPool(String),

    /// Priority outside the closed set.
    #[error("invalid priority: {0:?}")]
    InvalidPriority(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The wire record could not be encoded or decoded.
    #[error("malformed job record: {0}")]
    Codec(String),
}

impl JobError {
    pub fn missing(field: &'static str) -> Self {
        Self::MissingRequiredField(field)
    }

    pub fn invalid_pool(value: impl Into<String>) -> Self {
        Self::InvalidPool(value.into())
    }

    pub fn invalid_priority(value: impl Into<String>) -> Self {
        Self::InvalidPriority(value.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    /// Stable tag written to the `error_type` field of failure records.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::UnsupportedSchemaVersion { .. } => "unsupported_schema_version",
            JobError::MissingRequiredField(_) => "missing_required_field",
            JobError::InvalidPool(_) => "invalid_pool",
            JobError::InvalidPriority(_) => "invalid_priority",
            JobError::InvalidId(_) => "invalid_id",
            JobError::Codec(_) => "codec",
        }
    }

    /// Whether resubmitting the same job unchanged could succeed.
    ///
    /// Always `false`: each variant describes the job itself, so it needs a fix
    /// (or a schema migration) before it is sent again.
    pub fn is_retryable(&self) -> bool {
        match self {
            JobError::UnsupportedSchemaVersion { .. }
            | JobError::MissingRequiredField(_)
            | JobError::InvalidPool(_)
            | JobError::InvalidPriority(_)
            | JobError::InvalidId(_)
            | JobError::Codec(_) => false,
        }
    }
}
