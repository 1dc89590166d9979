//! The execution job record (wire schema v1).
//!
//! A job is split in two sections that share one flat wire record:
//! - [`JobIdentity`] is written once by the producer (through
//!   [`ExecutionJobBuilder`](crate::builder::ExecutionJobBuilder)) and only read
//!   afterwards. There is no way to get it mutably from outside this crate.
//! - [`JobProgress`] is owned by whoever orchestrates retries and may be advanced
//!   freely.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dispatch_core::{ExecutionId, JobError, JobId, JobResult, ScenarioId, ScriptId};

use crate::config::{ExecutionConfig, Limits};
use crate::identity::{IdempotencyKey, ZERO_TIME_UNIX_SECONDS};

pub const JOB_SCHEMA_VERSION_V1: i64 = 1;

/// The only schema version this build accepts.
pub const SUPPORTED_SCHEMA_VERSION: i64 = JOB_SCHEMA_VERSION_V1;

/// Delivery priority (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Normal,
}

impl Priority {
    pub const ALL: [Priority; 2] = [Priority::High, Priority::Normal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
        }
    }
}

impl core::fmt::Display for Priority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            other => Err(JobError::invalid_priority(other)),
        }
    }
}

/// What caused the job to be submitted.
///
/// Open set: only emptiness is checked here. The well-known values are provided as
/// constants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerType(String);

impl TriggerType {
    pub const MANUAL: &'static str = "manual";
    pub const SCHEDULED: &'static str = "scheduled";
    pub const API: &'static str = "api";
    pub const CI_CD: &'static str = "ci-cd";
    pub const IMMEDIATE: &'static str = "immediate";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for TriggerType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TriggerType {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl core::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to the script artifact a job executes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptRef {
    #[serde(default)]
    pub script_id: ScriptId,
    #[serde(default)]
    pub version: i64,
    /// Content hash of the artifact; informational, not part of the identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl ScriptRef {
    pub fn new(script_id: ScriptId, version: i64) -> Self {
        Self {
            script_id,
            version,
            sha256: None,
        }
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }
}

/// Write-once section of a job.
///
/// Missing identifiers, strings and timestamps decode to their nil/empty/zero
/// values so that [`JobIdentity::validate_basic`] can name them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobIdentity {
    #[serde(rename = "job_schema_version", default)]
    pub(crate) schema_version: i64,

    #[serde(default)]
    pub(crate) job_id: JobId,
    #[serde(default)]
    pub(crate) execution_id: ExecutionId,

    #[serde(default)]
    pub(crate) tenant_id: String,

    /// W3C `traceparent` header, passed through untouched.
    #[serde(rename = "traceparent", default, skip_serializing_if = "Option::is_none")]
    pub(crate) trace_parent: Option<String>,

    #[serde(default)]
    pub(crate) idempotency_key: IdempotencyKey,

    #[serde(default)]
    pub(crate) trigger_type: TriggerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) scheduled_for: Option<DateTime<Utc>>,

    pub(crate) priority: Priority,

    #[serde(default)]
    pub(crate) script_ref: ScriptRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) scenario_id: Option<ScenarioId>,
    #[serde(default)]
    pub(crate) config: ExecutionConfig,
    #[serde(default, skip_serializing_if = "Limits::is_empty")]
    pub(crate) limits: Limits,

    #[serde(default)]
    pub(crate) created_at: DateTime<Utc>,
}

impl JobIdentity {
    pub fn schema_version(&self) -> i64 {
        self.schema_version
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn trace_parent(&self) -> Option<&str> {
        self.trace_parent.as_deref()
    }

    pub fn idempotency_key(&self) -> &IdempotencyKey {
        &self.idempotency_key
    }

    pub fn trigger_type(&self) -> &TriggerType {
        &self.trigger_type
    }

    pub fn scheduled_for(&self) -> Option<DateTime<Utc>> {
        self.scheduled_for
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn script_ref(&self) -> &ScriptRef {
        &self.script_ref
    }

    pub fn scenario_id(&self) -> Option<ScenarioId> {
        self.scenario_id
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Structural validation; reports the first violation.
    ///
    /// The schema version is checked before anything else is looked at.
    pub fn validate_basic(&self) -> JobResult<()> {
        check_schema_version(self.schema_version)?;
        if self.job_id.is_nil() {
            return Err(JobError::missing("job_id"));
        }
        if self.execution_id.is_nil() {
            return Err(JobError::missing("execution_id"));
        }
        if self.tenant_id.is_empty() {
            return Err(JobError::missing("tenant_id"));
        }
        if self.idempotency_key.is_empty() {
            return Err(JobError::missing("idempotency_key"));
        }
        if self.trigger_type.is_empty() {
            return Err(JobError::missing("trigger_type"));
        }
        if self.script_ref.script_id.is_nil() {
            return Err(JobError::missing("script_ref.script_id"));
        }
        if is_zero_timestamp(&self.created_at) {
            return Err(JobError::missing("created_at"));
        }
        Ok(())
    }
}

/// Retry progress, advanced by the consumer side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    #[serde(default)]
    pub attempt: u32,
    /// Zero means unbounded.
    #[serde(default)]
    pub max_attempts: u32,
    /// Hidden from consumers until this instant (delayed retry / backoff).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_visible_at: Option<DateTime<Utc>>,
}

impl JobProgress {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            next_visible_at: None,
        }
    }

    /// True once every allowed attempt has been used.
    pub fn is_exhausted(&self) -> bool {
        self.max_attempts != 0 && self.attempt >= self.max_attempts
    }

    /// True when the job may be handed to a consumer at `now`.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.next_visible_at.is_none_or(|at| at <= now)
    }
}

/// One unit of work submitted for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionJob {
    #[serde(flatten)]
    pub(crate) identity: JobIdentity,
    #[serde(flatten)]
    pub(crate) progress: JobProgress,
}

/// Fields read before the rest of a record is trusted.
#[derive(Deserialize)]
struct RecordHeader {
    #[serde(default)]
    job_schema_version: Option<i64>,
    #[serde(default)]
    priority: Option<String>,
}

impl ExecutionJob {
    pub fn identity(&self) -> &JobIdentity {
        &self.identity
    }

    pub fn progress(&self) -> &JobProgress {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut JobProgress {
        &mut self.progress
    }

    pub fn job_id(&self) -> JobId {
        self.identity.job_id
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.identity.execution_id
    }

    pub fn tenant_id(&self) -> &str {
        &self.identity.tenant_id
    }

    pub fn idempotency_key(&self) -> &IdempotencyKey {
        &self.identity.idempotency_key
    }

    pub fn priority(&self) -> Priority {
        self.identity.priority
    }

    pub fn validate_basic(&self) -> JobResult<()> {
        self.identity.validate_basic()
    }

    pub fn to_json(&self) -> JobResult<String> {
        serde_json::to_string(self).map_err(|e| JobError::codec(e.to_string()))
    }

    pub fn to_vec(&self) -> JobResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| JobError::codec(e.to_string()))
    }

    pub fn from_json(json: &str) -> JobResult<Self> {
        Self::from_slice(json.as_bytes())
    }

    /// Decode a wire record.
    ///
    /// The schema version is checked first and the priority second, so a record
    /// from an unknown schema is rejected as such instead of as a decode failure.
    /// The result is not validated; call [`ExecutionJob::validate_basic`].
    pub fn from_slice(bytes: &[u8]) -> JobResult<Self> {
        let header: RecordHeader =
            serde_json::from_slice(bytes).map_err(|e| JobError::codec(e.to_string()))?;
        check_schema_version(header.job_schema_version.unwrap_or_default())?;
        header
            .priority
            .ok_or(JobError::missing("priority"))?
            .parse::<Priority>()?;

        serde_json::from_slice(bytes).map_err(|e| JobError::codec(e.to_string()))
    }
}

fn check_schema_version(found: i64) -> JobResult<()> {
    if found == SUPPORTED_SCHEMA_VERSION {
        Ok(())
    } else {
        Err(JobError::UnsupportedSchemaVersion {
            found,
            supported: SUPPORTED_SCHEMA_VERSION,
        })
    }
}

/// Both the Unix epoch (the Rust default) and `0001-01-01T00:00:00Z` count as unset.
fn is_zero_timestamp(t: &DateTime<Utc>) -> bool {
    t.timestamp_subsec_nanos() == 0 && matches!(t.timestamp(), 0 | ZERO_TIME_UNIX_SECONDS)
}
