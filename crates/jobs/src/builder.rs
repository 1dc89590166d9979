//! Producer-side construction of execution jobs.

use chrono::{DateTime, Utc};
use tracing::{instrument, trace};

use dispatch_core::{ExecutionId, JobId, JobResult, ScenarioId};

use crate::config::{ExecutionConfig, Limits};
use crate::identity::{UnscheduledIdentity, compute_idempotency_key, deterministic_execution_id};
use crate::record::{
    ExecutionJob, JOB_SCHEMA_VERSION_V1, JobIdentity, JobProgress, Priority, ScriptRef,
    TriggerType,
};

/// Attempts allowed when the producer does not say otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Builds a validated [`ExecutionJob`].
///
/// The idempotency key is always computed here; the execution id is derived from it
/// unless one is supplied explicitly.
#[derive(Debug, Clone)]
pub struct ExecutionJobBuilder {
    tenant_id: String,
    script_ref: ScriptRef,
    trigger_type: TriggerType,
    created_at: DateTime<Utc>,
    job_id: Option<JobId>,
    execution_id: Option<ExecutionId>,
    trace_parent: Option<String>,
    scheduled_for: Option<DateTime<Utc>>,
    priority: Priority,
    max_attempts: u32,
    scenario_id: Option<ScenarioId>,
    config: ExecutionConfig,
    limits: Limits,
    unscheduled: UnscheduledIdentity,
}

impl ExecutionJob {
    pub fn builder(
        tenant_id: impl Into<String>,
        script_ref: ScriptRef,
        trigger_type: impl Into<TriggerType>,
        created_at: DateTime<Utc>,
    ) -> ExecutionJobBuilder {
        ExecutionJobBuilder {
            tenant_id: tenant_id.into(),
            script_ref,
            trigger_type: trigger_type.into(),
            created_at,
            job_id: None,
            execution_id: None,
            trace_parent: None,
            scheduled_for: None,
            priority: Priority::Normal,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            scenario_id: None,
            config: ExecutionConfig::default(),
            limits: Limits::default(),
            unscheduled: UnscheduledIdentity::default(),
        }
    }
}

impl ExecutionJobBuilder {
    /// Reuse an existing logical job id (otherwise a fresh one is generated).
    pub fn job_id(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    /// Pin the execution id instead of deriving it from the idempotency key.
    pub fn execution_id(mut self, execution_id: ExecutionId) -> Self {
        self.execution_id = Some(execution_id);
        self
    }

    pub fn trace_parent(mut self, trace_parent: impl Into<String>) -> Self {
        self.trace_parent = Some(trace_parent.into());
        self
    }

    /// Accepts any offset; the instant is stored and hashed in UTC.
    pub fn scheduled_for<Tz: chrono::TimeZone>(mut self, at: DateTime<Tz>) -> Self {
        self.scheduled_for = Some(at.with_timezone(&Utc));
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn scenario_id(mut self, scenario_id: ScenarioId) -> Self {
        self.scenario_id = Some(scenario_id);
        self
    }

    pub fn config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Identity timestamp policy when no `scheduled_for` is given.
    pub fn unscheduled_identity(mut self, policy: UnscheduledIdentity) -> Self {
        self.unscheduled = policy;
        self
    }

    /// Derive identity, assemble the job and validate it.
    #[instrument(
        level = "trace",
        skip_all,
        fields(tenant_id = %self.tenant_id, trigger_type = %self.trigger_type),
        err(level = "trace")
    )]
    pub fn build(self) -> JobResult<ExecutionJob> {
        let identity_at = self.unscheduled.resolve(self.scheduled_for, self.created_at)?;
        let idempotency_key = compute_idempotency_key(
            &self.tenant_id,
            &self.script_ref,
            &identity_at,
            self.trigger_type.as_str(),
        );
        let execution_id = match self.execution_id {
            Some(id) => id,
            None => deterministic_execution_id(&idempotency_key),
        };
        let job_id = self.job_id.unwrap_or_else(JobId::new);

        trace!(
            %job_id,
            %execution_id,
            idempotency_key = %idempotency_key,
            derived = self.execution_id.is_none(),
            "job identity resolved"
        );

        let job = ExecutionJob {
            identity: JobIdentity {
                schema_version: JOB_SCHEMA_VERSION_V1,
                job_id,
                execution_id,
                tenant_id: self.tenant_id,
                trace_parent: self.trace_parent,
                idempotency_key,
                trigger_type: self.trigger_type,
                scheduled_for: self.scheduled_for,
                priority: self.priority,
                script_ref: self.script_ref,
                scenario_id: self.scenario_id,
                config: self.config,
                limits: self.limits,
                created_at: self.created_at,
            },
            progress: JobProgress::new(self.max_attempts),
        };
        job.validate_basic()?;
        Ok(job)
    }
}
