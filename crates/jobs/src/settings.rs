//! Intake settings supplied by the embedding process.
//!
//! Where the values come from (file, environment, flags) is up to the process;
//! this only defines the shape and the defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::builder::{DEFAULT_MAX_ATTEMPTS, ExecutionJobBuilder};
use crate::identity::UnscheduledIdentity;
use crate::record::{ExecutionJob, ScriptRef, TriggerType};
use crate::topology::{NAMESPACE, StreamTopology};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeSettings {
    /// Prefix of every channel name.
    pub namespace: String,
    /// Identity timestamp for jobs without `scheduled_for`.
    pub unscheduled_identity: UnscheduledIdentity,
    pub default_max_attempts: u32,
}

impl Default for IntakeSettings {
    fn default() -> Self {
        Self {
            namespace: NAMESPACE.to_string(),
            unscheduled_identity: UnscheduledIdentity::default(),
            default_max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl IntakeSettings {
    pub fn topology(&self) -> StreamTopology {
        StreamTopology::new(self.namespace.clone())
    }

    /// Builder pre-loaded with these settings.
    pub fn builder(
        &self,
        tenant_id: impl Into<String>,
        script_ref: ScriptRef,
        trigger_type: impl Into<TriggerType>,
        created_at: DateTime<Utc>,
    ) -> ExecutionJobBuilder {
        ExecutionJob::builder(tenant_id, script_ref, trigger_type, created_at)
            .unscheduled_identity(self.unscheduled_identity)
            .max_attempts(self.default_max_attempts)
    }
}
