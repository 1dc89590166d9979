//! Stream topology: where a job is published, parked and delayed.
//!
//! Producers and consumers agree on these names byte for byte, with no registry
//! lookup in between:
//!
//! - **Work streams**: `<namespace>:jobs:<pool>:<priority>`, one per worker pool and
//!   priority. Pools have disjoint resource profiles (a slow browser job must not
//!   starve API jobs), so each pool reads its own streams with its own consumer group.
//! - **Dead-letter stream**: `<namespace>:jobs:dlq`, shared, for terminally failed jobs.
//! - **Delayed set**: `<namespace>:jobs:delayed`, an ordered set keyed by
//!   `next_visible_at`; an external mover re-injects due jobs into their work stream.
//!
//! Unknown pools or priorities are rejected, never mapped to a default stream.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use dispatch_core::{ExecutionId, JobError, JobResult};

use crate::config::ExecutionConfig;
use crate::entry::StreamEntry;
use crate::record::{ExecutionJob, Priority};

/// Namespace shared by every channel name.
pub const NAMESPACE: &str = "synthetic";

/// Dead-letter stream for jobs that exhausted retries or failed irrecoverably.
pub const DLQ_STREAM: &str = "synthetic:jobs:dlq";

/// Ordered set holding jobs until their `next_visible_at` elapses.
pub const DELAYED_ZSET: &str = "synthetic:jobs:delayed";

/// Field carrying the serialized job.
pub const STREAM_FIELD_PAYLOAD: &str = "payload";
/// Field carrying a human-readable failure message.
pub const STREAM_FIELD_ERROR: &str = "error";
/// Field carrying the machine-readable failure kind.
pub const STREAM_FIELD_ERROR_TYPE: &str = "error_type";

/// Worker category with its own resource profile and streams (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerPool {
    /// Plain HTTP/API load.
    Api,
    /// Browser automation.
    Browser,
}

impl WorkerPool {
    pub const ALL: [WorkerPool; 2] = [WorkerPool::Api, WorkerPool::Browser];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerPool::Api => "api",
            WorkerPool::Browser => "browser",
        }
    }

    /// Pool able to run a job with this configuration.
    pub fn for_config(config: &ExecutionConfig) -> Self {
        if config.browser_enabled {
            WorkerPool::Browser
        } else {
            WorkerPool::Api
        }
    }
}

impl core::fmt::Display for WorkerPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerPool {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(WorkerPool::Api),
            "browser" => Ok(WorkerPool::Browser),
            other => Err(JobError::invalid_pool(other)),
        }
    }
}

/// Work stream for a pool and priority in the default namespace.
pub fn stream_name(pool: WorkerPool, priority: Priority) -> String {
    StreamTopology::default().stream(pool, priority)
}

/// Resolve untyped routing input in the default namespace.
pub fn resolve_stream_name(pool: &str, priority: &str) -> JobResult<String> {
    StreamTopology::default().resolve(pool, priority)
}

/// Channel names under one namespace.
///
/// The default namespace is [`NAMESPACE`]; other namespaces exist so isolated
/// environments (tests, staging) can share a broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTopology {
    namespace: String,
}

impl Default for StreamTopology {
    fn default() -> Self {
        Self::new(NAMESPACE)
    }
}

impl StreamTopology {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn stream(&self, pool: WorkerPool, priority: Priority) -> String {
        format!("{}:jobs:{pool}:{priority}", self.namespace)
    }

    /// Resolve untyped routing input; the pool is checked before the priority.
    pub fn resolve(&self, pool: &str, priority: &str) -> JobResult<String> {
        let pool = pool.parse::<WorkerPool>()?;
        let priority = priority.parse::<Priority>()?;
        Ok(self.stream(pool, priority))
    }

    pub fn dead_letter(&self) -> String {
        format!("{}:jobs:dlq", self.namespace)
    }

    pub fn delayed(&self) -> String {
        format!("{}:jobs:delayed", self.namespace)
    }

    /// Every work stream, pool-major, for provisioning consumer groups.
    pub fn all_streams(&self) -> Vec<String> {
        WorkerPool::ALL
            .iter()
            .flat_map(|pool| Priority::ALL.iter().map(move |priority| (*pool, *priority)))
            .map(|(pool, priority)| self.stream(pool, priority))
            .collect()
    }

    /// Validate a job and pair it with its destination stream.
    ///
    /// The result is what the broker client appends; nothing is sent from here.
    #[instrument(
        level = "trace",
        skip(self, job),
        fields(execution_id = %job.execution_id(), priority = %job.priority()),
        err(level = "trace")
    )]
    pub fn prepare(&self, job: &ExecutionJob, pool: WorkerPool) -> JobResult<Submission> {
        job.validate_basic()?;
        let stream = self.stream(pool, job.priority());
        let entry = StreamEntry::job(job)?;
        trace!(%stream, "job routed");
        Ok(Submission {
            stream,
            execution_id: job.execution_id(),
            entry,
        })
    }
}

/// A validated job ready to be appended to a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    stream: String,
    execution_id: ExecutionId,
    entry: StreamEntry,
}

impl Submission {
    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    pub fn entry(&self) -> &StreamEntry {
        &self.entry
    }

    pub fn into_parts(self) -> (String, StreamEntry) {
        (self.stream, self.entry)
    }
}
