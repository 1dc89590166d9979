//! Field/value records appended to streams.
//!
//! Work streams carry a single `payload` field. Failure records written back by
//! consumers (typically to the dead-letter stream) add `error` and `error_type`.

use std::collections::HashMap;

use dispatch_core::{JobError, JobResult};

use crate::record::ExecutionJob;
use crate::topology::{STREAM_FIELD_ERROR, STREAM_FIELD_ERROR_TYPE, STREAM_FIELD_PAYLOAD};

/// Ordered field/value pairs for one stream entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    fields: Vec<(&'static str, String)>,
}

impl StreamEntry {
    /// Entry carrying a serialized job.
    pub fn job(job: &ExecutionJob) -> JobResult<Self> {
        Ok(Self {
            fields: vec![(STREAM_FIELD_PAYLOAD, job.to_json()?)],
        })
    }

    /// Failure record: the original payload plus what went wrong.
    pub fn dead_letter(
        payload: impl Into<String>,
        error: impl Into<String>,
        error_type: impl Into<String>,
    ) -> Self {
        Self {
            fields: vec![
                (STREAM_FIELD_PAYLOAD, payload.into()),
                (STREAM_FIELD_ERROR, error.into()),
                (STREAM_FIELD_ERROR_TYPE, error_type.into()),
            ],
        }
    }

    /// Failure record for a payload this layer rejected.
    pub fn rejected(payload: impl Into<String>, error: &JobError) -> Self {
        Self::dead_letter(payload, error.to_string(), error.kind())
    }

    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value.as_str())
    }

    /// Decode the job carried by an entry read back from a stream.
    ///
    /// Only the `payload` field is looked at; the job is decoded but not validated.
    pub fn decode_job(fields: &HashMap<String, String>) -> JobResult<ExecutionJob> {
        let payload = fields
            .get(STREAM_FIELD_PAYLOAD)
            .ok_or(JobError::missing(STREAM_FIELD_PAYLOAD))?;
        ExecutionJob::from_json(payload)
    }
}
