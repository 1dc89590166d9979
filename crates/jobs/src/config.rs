//! Execution configuration and resource limits carried on a job.
//!
//! These payloads are opaque to routing and identity: they travel with the job so
//! the worker can run it, and nothing here feeds the idempotency key.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a job should be executed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    /// Free-form script variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub load_config: LoadConfig,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub override_vars: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub dry_run: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub script_type: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub browser_enabled: bool,
}

/// Target environment the script talks to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "AuthConfig::is_empty")]
    pub auth_config: AuthConfig,
    /// Request timeout in seconds; zero means unset.
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub timeout: u32,
}

/// Credentials for the target environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key_header: String,
}

impl AuthConfig {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Load shape: virtual users, duration, ramp stages, iteration or arrival rate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub vus: u32,
    /// Duration string as understood by the runner (e.g. `"30s"`, `"5m"`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub duration: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<Stage>,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub iterations: u32,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub rate: u32,
}

/// One ramp stage: reach `target` VUs over `duration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub duration: String,
    pub target: u32,
}

/// Resource and time ceilings for one execution.
///
/// Every field is a hint. Zero means unset and is never replaced with a default
/// here; the worker decides what "unset" means for its sandbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub timeout_seconds: u32,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub max_vus: u32,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub max_duration_seconds: u32,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub memory_mb: u32,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub cpu_millicores: u32,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub max_log_bytes: u64,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub max_artifact_bytes: u64,
}

impl Limits {
    /// True when no ceiling is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn timeout(&self) -> Option<Duration> {
        non_zero_secs(self.timeout_seconds)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        non_zero_secs(self.max_duration_seconds)
    }
}

fn non_zero_secs(secs: u32) -> Option<Duration> {
    (secs != 0).then(|| Duration::from_secs(u64::from(secs)))
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}
