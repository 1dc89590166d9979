//! Content-addressed job identity.
//!
//! Duplicate submissions of the same logical request (producer retries, scheduler
//! re-fires, at-least-once upstream delivery) must land on the same execution.
//! Instead of asking a central allocator for an id, every producer hashes the same
//! five inputs and gets the same key, and from the key the same `execution_id`.
//!
//! The byte layout hashed here is a cross-implementation contract: producers written
//! in other languages compute the same digest, so any change to field order,
//! separator or timestamp rendering silently breaks deduplication.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use dispatch_core::{ExecutionId, JobError, JobResult};

use crate::record::ScriptRef;

/// Separator between hashed fields; NUL cannot appear in any of them, so
/// `"ab" + "c"` and `"a" + "bc"` never collide.
const FIELD_SEPARATOR: [u8; 1] = [0];

/// Unix seconds of `0001-01-01T00:00:00Z`, the zero time other implementations emit.
pub(crate) const ZERO_TIME_UNIX_SECONDS: i64 = -62_135_596_800;

/// Namespace for name-based execution ids (the standard OID namespace).
pub const EXECUTION_ID_NAMESPACE: Uuid = Uuid::NAMESPACE_OID;

/// Lowercase hex SHA-256 fingerprint of a logical execution request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Wrap a key received from elsewhere (e.g. supplied by an upstream producer).
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the idempotency key for a logical execution.
///
/// Hashes, NUL-separated and in this order: tenant id, script id (lowercase
/// hyphenated), script version (base 10), `scheduled_for` in UTC
/// (see [`canonical_timestamp`]), trigger type. No other field takes part.
///
/// Pure and total; the inputs are not validated.
pub fn compute_idempotency_key<Tz: TimeZone>(
    tenant_id: &str,
    script_ref: &ScriptRef,
    scheduled_for: &DateTime<Tz>,
    trigger_type: &str,
) -> IdempotencyKey {
    let mut hasher = Sha256::new();
    hasher.update(tenant_id.as_bytes());
    hasher.update(FIELD_SEPARATOR);
    hasher.update(script_ref.script_id.to_string().as_bytes());
    hasher.update(FIELD_SEPARATOR);
    hasher.update(script_ref.version.to_string().as_bytes());
    hasher.update(FIELD_SEPARATOR);
    hasher.update(canonical_timestamp(scheduled_for).as_bytes());
    hasher.update(FIELD_SEPARATOR);
    hasher.update(trigger_type.as_bytes());
    IdempotencyKey(format!("{:x}", hasher.finalize()))
}

/// Derive the execution id for an idempotency key.
///
/// UUIDv5 of the key bytes in [`EXECUTION_ID_NAMESPACE`]: same key, same id, in
/// every process. Random ids (`JobId::new`, `ExecutionId::new`) are unrelated.
pub fn deterministic_execution_id(idempotency_key: impl AsRef<str>) -> ExecutionId {
    ExecutionId::from_uuid(Uuid::new_v5(
        &EXECUTION_ID_NAMESPACE,
        idempotency_key.as_ref().as_bytes(),
    ))
}

/// Render a timestamp the way the key hash expects it.
///
/// UTC, `YYYY-MM-DDTHH:MM:SS`, then the nanosecond fraction with trailing zeros
/// removed (omitted entirely when zero), then `Z`. Instants that are equal in UTC
/// render identically whatever offset they were expressed in.
pub fn canonical_timestamp<Tz: TimeZone>(t: &DateTime<Tz>) -> String {
    let utc = t.with_timezone(&Utc);
    let mut out = utc.format("%Y-%m-%dT%H:%M:%S").to_string();
    let nanos = utc.timestamp_subsec_nanos();
    if nanos != 0 {
        let fraction = format!("{nanos:09}");
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out.push('Z');
    out
}

/// What identity timestamp to use when a job has no `scheduled_for`.
///
/// There is no safe implicit answer, so the choice is explicit:
/// - `Reject`: refuse to build the job.
/// - `Epoch`: hash the Unix epoch. Every unscheduled request with the same tenant,
///   script, version and trigger collapses onto one execution.
/// - `ZeroTime`: like `Epoch`, but hash `0001-01-01T00:00:00Z`, the zero timestamp
///   producers in other languages fall back to. Use it when those producers submit
///   the same unscheduled jobs; `Epoch` and `ZeroTime` never yield the same key.
/// - `CreatedAt`: hash the job's `created_at`. Retries converge only if the producer
///   reuses the original `created_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnscheduledIdentity {
    #[default]
    Reject,
    Epoch,
    ZeroTime,
    CreatedAt,
}

impl UnscheduledIdentity {
    /// Timestamp that feeds the key for a job with the given schedule.
    pub fn resolve(
        self,
        scheduled_for: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> JobResult<DateTime<Utc>> {
        match (scheduled_for, self) {
            (Some(at), _) => Ok(at),
            (None, UnscheduledIdentity::Reject) => Err(JobError::missing("scheduled_for")),
            (None, UnscheduledIdentity::Epoch) => Ok(DateTime::<Utc>::UNIX_EPOCH),
            (None, UnscheduledIdentity::ZeroTime) => {
                Ok(DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(ZERO_TIME_UNIX_SECONDS))
            }
            (None, UnscheduledIdentity::CreatedAt) => Ok(created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use dispatch_core::ScriptId;

    const TENANT: &str = "tenant-a";
    const SCRIPT: &str = "11111111-1111-1111-1111-111111111111";
    const GOLDEN_SCHEDULED: &str =
        "01d6c35b57aeafe6dd4786469bcce8ca40a16f9c35754c4066eca26fbc7045e6";
    const GOLDEN_MANUAL: &str = "12e9224109f591b3cff4f4344229495ea22b648fbb8050179760be5fa7d2dcde";

    fn script_ref(version: i64) -> ScriptRef {
        ScriptRef::new(SCRIPT.parse().unwrap(), version)
    }

    fn scheduled_for() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-02-06T12:34:56.789-03:00").unwrap()
    }

    #[test]
    fn golden_vector_matches_other_implementations() {
        let key = compute_idempotency_key(TENANT, &script_ref(7), &scheduled_for(), "scheduled");
        assert_eq!(key.as_str(), GOLDEN_SCHEDULED);
        assert_eq!(key.as_str().len(), 64);

        let manual = compute_idempotency_key(TENANT, &script_ref(7), &scheduled_for(), "manual");
        assert_eq!(manual.as_str(), GOLDEN_MANUAL);
        assert_ne!(manual, key);
    }

    #[test]
    fn golden_execution_id_is_stable() {
        let a = deterministic_execution_id(GOLDEN_SCHEDULED);
        let b = deterministic_execution_id(IdempotencyKey::new(GOLDEN_SCHEDULED));

        assert!(!a.is_nil());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "41b486c2-fb09-5812-984e-9b5bdae48e49");
        assert_eq!(a.as_uuid().get_version_num(), 5);
    }

    #[test]
    fn short_keys_derive_stable_ids() {
        let a = deterministic_execution_id("deadbeef");
        assert_eq!(a, deterministic_execution_id("deadbeef"));
        assert_eq!(a.to_string(), "fd2ade40-959f-516f-b0fd-4aeaa03bb2e4");
        assert_ne!(a, deterministic_execution_id("deadbeeF"));
    }

    #[test]
    fn each_input_changes_the_key() {
        let base = compute_idempotency_key(TENANT, &script_ref(7), &scheduled_for(), "scheduled");

        let other_tenant =
            compute_idempotency_key("tenant-b", &script_ref(7), &scheduled_for(), "scheduled");
        let other_script = compute_idempotency_key(
            TENANT,
            &ScriptRef::new(ScriptId::new(), 7),
            &scheduled_for(),
            "scheduled",
        );
        let other_version =
            compute_idempotency_key(TENANT, &script_ref(8), &scheduled_for(), "scheduled");
        let other_time = compute_idempotency_key(
            TENANT,
            &script_ref(7),
            &(scheduled_for() + Duration::seconds(1)),
            "scheduled",
        );
        let other_trigger =
            compute_idempotency_key(TENANT, &script_ref(7), &scheduled_for(), "manual");

        let all = [
            &base,
            &other_tenant,
            &other_script,
            &other_version,
            &other_time,
            &other_trigger,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn content_hash_does_not_feed_the_key() {
        let plain = compute_idempotency_key(TENANT, &script_ref(7), &scheduled_for(), "api");
        let hashed = compute_idempotency_key(
            TENANT,
            &script_ref(7).with_sha256("abc"),
            &scheduled_for(),
            "api",
        );
        assert_eq!(plain, hashed);
    }

    #[test]
    fn separator_prevents_concatenation_collisions() {
        let a = compute_idempotency_key("ab", &script_ref(1), &scheduled_for(), "c");
        let b = compute_idempotency_key("a", &script_ref(1), &scheduled_for(), "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn same_instant_in_other_offsets_hashes_identically() {
        let utc = scheduled_for().with_timezone(&Utc);
        let tokyo = scheduled_for().with_timezone(&FixedOffset::east_opt(9 * 3600).unwrap());

        let from_local = compute_idempotency_key(TENANT, &script_ref(7), &scheduled_for(), "x");
        assert_eq!(from_local, compute_idempotency_key(TENANT, &script_ref(7), &utc, "x"));
        assert_eq!(from_local, compute_idempotency_key(TENANT, &script_ref(7), &tokyo, "x"));
    }

    #[test]
    fn canonical_timestamp_trims_fraction() {
        assert_eq!(canonical_timestamp(&scheduled_for()), "2026-02-06T15:34:56.789Z");

        let whole = DateTime::parse_from_rfc3339("2026-02-06T15:34:56+00:00").unwrap();
        assert_eq!(canonical_timestamp(&whole), "2026-02-06T15:34:56Z");

        let nanos = DateTime::parse_from_rfc3339("2026-02-06T15:34:56.000000001Z").unwrap();
        assert_eq!(canonical_timestamp(&nanos), "2026-02-06T15:34:56.000000001Z");

        let micros = DateTime::parse_from_rfc3339("2026-02-06T15:34:56.123400Z").unwrap();
        assert_eq!(canonical_timestamp(&micros), "2026-02-06T15:34:56.1234Z");
    }

    #[test]
    fn unscheduled_policy_is_explicit() {
        let created = Utc::now();
        let at = created + Duration::minutes(5);

        assert_eq!(UnscheduledIdentity::Reject.resolve(Some(at), created), Ok(at));
        assert_eq!(
            UnscheduledIdentity::Reject.resolve(None, created),
            Err(JobError::missing("scheduled_for"))
        );
        assert_eq!(
            UnscheduledIdentity::Epoch.resolve(None, created),
            Ok(DateTime::<Utc>::UNIX_EPOCH)
        );
        assert_eq!(UnscheduledIdentity::CreatedAt.resolve(None, created), Ok(created));

        let zero = UnscheduledIdentity::ZeroTime.resolve(None, created).unwrap();
        assert_eq!(canonical_timestamp(&zero), "0001-01-01T00:00:00Z");
        assert_eq!(zero.timestamp(), ZERO_TIME_UNIX_SECONDS);
    }

    #[test]
    fn zero_time_matches_unscheduled_jobs_from_other_producers() {
        let zero = UnscheduledIdentity::ZeroTime.resolve(None, Utc::now()).unwrap();
        let key = compute_idempotency_key(TENANT, &script_ref(7), &zero, "manual");
        assert_eq!(
            key.as_str(),
            "d02a78724af2dedd8a3d84547fb53c128d396ef00e52a9368f1237b8efc1a58c"
        );
        assert_eq!(
            deterministic_execution_id(&key).to_string(),
            "849616d0-240b-525a-890c-181906f5f621"
        );

        let epoch = UnscheduledIdentity::Epoch.resolve(None, Utc::now()).unwrap();
        assert_ne!(
            compute_idempotency_key(TENANT, &script_ref(7), &epoch, "manual"),
            key
        );
    }

    #[test]
    fn negative_versions_hash_with_their_sign() {
        let key = compute_idempotency_key(TENANT, &script_ref(-1), &scheduled_for(), "scheduled");
        assert_eq!(
            key.as_str(),
            "039b206e75aee907bce51b71c1ea6b05dfc01102495795db608bf2c84f686520"
        );
        assert_eq!(
            deterministic_execution_id(&key).to_string(),
            "388782fd-3880-540f-a5c6-945b9426d3fa"
        );
        assert_ne!(
            key,
            compute_idempotency_key(TENANT, &script_ref(1), &scheduled_for(), "scheduled")
        );
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn instant() -> impl Strategy<Value = DateTime<Utc>> {
            (0i64..4_102_444_800, 0u32..1_000_000_000)
                .prop_map(|(secs, nanos)| Utc.timestamp_opt(secs, nanos).unwrap())
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: key derivation is deterministic and always 64 lowercase hex chars.
            #[test]
            fn key_is_deterministic_hex(
                tenant in "[a-z0-9-]{1,24}",
                version in any::<i64>(),
                at in instant(),
                trigger in "(manual|scheduled|api|ci-cd|immediate)",
            ) {
                let script = ScriptRef::new(ScriptId::from_uuid(Uuid::from_u128(42)), version);
                let a = compute_idempotency_key(&tenant, &script, &at, &trigger);
                let b = compute_idempotency_key(&tenant, &script, &at, &trigger);

                prop_assert_eq!(&a, &b);
                prop_assert_eq!(a.as_str().len(), 64);
                prop_assert!(a.as_str().chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
                prop_assert_eq!(deterministic_execution_id(&a), deterministic_execution_id(&b));
            }

            /// Property: the offset a timestamp is expressed in never matters.
            #[test]
            fn offset_never_changes_key(
                at in instant(),
                offset_minutes in -14 * 60i32..=14 * 60,
            ) {
                let script = ScriptRef::new(ScriptId::from_uuid(Uuid::from_u128(7)), 1);
                let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap();
                let local = at.with_timezone(&offset);

                prop_assert_eq!(
                    compute_idempotency_key("t", &script, &at, "scheduled"),
                    compute_idempotency_key("t", &script, &local, "scheduled")
                );
            }

            /// Property: any shift of the schedule, however small, changes the key.
            #[test]
            fn shifted_schedule_changes_key(
                at in instant(),
                shift_nanos in 1i64..86_400_000_000_000,
            ) {
                let script = ScriptRef::new(ScriptId::from_uuid(Uuid::from_u128(7)), 1);
                let shifted = at + Duration::nanoseconds(shift_nanos);

                prop_assert_ne!(
                    compute_idempotency_key("t", &script, &at, "scheduled"),
                    compute_idempotency_key("t", &script, &shifted, "scheduled")
                );
            }

            /// Property: differing versions never share a key.
            #[test]
            fn distinct_versions_distinct_keys(a in any::<i64>(), b in any::<i64>()) {
                prop_assume!(a != b);
                let id = ScriptId::from_uuid(Uuid::from_u128(9));
                let at = DateTime::<Utc>::UNIX_EPOCH;

                prop_assert_ne!(
                    compute_idempotency_key("t", &ScriptRef::new(id, a), &at, "api"),
                    compute_idempotency_key("t", &ScriptRef::new(id, b), &at, "api")
                );
            }
        }
    }
}
