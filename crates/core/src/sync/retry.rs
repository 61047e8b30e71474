//! Retry ceiling and backoff for queued-mutation replay.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{RemoteError, RetryClass};

const DEFAULT_MAX_ATTEMPTS: i32 = 10;
const DEFAULT_BASE_DELAY_SECS: i64 = 5;
const DEFAULT_MAX_EXPONENT: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Replay attempts after which an entry moves to `NEEDS_REVIEW`.
    pub max_attempts: i32,
    pub base_delay_secs: i64,
    pub max_exponent: i32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_secs: DEFAULT_BASE_DELAY_SECS,
            max_exponent: DEFAULT_MAX_EXPONENT,
        }
    }
}

/// What to do with a queue entry whose replay just failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Keep it as FAILED and retry after the backoff window.
    Retry,
    /// Park it as NEEDS_REVIEW.
    Park,
}

impl RetryPolicy {
    /// Exponential backoff in seconds, capped at `base * 2^max_exponent`.
    pub fn backoff_seconds(&self, retry_count: i32) -> i64 {
        let exponent = retry_count.clamp(0, self.max_exponent.max(0)) as u32;
        self.base_delay_secs
            .max(0)
            .saturating_mul(2_i64.saturating_pow(exponent))
    }

    /// Backoff plus up to 20% jitter, anchored at `now`.
    pub fn next_retry_at(&self, retry_count: i32, now: DateTime<Utc>) -> DateTime<Utc> {
        let backoff_ms = self.backoff_seconds(retry_count).saturating_mul(1000);
        let jitter_ms = rand::thread_rng().gen_range(0..=backoff_ms / 5);
        now + Duration::milliseconds(backoff_ms.saturating_add(jitter_ms))
    }

    /// Decide between another attempt and parking, given the attempt number
    /// that just failed.
    pub fn disposition(&self, attempt: i32, error: &RemoteError) -> FailureDisposition {
        if attempt >= self.max_attempts {
            return FailureDisposition::Park;
        }
        match error.retry_class() {
            RetryClass::Permanent => FailureDisposition::Park,
            RetryClass::Retryable | RetryClass::ReauthRequired => FailureDisposition::Retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_exponential_and_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_seconds(0), 5);
        assert_eq!(policy.backoff_seconds(1), 10);
        assert_eq!(policy.backoff_seconds(2), 20);
        assert_eq!(policy.backoff_seconds(9), policy.backoff_seconds(8));
    }

    #[test]
    fn zero_base_delay_means_immediately_due() {
        let policy = RetryPolicy {
            base_delay_secs: 0,
            ..RetryPolicy::default()
        };
        let now = Utc::now();
        assert_eq!(policy.next_retry_at(4, now), now);
    }

    #[test]
    fn jitter_stays_within_a_fifth_of_the_backoff() {
        let policy = RetryPolicy::default();
        let now = Utc::now();
        let at = policy.next_retry_at(1, now);
        let waited = (at - now).num_milliseconds();
        assert!((10_000..=12_000).contains(&waited), "waited {waited}ms");
    }

    #[test]
    fn permanent_errors_and_exhausted_attempts_are_parked() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };
        let transient = RemoteError::transport("timeout");
        assert_eq!(policy.disposition(1, &transient), FailureDisposition::Retry);
        assert_eq!(policy.disposition(3, &transient), FailureDisposition::Park);
        assert_eq!(
            policy.disposition(1, &RemoteError::http(422, "bad payload")),
            FailureDisposition::Park
        );
        assert_eq!(
            policy.disposition(1, &RemoteError::http(401, "expired")),
            FailureDisposition::Retry
        );
    }
}
