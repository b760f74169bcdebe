//! Per-attempt records and execution results
//!
//! An [`ExecutionResult`] is produced once per `execute` call and owned by the
//! caller. Its attempt history is append-only while the execution runs and
//! read-only afterwards: attempts are created by the executor through
//! [`AttemptLog`] and only exposed by shared reference.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::error::{CommonError, ErrorClassification, ErrorSeverity};
use crate::retry::classifier::{ErrorCategory, Verdict};
use crate::utils::serde::{duration_millis, option_duration_millis};

/// Error returned in a failed [`ExecutionResult`]
#[derive(Debug, Error)]
pub enum ExecutionError<E> {
    /// The operation failed and was not retried further
    #[error("{category} failure: {source}")]
    Operation { source: E, category: ErrorCategory, retry_after: Option<Duration> },

    /// Failure produced by the executor itself (total timeout, internal)
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl<E> ExecutionError<E> {
    pub(crate) fn operation(source: E, verdict: &Verdict) -> Self {
        Self::Operation { source, category: verdict.category, retry_after: verdict.retry_after }
    }

    /// Category of the failure; synthesized timeouts report `Timeout`
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Operation { category, .. } => *category,
            Self::Common(CommonError::Timeout { .. }) => ErrorCategory::Timeout,
            Self::Common(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether the total execution budget ran out
    pub fn is_total_timeout(&self) -> bool {
        matches!(self, Self::Common(CommonError::Timeout { .. }))
    }

    /// The error raised by the operation, if the operation produced it
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation { source, .. } => Some(source),
            Self::Common(_) => None,
        }
    }

    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Operation { source, .. } => Some(source),
            Self::Common(_) => None,
        }
    }
}

impl<E> ErrorClassification for ExecutionError<E> {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Operation { category, .. } => category.is_retryable(),
            Self::Common(e) => e.is_retryable(),
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Operation { category, .. } => category.severity(),
            Self::Common(e) => e.severity(),
        }
    }

    fn is_critical(&self) -> bool {
        match self {
            Self::Operation { .. } => false,
            Self::Common(e) => e.is_critical(),
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Operation { retry_after, .. } => *retry_after,
            Self::Common(e) => e.retry_after(),
        }
    }
}

/// Outcome of a single attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure {
        message: String,
        category: ErrorCategory,
        retryable: bool,
        /// Wait scheduled before the next attempt; `None` on the final attempt
        #[serde(with = "option_duration_millis")]
        next_delay: Option<Duration>,
    },
    /// Synthesized when the total timeout expired before the attempt started
    TimedOut {
        #[serde(with = "duration_millis")]
        elapsed: Duration,
    },
}

/// One try of the operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    attempt_number: u32,
    started_at: DateTime<Utc>,
    #[serde(rename = "offset_ms", with = "duration_millis")]
    offset: Duration,
    outcome: AttemptOutcome,
}

impl Attempt {
    /// 1-indexed position within the execution
    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    /// Wall-clock time the attempt began
    ///
    /// Derived from one wall-clock reading at the start of the execution plus
    /// [`offset`](Self::offset), so it never runs backwards within an
    /// execution. Use `offset` when ordering attempts.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Monotonic time since the execution started
    pub fn offset(&self) -> Duration {
        self.offset
    }

    pub fn outcome(&self) -> &AttemptOutcome {
        &self.outcome
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success)
    }

    pub fn next_delay(&self) -> Option<Duration> {
        match self.outcome {
            AttemptOutcome::Failure { next_delay, .. } => next_delay,
            _ => None,
        }
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        match self.outcome {
            AttemptOutcome::Failure { category, .. } => Some(category),
            AttemptOutcome::TimedOut { .. } => Some(ErrorCategory::Timeout),
            AttemptOutcome::Success => None,
        }
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} +{}ms ", self.attempt_number, self.offset.as_millis())?;
        match &self.outcome {
            AttemptOutcome::Success => write!(f, "succeeded"),
            AttemptOutcome::Failure { message, category, retryable, next_delay } => {
                let kind = if *retryable { "retryable" } else { "non-retryable" };
                write!(f, "failed [{category}, {kind}] {message}")?;
                if let Some(delay) = next_delay {
                    write!(f, "; retrying in {}ms", delay.as_millis())?;
                }
                Ok(())
            }
            AttemptOutcome::TimedOut { elapsed } => {
                write!(f, "not started: total timeout reached after {}ms", elapsed.as_millis())
            }
        }
    }
}

/// Append-only attempt history owned by a single execution
#[derive(Debug, Default)]
pub(crate) struct AttemptLog {
    attempts: Vec<Attempt>,
}

impl AttemptLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(
        &mut self,
        attempt_number: u32,
        started_at: DateTime<Utc>,
        offset: Duration,
        outcome: AttemptOutcome,
    ) {
        self.attempts.push(Attempt { attempt_number, started_at, offset, outcome });
    }

    /// Attach the scheduled wait to the most recent failure
    pub(crate) fn schedule_next(&mut self, delay: Duration) {
        if let Some(Attempt { outcome: AttemptOutcome::Failure { next_delay, .. }, .. }) =
            self.attempts.last_mut()
        {
            *next_delay = Some(delay);
        }
    }

    pub(crate) fn into_inner(self) -> Vec<Attempt> {
        self.attempts
    }
}

/// Aggregated counts and rates over one execution's attempts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetryStats {
    /// Recorded attempts, including a synthesized timeout record
    pub total_attempts: u32,
    /// Times the operation was actually invoked
    pub invocations: u32,
    pub successes: u32,
    pub failures: u32,
    pub retryable_failures: u32,
    pub non_retryable_failures: u32,
    pub timeouts: u32,
    /// Sum of all scheduled waits
    #[serde(rename = "total_delay_ms", with = "duration_millis")]
    pub total_delay: Duration,
}

impl RetryStats {
    pub fn from_attempts(attempts: &[Attempt]) -> Self {
        let mut stats = Self { total_attempts: attempts.len() as u32, ..Self::default() };

        for attempt in attempts {
            match &attempt.outcome {
                AttemptOutcome::Success => {
                    stats.invocations += 1;
                    stats.successes += 1;
                }
                AttemptOutcome::Failure { retryable, next_delay, .. } => {
                    stats.invocations += 1;
                    stats.failures += 1;
                    if *retryable {
                        stats.retryable_failures += 1;
                    } else {
                        stats.non_retryable_failures += 1;
                    }
                    stats.total_delay += next_delay.unwrap_or_default();
                }
                AttemptOutcome::TimedOut { .. } => stats.timeouts += 1,
            }
        }

        stats
    }

    /// Number of waits that were scheduled
    pub fn retries(&self) -> u32 {
        self.invocations.saturating_sub(1)
    }

    /// Average scheduled wait between attempts
    pub fn average_delay(&self) -> Option<Duration> {
        match self.retries() {
            0 => None,
            retries => Some(self.total_delay / retries),
        }
    }

    /// Fraction of invocations that succeeded
    pub fn success_rate(&self) -> f64 {
        if self.invocations == 0 {
            0.0
        } else {
            f64::from(self.successes) / f64::from(self.invocations)
        }
    }

    /// Fraction of invocations that failed
    pub fn failure_rate(&self) -> f64 {
        if self.invocations == 0 {
            0.0
        } else {
            f64::from(self.failures) / f64::from(self.invocations)
        }
    }
}

impl fmt::Display for RetryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RetryStats {{ attempts: {}, successes: {}, failures: {}, timeouts: {}, total_delay: {:?} }}",
            self.total_attempts, self.successes, self.failures, self.timeouts, self.total_delay
        )
    }
}

/// Result of one `execute` call
#[derive(Debug)]
pub struct ExecutionResult<T, E> {
    label: String,
    outcome: Result<T, ExecutionError<E>>,
    attempts: Vec<Attempt>,
    total_duration: Duration,
}

impl<T, E> ExecutionResult<T, E> {
    pub(crate) fn new(
        label: String,
        outcome: Result<T, ExecutionError<E>>,
        attempts: AttemptLog,
        total_duration: Duration,
    ) -> Self {
        Self { label, outcome, attempts: attempts.into_inner(), total_duration }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The operation's value, present iff the execution succeeded
    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    /// The terminal error, present iff the execution failed
    pub fn error(&self) -> Option<&ExecutionError<E>> {
        self.outcome.as_ref().err()
    }

    /// Attempts in chronological order
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    /// Number of the last recorded attempt, 0 if none was recorded
    pub fn final_attempt_number(&self) -> u32 {
        self.attempts.last().map_or(0, Attempt::attempt_number)
    }

    /// Category of the last recorded failure
    pub fn last_category(&self) -> Option<ErrorCategory> {
        self.attempts.iter().rev().find_map(Attempt::category)
    }

    pub fn stats(&self) -> RetryStats {
        RetryStats::from_attempts(&self.attempts)
    }

    pub fn into_result(self) -> Result<T, ExecutionError<E>> {
        self.outcome
    }

    pub fn into_value(self) -> Option<T> {
        self.outcome.ok()
    }
}

impl<T, E: fmt::Display> ExecutionResult<T, E> {
    /// Multi-line human-readable summary; identical on every call
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl<T, E: fmt::Display> fmt::Display for ExecutionResult<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attempts = self.attempts.len();
        match &self.outcome {
            Ok(_) => write!(
                f,
                "[{}] succeeded after {} attempt(s) in {}ms",
                self.label,
                attempts,
                self.total_duration.as_millis()
            )?,
            Err(error) => write!(
                f,
                "[{}] failed after {} attempt(s) in {}ms: {}",
                self.label,
                attempts,
                self.total_duration.as_millis(),
                error
            )?,
        }
        for attempt in &self.attempts {
            write!(f, "\n  {attempt}")?;
        }
        Ok(())
    }
}

/// Render an execution result as a stable, human-readable string
pub fn format_retry_result<T, E: fmt::Display>(result: &ExecutionResult<T, E>) -> String {
    result.summary()
}

#[cfg(test)]
mod tests {
    //! Unit tests for attempt records, stats and formatting.
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().unwrap()
    }

    fn failure(category: ErrorCategory, message: &str) -> AttemptOutcome {
        AttemptOutcome::Failure {
            message: message.to_string(),
            category,
            retryable: category.is_retryable(),
            next_delay: None,
        }
    }

    fn sample_log() -> AttemptLog {
        let mut log = AttemptLog::new();
        log.record(1, at(0), Duration::ZERO, failure(ErrorCategory::Server, "boom"));
        log.schedule_next(Duration::from_millis(1000));
        log.record(2, at(1), Duration::from_millis(1000), failure(ErrorCategory::Server, "boom"));
        log.schedule_next(Duration::from_millis(2000));
        log.record(3, at(3), Duration::from_millis(3000), AttemptOutcome::Success);
        log
    }

    /// Validates stats aggregation for a fail-fail-succeed history.
    ///
    /// Assertions:
    /// - Counts three invocations, one success, two retryable failures.
    /// - Total delay is 3s with an average of 1.5s.
    #[test]
    fn test_stats_from_attempts() {
        let result: ExecutionResult<u32, String> =
            ExecutionResult::new("job".into(), Ok(7), sample_log(), Duration::from_millis(3005));
        let stats = result.stats();

        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.invocations, 3);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.retryable_failures, 2);
        assert_eq!(stats.non_retryable_failures, 0);
        assert_eq!(stats.total_delay, Duration::from_secs(3));
        assert_eq!(stats.retries(), 2);
        assert_eq!(stats.average_delay(), Some(Duration::from_millis(1500)));
        assert!((stats.success_rate() - 1.0 / 3.0).abs() < f64::EPSILON);
        assert!((stats.failure_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stats_empty() {
        let stats = RetryStats::from_attempts(&[]);
        assert_eq!(stats, RetryStats::default());
        assert_eq!(stats.average_delay(), None);
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn test_schedule_next_only_touches_failures() {
        let mut log = AttemptLog::new();
        log.record(1, at(0), Duration::ZERO, AttemptOutcome::Success);
        log.schedule_next(Duration::from_secs(1));

        let attempts = log.into_inner();
        assert_eq!(attempts[0].next_delay(), None);
        assert!(attempts[0].is_success());
    }

    #[test]
    fn test_result_accessors() {
        let result: ExecutionResult<u32, String> =
            ExecutionResult::new("job".into(), Ok(7), sample_log(), Duration::from_secs(3));

        assert!(result.succeeded());
        assert_eq!(result.value(), Some(&7));
        assert!(result.error().is_none());
        assert_eq!(result.final_attempt_number(), 3);
        assert_eq!(result.last_category(), Some(ErrorCategory::Server));
        assert_eq!(result.attempts()[0].next_delay(), Some(Duration::from_secs(1)));
        assert_eq!(result.attempts()[2].next_delay(), None);
        assert_eq!(result.into_value(), Some(7));
    }

    #[test]
    fn test_failed_result_accessors() {
        let mut log = AttemptLog::new();
        log.record(1, at(0), Duration::ZERO, failure(ErrorCategory::Authentication, "denied"));
        let verdict = Verdict {
            category: ErrorCategory::Authentication,
            is_retryable: false,
            retry_after: None,
        };
        let result: ExecutionResult<(), String> = ExecutionResult::new(
            "login".into(),
            Err(ExecutionError::operation("denied".to_string(), &verdict)),
            log,
            Duration::from_millis(4),
        );

        assert!(!result.succeeded());
        assert!(result.value().is_none());
        let error = result.error().unwrap();
        assert_eq!(error.category(), ErrorCategory::Authentication);
        assert_eq!(error.operation_error().map(String::as_str), Some("denied"));
        assert!(!error.is_retryable());
        assert!(!error.is_total_timeout());
    }

    /// Tests that summaries are stable and idempotent
    #[test]
    fn test_format_retry_result_is_stable() {
        let result: ExecutionResult<u32, String> =
            ExecutionResult::new("job".into(), Ok(7), sample_log(), Duration::from_millis(3005));

        let first = format_retry_result(&result);
        let second = format_retry_result(&result);

        assert_eq!(first, second);
        assert_eq!(
            first,
            "[job] succeeded after 3 attempt(s) in 3005ms\n  \
             #1 +0ms failed [server, retryable] boom; retrying in 1000ms\n  \
             #2 +1000ms failed [server, retryable] boom; retrying in 2000ms\n  \
             #3 +3000ms succeeded"
        );
    }

    #[test]
    fn test_format_timed_out_result() {
        let mut log = AttemptLog::new();
        log.record(1, at(0), Duration::ZERO, failure(ErrorCategory::Server, "boom"));
        log.schedule_next(Duration::from_millis(500));
        log.record(
            2,
            at(1),
            Duration::from_millis(1200),
            AttemptOutcome::TimedOut { elapsed: Duration::from_millis(1200) },
        );
        let result: ExecutionResult<(), String> = ExecutionResult::new(
            "sync".into(),
            Err(CommonError::timeout("sync", Duration::from_millis(1200)).into()),
            log,
            Duration::from_millis(1200),
        );

        assert_eq!(
            result.summary(),
            "[sync] failed after 2 attempt(s) in 1200ms: Operation 'sync' timed out after 1.2s\n  \
             #1 +0ms failed [server, retryable] boom; retrying in 500ms\n  \
             #2 +1200ms not started: total timeout reached after 1200ms"
        );
        assert_eq!(result.stats().timeouts, 1);
        assert_eq!(result.stats().invocations, 1);
        assert!(result.error().unwrap().is_total_timeout());
        assert_eq!(result.last_category(), Some(ErrorCategory::Timeout));
    }

    #[test]
    fn test_attempt_serialization() {
        let attempts = sample_log().into_inner();
        let json = serde_json::to_value(&attempts[0]).unwrap();

        assert_eq!(json["attempt_number"], 1);
        assert_eq!(json["offset_ms"], 0);
        assert_eq!(json["outcome"]["status"], "failure");
        assert_eq!(json["outcome"]["category"], "server");
        assert_eq!(json["outcome"]["next_delay"], 1000);
    }
}
