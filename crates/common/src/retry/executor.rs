//! Bounded retry executor
//!
//! Runs an async operation up to `max_attempts` times, classifying each
//! failure to decide whether to retry and sleeping an exponentially growing,
//! jittered delay between attempts. The whole execution is bounded by the
//! configured total timeout, which is checked before every attempt; an
//! operation that is already running is never preempted.
//!
//! The executor never returns `Err`: every outcome, including the total
//! timeout, is reported through [`ExecutionResult`].

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::error::CommonError;
use crate::retry::attempt::{AttemptLog, AttemptOutcome, ExecutionError, ExecutionResult};
use crate::retry::backoff::{self, JitterSource, ThreadRngJitter};
use crate::retry::classifier::{ErrorClassifier, FailureSignal, Verdict};
use crate::retry::config::RetryConfig;
use crate::retry::constants::DEFAULT_OPERATION_LABEL;
use crate::retry::observer::{RetryObserver, TracingObserver};
use crate::testing::time::{Clock, SystemClock};

/// Executes operations with classification-driven retries
///
/// Cloning is cheap; all collaborators are shared behind `Arc`. Each call to
/// [`execute`](Self::execute) keeps its own attempt history, so one executor
/// can serve many concurrent executions.
///
/// ```
/// use std::time::Duration;
///
/// use retryline_common::retry::{OperationError, RetryConfig, RetryExecutor};
///
/// # tokio_test::block_on(async {
/// let config = RetryConfig::builder().base_delay(Duration::from_millis(1)).build().unwrap();
/// let executor = RetryExecutor::new(config);
///
/// let result = executor
///     .execute("lookup", || async { Err::<(), _>(OperationError::http(404, "no such user")) })
///     .await;
///
/// assert!(!result.succeeded());
/// assert_eq!(result.attempts().len(), 1);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: Arc<RetryConfig>,
    classifier: ErrorClassifier,
    clock: Arc<dyn Clock>,
    jitter: Arc<dyn JitterSource>,
    observer: Arc<dyn RetryObserver>,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryExecutor {
    /// Executor with the default classifier, system clock, thread RNG jitter
    /// and a `TracingObserver`
    pub fn new(config: RetryConfig) -> Self {
        Self::from_shared(Arc::new(config))
    }

    /// Build an executor around an already shared configuration snapshot
    pub fn from_shared(config: Arc<RetryConfig>) -> Self {
        Self {
            config,
            classifier: ErrorClassifier::default(),
            clock: Arc::new(SystemClock),
            jitter: Arc::new(ThreadRngJitter),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the lifecycle observer
    pub fn with_observer<O: RetryObserver + 'static>(mut self, observer: O) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Replace the clock used for the total timeout and attempt timestamps
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replace the jitter source
    pub fn with_jitter<J: JitterSource + 'static>(mut self, jitter: J) -> Self {
        self.jitter = Arc::new(jitter);
        self
    }

    /// Replace the failure classifier
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Configuration snapshot this executor was built with
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Classifier applied to every failure
    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Classify a failure with this executor's classifier
    pub fn classify<E: FailureSignal + ?Sized>(&self, error: &E) -> Verdict {
        self.classifier.classify(error)
    }

    /// Jittered wait that would follow a failed `attempt` with this error
    pub fn delay_for<E: FailureSignal + ?Sized>(&self, error: &E, attempt: u32) -> Duration {
        let verdict = self.classifier.classify(error);
        backoff::next_delay(&self.config, attempt, &verdict, self.jitter.as_ref())
    }

    /// [`execute`](Self::execute) under the default operation label
    pub async fn run<F, Fut, T, E>(&self, operation: F) -> ExecutionResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: FailureSignal,
    {
        self.execute(DEFAULT_OPERATION_LABEL, operation).await
    }

    /// Run `operation` until it succeeds, fails permanently, runs out of
    /// attempts, or exceeds the total timeout
    #[instrument(skip(self, operation), fields(max_attempts = self.config.max_attempts()))]
    pub async fn execute<F, Fut, T, E>(&self, label: &str, mut operation: F) -> ExecutionResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: FailureSignal,
    {
        let max_attempts = self.config.max_attempts();
        let total_timeout = self.config.total_timeout();
        let start = self.clock.now();
        let started_wall: DateTime<Utc> = self.clock.system_time().into();
        let mut log = AttemptLog::new();

        self.observer.on_execution_start(label, max_attempts);

        for attempt in 1..=max_attempts {
            let offset = self.elapsed_since(start);
            let started_at = wall_time_at(started_wall, offset);

            if offset >= total_timeout {
                log.record(attempt, started_at, offset, AttemptOutcome::TimedOut { elapsed: offset });
                self.observer.on_timeout(label, attempt, offset);
                let error = CommonError::timeout(label, offset);
                return ExecutionResult::new(label.to_string(), Err(error.into()), log, offset);
            }

            self.observer.on_attempt_start(label, attempt);

            let error = match operation().await {
                Ok(value) => {
                    log.record(attempt, started_at, offset, AttemptOutcome::Success);
                    let elapsed = self.elapsed_since(start);
                    self.observer.on_success(label, attempt, elapsed);
                    return ExecutionResult::new(label.to_string(), Ok(value), log, elapsed);
                }
                Err(error) => error,
            };

            let verdict = self.classifier.classify(&error);
            let message = error.message().into_owned();
            log.record(
                attempt,
                started_at,
                offset,
                AttemptOutcome::Failure {
                    message: message.clone(),
                    category: verdict.category,
                    retryable: verdict.is_retryable,
                    next_delay: None,
                },
            );

            if !verdict.is_retryable || attempt == max_attempts {
                self.observer.on_attempt_failure(label, attempt, &message, &verdict, None);
                let elapsed = self.elapsed_since(start);
                self.observer.on_give_up(label, attempt, &verdict, elapsed);
                let error = ExecutionError::operation(error, &verdict);
                return ExecutionResult::new(label.to_string(), Err(error), log, elapsed);
            }
            drop(error);

            let delay = backoff::next_delay(&self.config, attempt, &verdict, self.jitter.as_ref());
            log.schedule_next(delay);
            self.observer.on_attempt_failure(label, attempt, &message, &verdict, Some(delay));

            tokio::time::sleep(delay).await;
        }

        // max_attempts >= 1 is enforced by config validation
        let elapsed = self.elapsed_since(start);
        let error = CommonError::internal_with_context("retry loop ended without an outcome", label);
        ExecutionResult::new(label.to_string(), Err(error.into()), log, elapsed)
    }

    fn elapsed_since(&self, start: Instant) -> Duration {
        self.clock.now().saturating_duration_since(start)
    }
}

/// Wall-clock timestamp `offset` after the execution began
///
/// Anchored to one wall-clock reading so attempt timestamps follow the
/// monotonic clock even if system time is adjusted mid-execution.
fn wall_time_at(started_wall: DateTime<Utc>, offset: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(offset)
        .ok()
        .and_then(|offset| started_wall.checked_add_signed(offset))
        .unwrap_or(started_wall)
}
