//! Observability hooks for retry executions
//!
//! The executor reports lifecycle events to a [`RetryObserver`]. Every method
//! has a no-op default so sinks only implement what they care about. Events are
//! delivered synchronously from the executing task, in order, with no
//! buffering.
//!
//! [`TracingObserver`] is the default and emits structured `tracing` events.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::retry::classifier::Verdict;

/// Sink for retry lifecycle events
pub trait RetryObserver: Send + Sync + fmt::Debug {
    /// An execution is starting
    fn on_execution_start(&self, _label: &str, _max_attempts: u32) {}

    /// Attempt `attempt` is about to invoke the operation
    fn on_attempt_start(&self, _label: &str, _attempt: u32) {}

    /// Attempt failed; `next_delay` is set when another attempt will follow
    fn on_attempt_failure(
        &self,
        _label: &str,
        _attempt: u32,
        _message: &str,
        _verdict: &Verdict,
        _next_delay: Option<Duration>,
    ) {
    }

    /// Attempt succeeded and the execution is complete
    fn on_success(&self, _label: &str, _attempt: u32, _elapsed: Duration) {}

    /// The execution stopped after a failure
    fn on_give_up(&self, _label: &str, _attempt: u32, _verdict: &Verdict, _elapsed: Duration) {}

    /// The total timeout expired before attempt `attempt`
    fn on_timeout(&self, _label: &str, _attempt: u32, _elapsed: Duration) {}
}

/// Observer that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RetryObserver for NoopObserver {}

/// Observer that emits `tracing` events with structured fields
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TracingObserver {
    /// Same as `TracingObserver::default()`
    pub fn new() -> Self {
        Self
    }
}

impl RetryObserver for TracingObserver {
    fn on_execution_start(&self, label: &str, max_attempts: u32) {
        debug!(operation = label, max_attempts, "Starting retry execution");
    }

    fn on_attempt_start(&self, label: &str, attempt: u32) {
        debug!(operation = label, attempt, "Retry attempt");
    }

    fn on_attempt_failure(
        &self,
        label: &str,
        attempt: u32,
        message: &str,
        verdict: &Verdict,
        next_delay: Option<Duration>,
    ) {
        match next_delay {
            Some(delay) => warn!(
                operation = label,
                attempt,
                category = %verdict.category,
                delay_ms = delay.as_millis() as u64,
                error = message,
                "Retry attempt failed, retrying after delay"
            ),
            None => warn!(
                operation = label,
                attempt,
                category = %verdict.category,
                retryable = verdict.is_retryable,
                error = message,
                "Retry attempt failed"
            ),
        }
    }

    fn on_success(&self, label: &str, attempt: u32, elapsed: Duration) {
        info!(
            operation = label,
            attempts = attempt,
            elapsed_ms = elapsed.as_millis() as u64,
            "Retry execution succeeded"
        );
    }

    fn on_give_up(&self, label: &str, attempt: u32, verdict: &Verdict, elapsed: Duration) {
        if verdict.is_retryable {
            warn!(
                operation = label,
                attempts = attempt,
                category = %verdict.category,
                elapsed_ms = elapsed.as_millis() as u64,
                "All retry attempts exhausted"
            );
        } else {
            warn!(
                operation = label,
                attempts = attempt,
                category = %verdict.category,
                "Non-retryable failure, giving up"
            );
        }
    }

    fn on_timeout(&self, label: &str, attempt: u32, elapsed: Duration) {
        warn!(
            operation = label,
            attempt,
            elapsed_ms = elapsed.as_millis() as u64,
            "Retry execution timed out"
        );
    }
}
