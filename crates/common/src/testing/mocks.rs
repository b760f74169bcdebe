//! Mock collaborators for exercising the retry executor
//!
//! [`ScriptedOperation`] replays a fixed sequence of outcomes and counts
//! invocations. [`RecordingObserver`] captures every lifecycle event the
//! executor emits.

#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::future::{self, Ready};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::retry::classifier::{ErrorCategory, OperationError, Verdict};
use crate::retry::observer::RetryObserver;

type Step<T> = Result<T, OperationError>;

/// Operation that replays scripted outcomes in order
///
/// Once the script runs out the final step repeats, so a single failure step
/// models a persistently failing dependency.
///
/// # Examples
///
/// ```
/// use retryline_common::retry::OperationError;
/// use retryline_common::testing::mocks::ScriptedOperation;
///
/// let op = ScriptedOperation::fail_then_succeed(2, OperationError::http(500, "boom"), 7);
/// assert!(op.next_outcome().is_err());
/// assert!(op.next_outcome().is_err());
/// assert_eq!(op.next_outcome().unwrap(), 7);
/// assert_eq!(op.calls(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedOperation<T> {
    script: Arc<Mutex<VecDeque<Step<T>>>>,
    last: Arc<Mutex<Option<Step<T>>>>,
    calls: Arc<AtomicU32>,
}

impl<T: Clone> ScriptedOperation<T> {
    pub fn new(steps: Vec<Step<T>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(steps.into())),
            last: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Fail `failures` times with `error`, then succeed with `value`
    pub fn fail_then_succeed(failures: usize, error: OperationError, value: T) -> Self {
        let mut steps: Vec<Step<T>> = vec![Err(error); failures];
        steps.push(Ok(value));
        Self::new(steps)
    }

    /// Fail on every call
    pub fn always_failing(error: OperationError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Produce the next scripted outcome
    pub fn next_outcome(&self) -> Step<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut last = self.last.lock();
        if let Some(step) = self.script.lock().pop_front() {
            *last = Some(step.clone());
            return step;
        }
        last.clone().unwrap_or_else(|| Err(OperationError::new("empty operation script")))
    }

    /// Operation future for use with `RetryExecutor::execute`
    pub fn call(&self) -> Ready<Step<T>> {
        future::ready(self.next_outcome())
    }

    /// Number of times the operation has been invoked
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Lifecycle event captured by [`RecordingObserver`]
#[derive(Debug, Clone, PartialEq)]
pub enum ObservedEvent {
    ExecutionStart { label: String, max_attempts: u32 },
    AttemptStart { attempt: u32 },
    AttemptFailure { attempt: u32, category: ErrorCategory, next_delay: Option<Duration> },
    Success { attempt: u32 },
    GiveUp { attempt: u32, category: ErrorCategory },
    Timeout { attempt: u32 },
}

/// Observer that records events for later assertions
///
/// Clones share the same event log.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<ObservedEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.lock().clone()
    }

    /// Delays announced through failure events, in order
    pub fn scheduled_delays(&self) -> Vec<Duration> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ObservedEvent::AttemptFailure { next_delay, .. } => *next_delay,
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ObservedEvent) {
        self.events.lock().push(event);
    }
}

impl RetryObserver for RecordingObserver {
    fn on_execution_start(&self, label: &str, max_attempts: u32) {
        self.push(ObservedEvent::ExecutionStart { label: label.to_string(), max_attempts });
    }

    fn on_attempt_start(&self, _label: &str, attempt: u32) {
        self.push(ObservedEvent::AttemptStart { attempt });
    }

    fn on_attempt_failure(
        &self,
        _label: &str,
        attempt: u32,
        _message: &str,
        verdict: &Verdict,
        next_delay: Option<Duration>,
    ) {
        self.push(ObservedEvent::AttemptFailure { attempt, category: verdict.category, next_delay });
    }

    fn on_success(&self, _label: &str, attempt: u32, _elapsed: Duration) {
        self.push(ObservedEvent::Success { attempt });
    }

    fn on_give_up(&self, _label: &str, attempt: u32, verdict: &Verdict, _elapsed: Duration) {
        self.push(ObservedEvent::GiveUp { attempt, category: verdict.category });
    }

    fn on_timeout(&self, _label: &str, attempt: u32, _elapsed: Duration) {
        self.push(ObservedEvent::Timeout { attempt });
    }
}
