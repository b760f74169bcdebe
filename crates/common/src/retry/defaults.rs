//! Process-wide default retry configuration and convenience entry points
//!
//! The default configuration is a shared snapshot. [`update_config`] validates
//! and swaps in a new snapshot; executors created earlier keep the one they
//! were built with. Prefer [`create_executor`] when a caller owns its own
//! configuration.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::info;

use crate::error::CommonResult;
pub use crate::retry::attempt::format_retry_result;
use crate::retry::attempt::ExecutionResult;
use crate::retry::backoff::{self, ThreadRngJitter};
use crate::retry::classifier::{ErrorClassifier, FailureSignal};
use crate::retry::config::{RetryConfig, RetryConfigUpdate};
use crate::retry::executor::RetryExecutor;

static DEFAULT_CONFIG: Lazy<RwLock<Arc<RetryConfig>>> =
    Lazy::new(|| RwLock::new(Arc::new(RetryConfig::default())));

/// Current default configuration snapshot
pub fn get_config() -> Arc<RetryConfig> {
    DEFAULT_CONFIG.read().clone()
}

/// Apply `update` to the current defaults and publish the result
///
/// On validation failure the defaults are left unchanged.
pub fn update_config(update: RetryConfigUpdate) -> CommonResult<Arc<RetryConfig>> {
    let mut current = DEFAULT_CONFIG.write();
    let next = Arc::new(current.apply(&update)?);
    *current = Arc::clone(&next);

    info!(
        max_attempts = next.max_attempts(),
        base_delay_ms = next.base_delay().as_millis() as u64,
        max_delay_ms = next.max_delay().as_millis() as u64,
        total_timeout_ms = next.total_timeout().as_millis() as u64,
        "Updated default retry configuration"
    );

    Ok(next)
}

/// Restore the built-in defaults
pub fn reset_config() -> Arc<RetryConfig> {
    let next = Arc::new(RetryConfig::default());
    *DEFAULT_CONFIG.write() = Arc::clone(&next);
    next
}

/// Executor over the current default configuration
pub fn default_executor() -> RetryExecutor {
    RetryExecutor::from_shared(get_config())
}

/// Executor over a caller-supplied configuration
pub fn create_executor(config: RetryConfig) -> RetryExecutor {
    RetryExecutor::new(config)
}

/// Run `operation` with the default executor
pub async fn execute<F, Fut, T, E>(label: &str, operation: F) -> ExecutionResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: FailureSignal,
{
    default_executor().execute(label, operation).await
}

/// Whether the default classifier would retry this failure
pub fn is_retryable<E: FailureSignal + ?Sized>(error: &E) -> bool {
    ErrorClassifier::default().classify(error).is_retryable
}

/// Jittered delay the default executor would wait after `attempt` failed
pub fn get_delay<E: FailureSignal + ?Sized>(error: &E, attempt: u32) -> Duration {
    let verdict = ErrorClassifier::default().classify(error);
    backoff::next_delay(&get_config(), attempt, &verdict, &ThreadRngJitter)
}
