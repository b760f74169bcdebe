//! Bounded retry execution
//!
//! Failures are sorted into an [`ErrorCategory`] by the [`ErrorClassifier`],
//! which decides whether they are worth retrying. The [`RetryExecutor`] runs
//! an async operation in a bounded loop, sleeping a jittered exponential
//! delay between attempts, and reports the full attempt history in an
//! [`ExecutionResult`].
//!
//! ```
//! use retryline_common::retry::{self, ErrorCategory, OperationError};
//!
//! let verdict = retry::classify(&OperationError::http(429, "too many requests"));
//! assert_eq!(verdict.category, ErrorCategory::RateLimit);
//! assert!(retry::is_retryable("ECONNRESET"));
//! assert!(!retry::is_retryable(&OperationError::http(401, "unauthorized")));
//! ```

pub mod classifier;
pub mod config;
pub mod constants;

#[cfg(feature = "runtime")]
pub mod attempt;
#[cfg(feature = "runtime")]
pub mod backoff;
#[cfg(feature = "runtime")]
pub mod defaults;
#[cfg(feature = "runtime")]
pub mod executor;
#[cfg(feature = "runtime")]
pub mod observer;

pub use classifier::{classify, ErrorCategory, ErrorClassifier, FailureSignal, OperationError, Verdict};
pub use config::{RetryConfig, RetryConfigBuilder, RetryConfigUpdate};

#[cfg(feature = "runtime")]
pub use attempt::{Attempt, AttemptOutcome, ExecutionError, ExecutionResult, RetryStats};
#[cfg(feature = "runtime")]
pub use backoff::{FixedJitter, JitterSource, ThreadRngJitter};
#[cfg(feature = "runtime")]
pub use defaults::{
    create_executor, default_executor, execute, format_retry_result, get_config, get_delay,
    is_retryable, reset_config, update_config,
};
#[cfg(feature = "runtime")]
pub use executor::RetryExecutor;
#[cfg(feature = "runtime")]
pub use observer::{NoopObserver, RetryObserver, TracingObserver};
