//! Bounded-retry execution engine.
//!
//! Runs fallible async operations with classification-driven retries,
//! exponential backoff with jitter, and a total time budget, and records the
//! full attempt history of every execution.
//!
//! # Safety and Quality
//!
//! This crate forbids unsafe code and propagates every configuration error
//! through [`CommonResult`].
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: errors, failure classification, configuration, serde helpers
//! - `observability`: tracing instrumentation
//! - `runtime` (default): executor, process-wide defaults, observers, clock

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod retry;
#[cfg(feature = "foundation")]
pub mod utils;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "foundation")]
pub use retry::{
    classify, ErrorCategory, ErrorClassifier, FailureSignal, OperationError, RetryConfig,
    RetryConfigBuilder, RetryConfigUpdate, Verdict,
};
#[cfg(feature = "runtime")]
pub use retry::{
    create_executor, default_executor, execute, format_retry_result, get_config, get_delay,
    is_retryable, reset_config, update_config, Attempt, AttemptOutcome, ExecutionError,
    ExecutionResult, RetryExecutor, RetryObserver, RetryStats,
};
#[cfg(feature = "foundation")]
pub use utils::serde::duration_millis;
