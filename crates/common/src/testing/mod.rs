//! Testing utilities and helpers
//!
//! - **[`assertions`]**: backoff and duration assertions
//! - **[`mocks`]**: scripted operations and a recording observer
//! - **[`time`]**: the [`Clock`] abstraction used by the executor, with a
//!   controllable [`MockClock`]
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use retryline_common::retry::{OperationError, RetryConfig, RetryExecutor};
//! use retryline_common::testing::{MockClock, RecordingObserver, ScriptedOperation};
//!
//! # tokio_test::block_on(async {
//! let config = RetryConfig::builder().base_delay(Duration::from_millis(1)).no_jitter().build().unwrap();
//! let observer = RecordingObserver::new();
//! let executor = RetryExecutor::new(config)
//!     .with_clock(MockClock::new())
//!     .with_observer(observer.clone());
//!
//! let op = ScriptedOperation::fail_then_succeed(1, OperationError::http(503, "busy"), "ok");
//! let result = executor.execute("demo", || op.call()).await;
//!
//! assert!(result.succeeded());
//! assert_eq!(observer.scheduled_delays(), vec![Duration::from_millis(1)]);
//! # });
//! ```

pub mod assertions;
pub mod mocks;
pub mod time;

pub use assertions::{
    assert_approx_eq, assert_delays_follow_backoff, assert_duration_in_range,
    assert_recorded_delays,
};
pub use mocks::{ObservedEvent, RecordingObserver, ScriptedOperation};
pub use time::{Clock, MockClock, SystemClock};
