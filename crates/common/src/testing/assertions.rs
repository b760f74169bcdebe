//! Custom assertions for retry tests

// These assertions panic on failure by design
#![allow(clippy::missing_panics_doc)]

use std::time::Duration;

use crate::retry::attempt::ExecutionResult;
use crate::retry::backoff::delay_bounds;
use crate::retry::config::RetryConfig;

/// Assert that an error's `Display` output contains a substring
///
/// # Examples
///
/// ```
/// let result: Result<(), String> = Err("Connection timeout occurred".to_string());
/// retryline_common::assert_error_contains!(result, "timeout");
/// ```
#[macro_export]
macro_rules! assert_error_contains {
    ($result:expr, $substring:expr) => {
        match &$result {
            Ok(_) => panic!("Expected error but got Ok"),
            Err(e) => {
                let error_msg = format!("{}", e);
                assert!(
                    error_msg.contains($substring),
                    "Error message '{}' does not contain '{}'",
                    error_msg,
                    $substring
                );
            }
        }
    };
}

/// Assert that two floats differ by less than `epsilon`
pub fn assert_approx_eq(actual: f64, expected: f64, epsilon: f64) {
    let diff = (actual - expected).abs();
    assert!(
        diff < epsilon,
        "Values not approximately equal: {} vs {} (diff: {})",
        actual,
        expected,
        diff
    );
}

/// Assert that a duration is within an acceptable range
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use retryline_common::testing::assertions::assert_duration_in_range;
///
/// let actual = Duration::from_millis(105);
/// assert_duration_in_range(actual, Duration::from_millis(100), Duration::from_millis(10));
/// ```
pub fn assert_duration_in_range(actual: Duration, expected: Duration, tolerance: Duration) {
    let min = expected.saturating_sub(tolerance);
    let max = expected + tolerance;

    assert!(
        actual >= min && actual <= max,
        "Duration {:?} not in range [{:?}, {:?}]",
        actual,
        min,
        max
    );
}

/// Assert every scheduled delay in `result` lies on the jittered backoff curve
///
/// Only valid for failures without an explicit retry hint.
pub fn assert_delays_follow_backoff<T, E>(result: &ExecutionResult<T, E>, config: &RetryConfig) {
    for attempt in result.attempts() {
        let Some(delay) = attempt.next_delay() else {
            continue;
        };
        let (low, high) = delay_bounds(config, attempt.attempt_number());
        assert!(
            delay >= low && delay <= high,
            "Delay after attempt {} was {:?}, expected within [{:?}, {:?}]",
            attempt.attempt_number(),
            delay,
            low,
            high
        );
    }
}

/// Assert the recorded delays match exactly, in order
pub fn assert_recorded_delays<T, E>(result: &ExecutionResult<T, E>, expected: &[Duration]) {
    let actual: Vec<Duration> = result.attempts().iter().filter_map(|a| a.next_delay()).collect();
    assert_eq!(actual, expected, "Recorded delays differ");
}
