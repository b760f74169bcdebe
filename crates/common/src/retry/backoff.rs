// Exponential backoff with multiplicative jitter
//
// delay(n) = min(base * multiplier^(n-1) * (1 + jitter_factor * U), max_delay)
//
// where n is the 1-indexed attempt that just failed and U is drawn once per
// decision from a JitterSource. Explicit retry hints bypass the curve but are
// still capped at max_delay.
use std::fmt;
use std::time::Duration;

use rand::Rng;

use crate::retry::classifier::Verdict;
use crate::retry::config::RetryConfig;
use crate::retry::constants::MAX_BACKOFF_EXPONENT;

/// Source of uniform random values in `[0, 1)` used for jitter
pub trait JitterSource: Send + Sync + fmt::Debug {
    fn sample(&self) -> f64;
}

/// Thread-local RNG jitter used in production
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn sample(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Constant jitter sample, for deterministic delays in tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedJitter(f64);

impl FixedJitter {
    /// Values outside `[0, 1]` are clamped
    pub fn new(sample: f64) -> Self {
        Self(if sample.is_nan() { 0.0 } else { sample.clamp(0.0, 1.0) })
    }
}

impl JitterSource for FixedJitter {
    fn sample(&self) -> f64 {
        self.0
    }
}

/// Exponential delay without jitter for the attempt that just failed
pub fn exponential_delay(config: &RetryConfig, attempt: u32) -> Duration {
    scaled_delay(config, attempt, 1.0)
}

/// Inclusive range a jittered delay can fall in for the given attempt
pub fn delay_bounds(config: &RetryConfig, attempt: u32) -> (Duration, Duration) {
    (exponential_delay(config, attempt), scaled_delay(config, attempt, 1.0 + config.jitter_factor()))
}

/// Compute the wait before the attempt following `attempt`
///
/// Call once per retry decision and reuse the value: every call consumes a
/// fresh jitter sample.
pub fn next_delay(
    config: &RetryConfig,
    attempt: u32,
    verdict: &Verdict,
    jitter: &dyn JitterSource,
) -> Duration {
    if let Some(hint) = verdict.retry_after {
        return hint.min(config.max_delay());
    }

    let sample = jitter.sample();
    scaled_delay(config, attempt, 1.0 + config.jitter_factor() * sample)
}

fn scaled_delay(config: &RetryConfig, attempt: u32, factor: f64) -> Duration {
    let max_delay = config.max_delay();
    let base_nanos = config.base_delay().as_nanos() as f64;

    // Cap exponent to keep the float finite for large attempt numbers
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT) as i32;
    let delay_nanos = base_nanos * config.backoff_multiplier().powi(exponent) * factor;

    if delay_nanos >= max_delay.as_nanos() as f64 {
        return max_delay;
    }
    // NaN.max(0.0) is 0.0
    Duration::from_nanos(delay_nanos.max(0.0).round() as u64)
}
