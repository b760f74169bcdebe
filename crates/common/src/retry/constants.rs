// Constants for retry module
use std::time::Duration;

/// Default maximum number of attempts (including the first)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for exponential backoff
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default maximum delay cap
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Default exponential growth factor between attempts
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Default jitter factor (0.0 = no jitter, 1.0 = up to double the delay)
pub const DEFAULT_JITTER_FACTOR: f64 = 0.1;

/// Default wall-clock budget for a whole execution
pub const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(300);

/// Delay suggested for rate-limited failures that carry no explicit hint
pub const DEFAULT_RATE_LIMIT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Maximum exponent for exponential backoff calculation to prevent overflow
pub const MAX_BACKOFF_EXPONENT: u32 = 30;

/// Minimum allowed max_attempts value
pub const MIN_MAX_ATTEMPTS: u32 = 1;

/// Label used when the caller does not name the operation
pub const DEFAULT_OPERATION_LABEL: &str = "operation";
