//! Failure classification
//!
//! Maps an arbitrary failure to a [`Verdict`]: a closed [`ErrorCategory`], a
//! retryability flag and an optional explicit retry delay. Classification is a
//! pure function of the failure's message text (case-insensitive) and its
//! optional numeric status code. It never panics, never suspends and never
//! touches mutable shared state.
//!
//! Rules are evaluated in a fixed priority order and the first match wins:
//!
//! | # | Category | Status | Text |
//! |---|----------|--------|------|
//! | 1 | `network` | `0` | connection reset/refused, DNS, `etimedout`, `timed-out`, "network", "connection" |
//! | 2 | `server` | `500..600` | |
//! | 3 | `rate_limit` | `429` | "rate limit", "too many requests", "quota exceeded", "throttle" |
//! | 4 | `timeout` | `408` | "timeout", "timed out" |
//! | 5 | `throttle` | | "throttle", "throttled", "rate limit" |
//! | 6 | `authentication` | `401` | "unauthorized", "authentication", "invalid credentials", "api key" |
//! | 7 | `authorization` | `403` | "forbidden", "access denied", "insufficient permissions" |
//! | 8 | `validation` | `400` | "validation", "invalid", "malformed", "bad request" |
//! | 9 | `not_found` | `404` | "not found", "404", "does not exist" |
//! | 10 | `unknown` | | anything else (retryable) |
//!
//! Every text that reaches rule 5 has already matched rule 3, and status 400
//! always resolves to `validation`, so `throttle` and `bad_request` are never
//! produced by [`ErrorClassifier::classify`]. Both stay in [`ErrorCategory`] so
//! callers matching on categories remain exhaustive.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{CommonError, ErrorClassification, ErrorSeverity};
use crate::retry::constants::DEFAULT_RATE_LIMIT_RETRY_AFTER;

static NETWORK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"econnreset|enotfound|econnrefused|etimedout|timed-out|connection reset|connection refused|\bdns\b|network|connection",
    )
});
static RATE_LIMIT_PATTERN: Lazy<Regex> =
    Lazy::new(|| pattern(r"rate[ _-]?limit|too many requests|quota exceeded|throttle"));
static TIMEOUT_PATTERN: Lazy<Regex> = Lazy::new(|| pattern(r"timeout|timed out"));
static THROTTLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| pattern(r"throttle|throttled|rate[ _-]?limit"));
static AUTHENTICATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    pattern(r"unauthorized|authentication|invalid credentials|api[ _-]?key")
});
static AUTHORIZATION_PATTERN: Lazy<Regex> =
    Lazy::new(|| pattern(r"forbidden|access denied|insufficient permissions"));
static VALIDATION_PATTERN: Lazy<Regex> =
    Lazy::new(|| pattern(r"validation|invalid|malformed|bad request"));
static NOT_FOUND_PATTERN: Lazy<Regex> =
    Lazy::new(|| pattern(r"not found|404|does not exist"));

/// Compile a case-insensitive pattern. Inputs are literals in this module.
#[allow(clippy::expect_used)]
fn pattern(source: &str) -> Regex {
    Regex::new(&format!("(?i){source}")).expect("classifier patterns are valid regexes")
}

/// Failure category assigned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Connectivity failures (reset, refused, DNS, status 0)
    Network,
    /// 5xx responses
    Server,
    /// 429 responses or quota/rate text
    RateLimit,
    /// 408 responses or timeout text
    Timeout,
    /// Throttling text (shadowed by `RateLimit`)
    Throttle,
    /// 401 responses or credential text
    Authentication,
    /// 403 responses or permission text
    Authorization,
    /// 400 responses or validation text
    Validation,
    /// 404 responses or missing-resource text
    NotFound,
    /// 400 fallback (shadowed by `Validation`)
    BadRequest,
    /// Nothing matched; treated as transient
    Unknown,
}

impl ErrorCategory {
    /// All categories in classification priority order
    pub const ALL: [ErrorCategory; 11] = [
        Self::Network,
        Self::Server,
        Self::RateLimit,
        Self::Timeout,
        Self::Throttle,
        Self::Authentication,
        Self::Authorization,
        Self::Validation,
        Self::NotFound,
        Self::BadRequest,
        Self::Unknown,
    ];

    /// Whether failures in this category deserve another attempt
    pub fn is_retryable(self) -> bool {
        match self {
            Self::Network
            | Self::Server
            | Self::RateLimit
            | Self::Timeout
            | Self::Throttle
            | Self::Unknown => true,
            Self::Authentication
            | Self::Authorization
            | Self::Validation
            | Self::NotFound
            | Self::BadRequest => false,
        }
    }

    /// Stable snake_case name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Server => "server",
            Self::RateLimit => "rate_limit",
            Self::Timeout => "timeout",
            Self::Throttle => "throttle",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::Unknown => "unknown",
        }
    }

    /// Severity reported through `ErrorClassification`
    pub fn severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Server | Self::Timeout => ErrorSeverity::Warning,
            Self::RateLimit | Self::Throttle => ErrorSeverity::Warning,
            Self::NotFound => ErrorSeverity::Info,
            Self::Authentication
            | Self::Authorization
            | Self::Validation
            | Self::BadRequest
            | Self::Unknown => ErrorSeverity::Error,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification result for a single failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// First category whose rule matched
    pub category: ErrorCategory,
    /// Whether the executor may try again
    pub is_retryable: bool,
    /// Explicit delay override, set for rate-limited failures
    pub retry_after: Option<Duration>,
}

impl Verdict {
    fn new(category: ErrorCategory) -> Self {
        Self { category, is_retryable: category.is_retryable(), retry_after: None }
    }
}

/// Generic error signals the classifier reads from a failure
///
/// Implement this for operation error types to make them retryable through
/// the executor. Only `message` is required.
pub trait FailureSignal {
    /// Human-readable failure text, matched case-insensitively
    fn message(&self) -> Cow<'_, str>;

    /// Numeric status code (HTTP-style), if the failure carries one
    fn status(&self) -> Option<u16> {
        None
    }

    /// Explicit retry hint (e.g. a `Retry-After` header)
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl<T: FailureSignal + ?Sized> FailureSignal for &T {
    fn message(&self) -> Cow<'_, str> {
        (**self).message()
    }

    fn status(&self) -> Option<u16> {
        (**self).status()
    }

    fn retry_after(&self) -> Option<Duration> {
        (**self).retry_after()
    }
}

impl<T: FailureSignal + ?Sized> FailureSignal for Box<T> {
    fn message(&self) -> Cow<'_, str> {
        (**self).message()
    }

    fn status(&self) -> Option<u16> {
        (**self).status()
    }

    fn retry_after(&self) -> Option<Duration> {
        (**self).retry_after()
    }
}

impl FailureSignal for str {
    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl FailureSignal for String {
    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl FailureSignal for std::io::Error {
    fn message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }
}

impl FailureSignal for CommonError {
    fn message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }
}

/// Structured operation failure with optional status and retry hint
///
/// ```
/// use std::time::Duration;
///
/// use retryline_common::retry::{ErrorCategory, ErrorClassifier, OperationError};
///
/// let err = OperationError::http(429, "slow down").with_retry_after(Duration::from_secs(2));
/// let verdict = ErrorClassifier::default().classify(&err);
/// assert_eq!(verdict.category, ErrorCategory::RateLimit);
/// assert_eq!(verdict.retry_after, Some(Duration::from_secs(2)));
/// ```
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct OperationError {
    message: String,
    status: Option<u16>,
    retry_after: Option<Duration>,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl OperationError {
    /// Failure described only by its message
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self { message: message.into(), status: None, retry_after: None, source: None }
    }

    /// Failure carrying an HTTP-style status code
    pub fn http<S: Into<String>>(status: u16, message: S) -> Self {
        Self::new(message).with_status(status)
    }

    /// Wrap any error, using its `Display` output as the message
    pub fn from_error<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::new(error.to_string()).with_source(error)
    }

    /// Attach a status code
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Suggest how long to wait before retrying; honored for rate limits only
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    /// Attach the underlying error, exposed through `Error::source`
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Message the failure was created with
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Status code, if the failure carried one
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Retry hint supplied by the caller
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

impl FailureSignal for OperationError {
    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.message)
    }

    fn status(&self) -> Option<u16> {
        self.status
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

impl ErrorClassification for OperationError {
    fn is_retryable(&self) -> bool {
        ErrorClassifier::default().classify(self).is_retryable
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorClassifier::default().classify(self).category.severity()
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        ErrorClassifier::default().classify(self).retry_after
    }
}

/// Pattern and status-code based failure classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorClassifier {
    rate_limit_retry_after: Duration,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self { rate_limit_retry_after: DEFAULT_RATE_LIMIT_RETRY_AFTER }
    }
}

impl ErrorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the delay suggested for rate limits without an explicit hint
    pub fn with_rate_limit_retry_after(mut self, delay: Duration) -> Self {
        self.rate_limit_retry_after = delay;
        self
    }

    /// Classify a failure
    pub fn classify<E: FailureSignal + ?Sized>(&self, error: &E) -> Verdict {
        let message = error.message();
        let category = Self::categorize(&message, error.status());
        let mut verdict = Verdict::new(category);

        if category == ErrorCategory::RateLimit {
            verdict.retry_after = Some(error.retry_after().unwrap_or(self.rate_limit_retry_after));
        }

        verdict
    }

    /// Resolve the category for a message and optional status code
    pub fn categorize(message: &str, status: Option<u16>) -> ErrorCategory {
        let is = |code: u16| status == Some(code);

        if is(0) || NETWORK_PATTERN.is_match(message) {
            ErrorCategory::Network
        } else if status.is_some_and(|code| (500..600).contains(&code)) {
            ErrorCategory::Server
        } else if is(429) || RATE_LIMIT_PATTERN.is_match(message) {
            ErrorCategory::RateLimit
        } else if is(408) || TIMEOUT_PATTERN.is_match(message) {
            ErrorCategory::Timeout
        } else if THROTTLE_PATTERN.is_match(message) {
            ErrorCategory::Throttle
        } else if is(401) || AUTHENTICATION_PATTERN.is_match(message) {
            ErrorCategory::Authentication
        } else if is(403) || AUTHORIZATION_PATTERN.is_match(message) {
            ErrorCategory::Authorization
        } else if is(400) || VALIDATION_PATTERN.is_match(message) {
            ErrorCategory::Validation
        } else if is(404) || NOT_FOUND_PATTERN.is_match(message) {
            ErrorCategory::NotFound
        } else {
            ErrorCategory::Unknown
        }
    }
}

/// Classify with the default classifier
pub fn classify<E: FailureSignal + ?Sized>(error: &E) -> Verdict {
    ErrorClassifier::default().classify(error)
}
