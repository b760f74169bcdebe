//! Integration tests for failure classification and retry configuration
//!
//! Exercises the foundation tier from a downstream crate's point of view:
//! custom error types implementing `FailureSignal`, structured
//! `OperationError`s wrapping sources, and configuration loaded from TOML.

#![cfg(feature = "foundation")]

use std::borrow::Cow;
use std::error::Error as _;
use std::time::Duration;

use retryline_common::retry::{
    classify, ErrorCategory, ErrorClassifier, FailureSignal, OperationError, RetryConfig,
    RetryConfigUpdate,
};
use retryline_common::{CommonError, ErrorClassification, ErrorSeverity};

/// Error type as a downstream HTTP client might define it
#[derive(Debug)]
struct ApiFailure {
    code: u16,
    body: &'static str,
    retry_after_secs: Option<u64>,
}

impl FailureSignal for ApiFailure {
    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.body)
    }

    fn status(&self) -> Option<u16> {
        Some(self.code)
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after_secs.map(Duration::from_secs)
    }
}

fn api(code: u16, body: &'static str) -> ApiFailure {
    ApiFailure { code, body, retry_after_secs: None }
}

/// Validates classification of a downstream error type across status codes.
///
/// Assertions:
/// - Status-driven categories resolve without any matching text.
/// - Retryability follows the category.
#[test]
fn test_custom_failure_signal_statuses() {
    let cases = [
        (0, ErrorCategory::Network, true),
        (500, ErrorCategory::Server, true),
        (503, ErrorCategory::Server, true),
        (429, ErrorCategory::RateLimit, true),
        (408, ErrorCategory::Timeout, true),
        (401, ErrorCategory::Authentication, false),
        (403, ErrorCategory::Authorization, false),
        (400, ErrorCategory::Validation, false),
        (404, ErrorCategory::NotFound, false),
        (409, ErrorCategory::Unknown, true),
    ];

    for (code, category, retryable) in cases {
        let verdict = classify(&api(code, "request failed"));
        assert_eq!(verdict.category, category, "status {code}");
        assert_eq!(verdict.is_retryable, retryable, "status {code}");
    }
}

/// Text signals outrank later status rules in priority order.
#[test]
fn test_message_and_status_priority() {
    // Network text beats every status
    assert_eq!(classify(&api(404, "DNS lookup failed")).category, ErrorCategory::Network);
    // 5xx beats rate-limit text
    assert_eq!(classify(&api(502, "rate limit reached upstream")).category, ErrorCategory::Server);
    // Rate-limit text beats 401
    assert_eq!(classify(&api(401, "quota exceeded")).category, ErrorCategory::RateLimit);
    // Timeout text beats 403
    assert_eq!(classify(&api(403, "request timed out")).category, ErrorCategory::Timeout);
    // Authentication text beats 404
    assert_eq!(classify(&api(404, "unauthorized")).category, ErrorCategory::Authentication);
    // Status 400 is always validation
    assert_eq!(classify(&api(400, "bad request")).category, ErrorCategory::Validation);
    // "throttle" text lands on rate limit
    assert_eq!(classify(&api(200, "Throttled by upstream")).category, ErrorCategory::RateLimit);
}

#[test]
fn test_rate_limit_hints() {
    let hinted = ApiFailure { code: 429, body: "slow down", retry_after_secs: Some(7) };
    assert_eq!(classify(&hinted).retry_after, Some(Duration::from_secs(7)));

    let classifier = ErrorClassifier::new().with_rate_limit_retry_after(Duration::from_secs(15));
    assert_eq!(classifier.classify(&api(429, "slow down")).retry_after, Some(Duration::from_secs(15)));

    // Hints on other categories are ignored
    let server = ApiFailure { code: 503, body: "busy", retry_after_secs: Some(7) };
    assert_eq!(classify(&server).retry_after, None);
}

/// `OperationError` keeps its source chain and classifies itself.
#[test]
fn test_operation_error_wraps_source() {
    let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "socket read");
    let err = OperationError::new("upstream connection reset").with_status(502).with_source(io);

    assert_eq!(err.to_string(), "upstream connection reset");
    assert_eq!(err.status(), Some(502));
    assert!(err.source().is_some());
    assert!(err.is_retryable());
    assert_eq!(classify(&err).category, ErrorCategory::Network);

    let denied = OperationError::http(403, "nope");
    assert!(!denied.is_retryable());
    assert_eq!(denied.severity(), ErrorCategory::Authorization.severity());
}

#[test]
fn test_common_error_signals() {
    let timeout = CommonError::timeout("sync", Duration::from_secs(3));
    assert_eq!(classify(&timeout).category, ErrorCategory::Timeout);
    assert!(timeout.is_retryable());

    let config = CommonError::config_field("max_attempts", "must be at least 1");
    assert_eq!(classify(&config).category, ErrorCategory::Unknown);
    assert!(!config.is_retryable());
    assert!(config.is_config_field("max_attempts"));

    let internal = CommonError::internal("loop exited");
    assert!(internal.is_critical());
    assert_eq!(internal.severity(), ErrorSeverity::Critical);
}

/// Every category has a stable snake_case name that round-trips through serde.
#[test]
fn test_category_names_round_trip() {
    for category in ErrorCategory::ALL {
        let json = serde_json::to_string(&category).unwrap();
        assert_eq!(json, format!("\"{}\"", category.as_str()));
        let back: ErrorCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, category);
    }
}

/// Validates configuration loading from a TOML document.
///
/// Assertions:
/// - Missing fields fall back to defaults.
/// - Durations are read as milliseconds.
#[test]
fn test_config_from_toml_document() {
    let config = RetryConfig::from_toml_str(
        r#"
        max_attempts = 5
        base_delay_ms = 250
        jitter_factor = 0.0
        "#,
    )
    .unwrap();

    assert_eq!(config.max_attempts(), 5);
    assert_eq!(config.base_delay(), Duration::from_millis(250));
    assert_eq!(config.jitter_factor(), 0.0);
    assert_eq!(config.max_delay(), RetryConfig::default().max_delay());
    assert_eq!(config.total_timeout(), RetryConfig::default().total_timeout());
}

#[test]
fn test_config_from_toml_rejects_invalid_values() {
    let err = RetryConfig::from_toml_str("max_attempts = 0").unwrap_err();
    assert!(err.is_config_field("max_attempts"));

    let err = RetryConfig::from_toml_str("base_delay_ms = 60000\nmax_delay_ms = 1000").unwrap_err();
    assert!(matches!(err, CommonError::Config { .. }));

    assert!(RetryConfig::from_toml_str("retries = 3").is_err());
    assert!(RetryConfig::from_toml_str("max_attempts = \"three\"").is_err());
}

/// Updates produce new validated instances and leave the source untouched.
#[test]
fn test_config_update_is_copy_on_write() {
    let original = RetryConfig::default();
    let update = RetryConfigUpdate::new().max_attempts(7).jitter_factor(0.25);

    let updated = original.apply(&update).unwrap();

    assert_eq!(updated.max_attempts(), 7);
    assert_eq!(updated.jitter_factor(), 0.25);
    assert_eq!(original, RetryConfig::default());

    let rejected = original.apply(&RetryConfigUpdate::new().backoff_multiplier(1.0));
    assert!(rejected.unwrap_err().is_config_field("backoff_multiplier"));
}
