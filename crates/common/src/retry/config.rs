//! Retry configuration
//!
//! [`RetryConfig`] is immutable once built: every constructor path (builder,
//! TOML, serde, partial update) runs [`RetryConfig::validate`] and hands back a
//! fresh value. Durations are exchanged as integer milliseconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};
use crate::retry::constants::*;
use crate::utils::serde::{duration_millis, option_duration_millis};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RetryConfigUpdate")]
pub struct RetryConfig {
    max_attempts: u32,
    #[serde(rename = "base_delay_ms", with = "duration_millis")]
    base_delay: Duration,
    #[serde(rename = "max_delay_ms", with = "duration_millis")]
    max_delay: Duration,
    backoff_multiplier: f64,
    jitter_factor: f64,
    #[serde(rename = "total_timeout_ms", with = "duration_millis")]
    total_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter_factor: DEFAULT_JITTER_FACTOR,
            total_timeout: DEFAULT_TOTAL_TIMEOUT,
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder seeded with the defaults
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Parse a configuration from TOML, filling missing keys with defaults
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use retryline_common::retry::RetryConfig;
    ///
    /// let config = RetryConfig::from_toml_str("max_attempts = 5\nbase_delay_ms = 250").unwrap();
    /// assert_eq!(config.max_attempts(), 5);
    /// assert_eq!(config.base_delay(), Duration::from_millis(250));
    /// ```
    pub fn from_toml_str(input: &str) -> CommonResult<Self> {
        let update: RetryConfigUpdate = toml::from_str(input)?;
        Self::default().apply(&update)
    }

    /// Maximum number of attempts, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the second attempt, before jitter
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Upper bound for any single delay, including explicit retry hints
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    pub fn jitter_factor(&self) -> f64 {
        self.jitter_factor
    }

    /// Wall-clock budget for a whole execution
    pub fn total_timeout(&self) -> Duration {
        self.total_timeout
    }

    /// Validate the configuration
    pub fn validate(&self) -> CommonResult<()> {
        if self.max_attempts < MIN_MAX_ATTEMPTS {
            return Err(CommonError::config_field(
                "max_attempts",
                format!("must be at least {}, got {}", MIN_MAX_ATTEMPTS, self.max_attempts),
            ));
        }

        if self.base_delay > self.max_delay {
            return Err(CommonError::config_field(
                "base_delay",
                format!(
                    "base_delay ({:?}) cannot be greater than max_delay ({:?})",
                    self.base_delay, self.max_delay
                ),
            ));
        }

        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier <= 1.0 {
            return Err(CommonError::config_field(
                "backoff_multiplier",
                format!("must be a finite value greater than 1, got {}", self.backoff_multiplier),
            ));
        }

        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(CommonError::config_field(
                "jitter_factor",
                format!("must be within [0, 1], got {}", self.jitter_factor),
            ));
        }

        if self.total_timeout.is_zero() {
            return Err(CommonError::config_field("total_timeout", "must be greater than zero"));
        }

        Ok(())
    }

    /// Produce a new validated configuration with the update's fields applied
    ///
    /// `self` is left untouched; unset fields keep their current values.
    pub fn apply(&self, update: &RetryConfigUpdate) -> CommonResult<Self> {
        let config = Self {
            max_attempts: update.max_attempts.unwrap_or(self.max_attempts),
            base_delay: update.base_delay.unwrap_or(self.base_delay),
            max_delay: update.max_delay.unwrap_or(self.max_delay),
            backoff_multiplier: update.backoff_multiplier.unwrap_or(self.backoff_multiplier),
            jitter_factor: update.jitter_factor.unwrap_or(self.jitter_factor),
            total_timeout: update.total_timeout.unwrap_or(self.total_timeout),
        };
        config.validate()?;
        Ok(config)
    }
}

impl TryFrom<RetryConfigUpdate> for RetryConfig {
    type Error = CommonError;

    fn try_from(update: RetryConfigUpdate) -> Result<Self, Self::Error> {
        Self::default().apply(&update)
    }
}

/// Partial configuration used for updates and for loading sparse files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfigUpdate {
    pub max_attempts: Option<u32>,
    #[serde(rename = "base_delay_ms", with = "option_duration_millis")]
    pub base_delay: Option<Duration>,
    #[serde(rename = "max_delay_ms", with = "option_duration_millis")]
    pub max_delay: Option<Duration>,
    pub backoff_multiplier: Option<f64>,
    pub jitter_factor: Option<f64>,
    #[serde(rename = "total_timeout_ms", with = "option_duration_millis")]
    pub total_timeout: Option<Duration>,
}

impl RetryConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = Some(delay);
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = Some(factor);
        self
    }

    pub fn total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = Some(timeout);
        self
    }

    /// Whether the update leaves every field unchanged
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Builder for RetryConfig with fluent API
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    update: RetryConfigUpdate,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.update.max_attempts = Some(attempts);
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.update.base_delay = Some(delay);
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.update.max_delay = Some(delay);
        self
    }

    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.update.backoff_multiplier = Some(multiplier);
        self
    }

    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.update.jitter_factor = Some(factor);
        self
    }

    /// Disable jitter so delays follow the exponential curve exactly
    pub fn no_jitter(self) -> Self {
        self.jitter_factor(0.0)
    }

    pub fn total_timeout(mut self, timeout: Duration) -> Self {
        self.update.total_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> CommonResult<RetryConfig> {
        RetryConfig::default().apply(&self.update)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for retry configuration validation, updates and loading.
    use super::*;

    /// Validates `RetryConfig::default` behavior for the retry config default
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms each field equals its constant default.
    /// - Ensures `config.validate().is_ok()` evaluates to true.
    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();

        assert_eq!(config.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.base_delay(), DEFAULT_BASE_DELAY);
        assert_eq!(config.max_delay(), DEFAULT_MAX_DELAY);
        assert_eq!(config.backoff_multiplier(), DEFAULT_BACKOFF_MULTIPLIER);
        assert_eq!(config.jitter_factor(), DEFAULT_JITTER_FACTOR);
        assert_eq!(config.total_timeout(), DEFAULT_TOTAL_TIMEOUT);
        assert!(config.validate().is_ok());
    }

    /// Tests builder pattern for retry configuration
    #[test]
    fn test_retry_config_builder() {
        let config = RetryConfig::builder()
            .max_attempts(5)
            .base_delay(Duration::from_millis(200))
            .max_delay(Duration::from_secs(5))
            .backoff_multiplier(3.0)
            .no_jitter()
            .total_timeout(Duration::from_secs(60))
            .build()
            .expect("Builder should create valid config");

        assert_eq!(config.max_attempts(), 5);
        assert_eq!(config.base_delay(), Duration::from_millis(200));
        assert_eq!(config.max_delay(), Duration::from_secs(5));
        assert_eq!(config.backoff_multiplier(), 3.0);
        assert_eq!(config.jitter_factor(), 0.0);
        assert_eq!(config.total_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_builder_rejects_zero_attempts() {
        let err = RetryConfig::builder().max_attempts(0).build().unwrap_err();
        assert!(err.is_config_field("max_attempts"));

    }

    /// Large attempt budgets are accepted; only zero is rejected.
    #[test]
    fn test_builder_accepts_large_attempt_counts() {
        for max_attempts in [101, 500, u32::MAX] {
            let config = RetryConfig::builder().max_attempts(max_attempts).build().unwrap();
            assert_eq!(config.max_attempts(), max_attempts);
        }
    }

    /// Validates that base delay may not exceed the cap.
    #[test]
    fn test_builder_rejects_base_above_max() {
        let err = RetryConfig::builder()
            .base_delay(Duration::from_secs(10))
            .max_delay(Duration::from_secs(5))
            .build()
            .unwrap_err();
        assert!(err.is_config_field("base_delay"));
    }

    #[test]
    fn test_builder_rejects_bad_multiplier() {
        for multiplier in [1.0, 0.5, -2.0, f64::NAN, f64::INFINITY] {
            let err = RetryConfig::builder().backoff_multiplier(multiplier).build().unwrap_err();
            assert!(err.is_config_field("backoff_multiplier"), "multiplier {multiplier}");
        }
    }

    #[test]
    fn test_builder_rejects_bad_jitter() {
        for factor in [-0.1, 1.5, f64::NAN] {
            let err = RetryConfig::builder().jitter_factor(factor).build().unwrap_err();
            assert!(err.is_config_field("jitter_factor"), "factor {factor}");
        }
        assert!(RetryConfig::builder().jitter_factor(1.0).build().is_ok());
    }

    #[test]
    fn test_builder_rejects_zero_total_timeout() {
        let err = RetryConfig::builder().total_timeout(Duration::ZERO).build().unwrap_err();
        assert!(err.is_config_field("total_timeout"));
    }

    /// Tests that applying an update leaves the original untouched
    #[test]
    fn test_apply_returns_new_instance() {
        let original = RetryConfig::default();
        let update = RetryConfigUpdate::new().max_attempts(7).jitter_factor(0.0);

        let updated = original.apply(&update).unwrap();

        assert_eq!(updated.max_attempts(), 7);
        assert_eq!(updated.jitter_factor(), 0.0);
        assert_eq!(updated.base_delay(), original.base_delay());
        assert_eq!(original, RetryConfig::default());
    }

    #[test]
    fn test_apply_validates_result() {
        let update = RetryConfigUpdate::new().max_delay(Duration::from_millis(10));
        assert!(RetryConfig::default().apply(&update).is_err());
    }

    #[test]
    fn test_update_is_empty() {
        assert!(RetryConfigUpdate::new().is_empty());
        assert!(!RetryConfigUpdate::new().total_timeout(Duration::from_secs(1)).is_empty());
    }

    /// Validates sparse TOML files fall back to defaults for missing keys.
    #[test]
    fn test_from_toml_sparse() {
        let config = RetryConfig::from_toml_str(
            r#"
            max_attempts = 4
            max_delay_ms = 10000
            jitter_factor = 0.25
            "#,
        )
        .unwrap();

        assert_eq!(config.max_attempts(), 4);
        assert_eq!(config.max_delay(), Duration::from_secs(10));
        assert_eq!(config.jitter_factor(), 0.25);
        assert_eq!(config.base_delay(), DEFAULT_BASE_DELAY);
        assert_eq!(config.total_timeout(), DEFAULT_TOTAL_TIMEOUT);
    }

    #[test]
    fn test_from_toml_rejects_unknown_and_invalid() {
        let err = RetryConfig::from_toml_str("max_retries = 4").unwrap_err();
        assert!(matches!(err, CommonError::Serialization { .. }));

        let err = RetryConfig::from_toml_str("max_attempts = 0").unwrap_err();
        assert!(err.is_config_field("max_attempts"));
    }

    /// Tests the serde representation uses millisecond field names
    #[test]
    fn test_json_representation() {
        let config = RetryConfig::builder()
            .base_delay(Duration::from_millis(500))
            .build()
            .unwrap();

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["base_delay_ms"], 500);
        assert_eq!(json["max_delay_ms"], 30_000);
        assert_eq!(json["total_timeout_ms"], 300_000);

        let parsed: RetryConfig = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_json_deserialize_validates() {
        let result: Result<RetryConfig, _> =
            serde_json::from_str(r#"{"max_attempts":0,"base_delay_ms":10}"#);
        assert!(result.is_err());
    }
}
