//! Configuration validation utilities

use super::error::{ConfigError, ValidationError};
use super::schema::{RelayConfig, MAX_UPSTREAM_TIMEOUT_SECS};
use crate::providers::retry::MAX_TOTAL_BACKOFF;
use regex::Regex;
use url::Url;

/// Configuration validator with additional validation rules
pub struct ConfigValidator {
    /// Pattern for model identifiers usable in the endpoint path
    model_pattern: Regex,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self {
            model_pattern: Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$")
                .expect("model pattern is a valid regex"),
        }
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &RelayConfig) -> Result<(), ConfigError> {
        config.validate()?;

        self.validate_model(config)?;
        self.validate_base_url(config)?;
        self.validate_backoff(config)?;
        self.validate_timeout(config)?;

        Ok(())
    }

    fn validate_model(&self, config: &RelayConfig) -> Result<(), ValidationError> {
        if !self.model_pattern.is_match(&config.model) {
            return Err(ValidationError::malformed(
                "model",
                format!("'{}' is not a model identifier", config.model),
            ));
        }
        Ok(())
    }

    fn validate_base_url(&self, config: &RelayConfig) -> Result<(), ValidationError> {
        let url = Url::parse(&config.base_url)
            .map_err(|e| ValidationError::bad_url("base_url", e.to_string()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ValidationError::bad_url(
                "base_url",
                format!("scheme '{}' is not http or https", url.scheme()),
            ));
        }
        if url.query().is_some() {
            return Err(ValidationError::bad_url("base_url", "query strings are not allowed"));
        }
        Ok(())
    }

    fn validate_backoff(&self, config: &RelayConfig) -> Result<(), ValidationError> {
        let plan = &config.backoff;
        if plan.max_attempts == 0 {
            return Err(ValidationError::out_of_range(
                "backoff.max_attempts",
                "at least one attempt is required",
            ));
        }

        let budget = plan.total_budget();
        if budget > MAX_TOTAL_BACKOFF {
            return Err(ValidationError::out_of_range(
                "backoff",
                format!(
                    "total backoff of {}s exceeds the {}s limit; \
                     lower max_attempts or base_delay_ms",
                    budget.as_secs(),
                    MAX_TOTAL_BACKOFF.as_secs()
                ),
            ));
        }
        Ok(())
    }

    fn validate_timeout(&self, config: &RelayConfig) -> Result<(), ValidationError> {
        if config.upstream_timeout_secs == 0 {
            return Err(ValidationError::out_of_range(
                "upstream_timeout_secs",
                "must be at least 1 second",
            ));
        }
        if config.upstream_timeout_secs > MAX_UPSTREAM_TIMEOUT_SECS {
            return Err(ValidationError::out_of_range(
                "upstream_timeout_secs",
                format!("must be at most {} seconds", MAX_UPSTREAM_TIMEOUT_SECS),
            ));
        }
        Ok(())
    }
}
