//! Configuration schema structures with serde support

use super::error::{ConfigError, ValidationError};
use super::secrets::SecretString;
use crate::http::DEFAULT_UPSTREAM_TIMEOUT;
use crate::providers::retry::BackoffPlan;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable holding the upstream credential
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Longest accepted per-call upstream timeout
pub const MAX_UPSTREAM_TIMEOUT_SECS: u64 = 60;

/// Immutable relay configuration, built once at startup
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Upstream credential (supports `${VAR}` interpolation in files)
    pub api_key: SecretString,

    /// Model identifier used in the endpoint path
    #[serde(default = "default_model")]
    pub model: String,

    /// Scheme and host of the upstream API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// How the credential is attached to each call
    #[serde(default)]
    pub credential_mode: CredentialMode,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Attempt budget and delays
    #[serde(default)]
    pub backoff: BackoffPlan,
}

/// How the credential reaches the upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialMode {
    /// `?key=` query parameter
    #[default]
    Query,
    /// `x-goog-api-key` header
    Header,
}

impl fmt::Display for CredentialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => f.write_str("query"),
            Self::Header => f.write_str("header"),
        }
    }
}

impl FromStr for CredentialMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "query" => Ok(Self::Query),
            "header" => Ok(Self::Header),
            other => Err(format!("expected 'query' or 'header', got '{}'", other)),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT.as_secs()
}

impl RelayConfig {
    /// Configuration with defaults for everything but the credential
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            api_key: api_key.into(),
            model: default_model(),
            base_url: default_base_url(),
            credential_mode: CredentialMode::default(),
            upstream_timeout_secs: default_timeout_secs(),
            backoff: BackoffPlan::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_credential_mode(mut self, mode: CredentialMode) -> Self {
        self.credential_mode = mode;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPlan) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout_secs = timeout.as_secs();
        self
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Longest a single relay invocation can take: every call timing out plus every wait
    pub fn worst_case_duration(&self) -> Duration {
        self.upstream_timeout()
            .saturating_mul(self.backoff.max_attempts)
            .saturating_add(self.backoff.total_budget())
    }

    /// Full `generateContent` URL, without the credential
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Built-in validation of required fields
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingCredential {
                var: API_KEY_VAR.to_string(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(ValidationError::blank("model").into());
        }
        if self.base_url.trim().is_empty() {
            return Err(ValidationError::blank("base_url").into());
        }
        Ok(())
    }
}
