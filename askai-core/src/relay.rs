//! Relay request handling
//!
//! [`RelayHandler::relay`] turns one prompt into at most
//! `backoff.max_attempts` upstream calls. Each call is recorded as an
//! [`AttemptRecord`] and classified. Rate limiting and transport failures are
//! retried on the linear backoff schedule. Any other rejection is returned at
//! once with the upstream's own status and body. A 2xx always ends the run,
//! with the extracted text or a fixed placeholder.

use crate::config::{ConfigError, RelayConfig};
use crate::http::{HttpClient, HttpExecutor, RequestOptions, UpstreamError};
use crate::providers::classify::{classify, error_kind, Classification, ErrorKind};
use crate::providers::gemini::{
    error_message, extract_answer, to_gemini_request, NO_TEXT_PLACEHOLDER,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Message for a missing, empty or non-string prompt
pub const PROMPT_REQUIRED: &str = "prompt is required (string)";

/// Advice attached to rate-limit failures
pub const RATE_LIMIT_TIP: &str = "Wait 30–60 seconds and try again.";

/// Inbound prompt, validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

impl PromptRequest {
    /// Validate a prompt string
    pub fn new(prompt: impl Into<String>) -> Result<Self, RelayError> {
        let prompt = prompt.into();
        if prompt.is_empty() {
            return Err(RelayError::prompt_required());
        }
        Ok(Self { prompt })
    }

    /// Validate an arbitrary JSON request body
    pub fn from_json(body: &Value) -> Result<Self, RelayError> {
        match body.get("prompt") {
            Some(Value::String(prompt)) => Self::new(prompt.clone()),
            _ => Err(RelayError::prompt_required()),
        }
    }
}

/// One upstream call, as observed by the relay
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    /// 1-based
    pub attempt_number: u32,
    pub http_status: Option<u16>,
    pub raw_body: Option<Value>,
    pub network_error: bool,
}

impl AttemptRecord {
    fn response(attempt_number: u32, status: u16, body: Value) -> Self {
        Self {
            attempt_number,
            http_status: Some(status),
            raw_body: Some(body),
            network_error: false,
        }
    }

    fn network_failure(attempt_number: u32) -> Self {
        Self {
            attempt_number,
            http_status: None,
            raw_body: None,
            network_error: true,
        }
    }

    pub fn classify(&self) -> Classification {
        classify(
            self.http_status,
            self.raw_body.as_ref().unwrap_or(&Value::Null),
            self.network_error,
        )
    }

    /// Taxonomy entry for a non-success attempt
    pub fn error_kind(&self) -> Option<ErrorKind> {
        error_kind(
            self.http_status,
            self.raw_body.as_ref().unwrap_or(&Value::Null),
            self.network_error,
        )
    }

    /// Raw body as JSON text, for error details
    fn raw_body_text(&self) -> String {
        self.raw_body
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default()
    }
}

/// Successful relay result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayAnswer {
    pub answer: String,

    /// The upstream answered 2xx but no text could be extracted
    #[serde(skip)]
    pub placeholder: bool,
}

/// Terminal failure of one relay invocation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RelayError {
    pub kind: ErrorKind,

    /// HTTP status to return to the client
    pub status: u16,

    /// Short human-readable message
    pub message: String,

    /// Upstream body or transport error, verbatim
    pub detail: Option<String>,
}

impl RelayError {
    pub fn prompt_required() -> Self {
        Self {
            kind: ErrorKind::ClientValidation,
            status: 400,
            message: PROMPT_REQUIRED.to_string(),
            detail: None,
        }
    }

    fn rate_limit_exhausted(last: &AttemptRecord) -> Self {
        Self {
            kind: ErrorKind::UpstreamRateLimited,
            status: 429,
            message: "Gemini rate limit (429): rate limit retries exhausted".to_string(),
            detail: Some(last.raw_body_text()),
        }
    }

    fn transport_exhausted(err: &UpstreamError) -> Self {
        Self {
            kind: ErrorKind::TransportFailure,
            status: 500,
            message: "Gemini API unreachable: retries exhausted".to_string(),
            detail: Some(err.to_string()),
        }
    }

    fn rejected(last: &AttemptRecord) -> Self {
        let status = last
            .http_status
            .filter(|s| (400..=599).contains(s))
            .unwrap_or(500);
        let reason = last
            .raw_body
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| "upstream rejected the request".to_string());

        Self {
            kind: ErrorKind::UpstreamRejected,
            status,
            message: format!("Gemini API failed ({}): {}", status, reason),
            detail: Some(last.raw_body_text()),
        }
    }

    /// Advice for the end user, when there is any
    pub fn tip(&self) -> Option<&'static str> {
        match self.kind {
            ErrorKind::UpstreamRateLimited => Some(RATE_LIMIT_TIP),
            _ => None,
        }
    }
}

/// Terminal outcome of one prompt
pub type RelayResult = Result<RelayAnswer, RelayError>;

/// A relay result with bookkeeping about how it was reached
#[derive(Debug, Clone)]
pub struct RelayOutcome {
    /// Correlates log lines and upstream `X-Request-ID` headers
    pub request_id: Uuid,

    /// Upstream calls issued
    pub attempts: u32,

    /// Total time spent in backoff waits
    pub waited: Duration,

    pub result: RelayResult,
}

/// Drives a prompt through the upstream with bounded retries
#[derive(Clone)]
pub struct RelayHandler {
    config: Arc<RelayConfig>,
    executor: Arc<dyn HttpExecutor>,
}

impl RelayHandler {
    /// Create a handler with a custom executor
    pub fn new(config: Arc<RelayConfig>, executor: Arc<dyn HttpExecutor>) -> Self {
        Self { config, executor }
    }

    /// Create a handler that talks to the configured upstream over HTTP
    pub fn from_config(config: RelayConfig) -> Result<Self, ConfigError> {
        let client = HttpClient::new(&config).map_err(|message| ConfigError::Client { message })?;
        Ok(Self::new(Arc::new(config), Arc::new(client)))
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Relay a prompt and return only the result
    pub async fn ask(&self, prompt: &str) -> RelayResult {
        self.relay(prompt).await.result
    }

    /// Relay a prompt to the upstream
    pub async fn relay(&self, prompt: &str) -> RelayOutcome {
        let request_id = Uuid::new_v4();

        let prompt = match PromptRequest::new(prompt) {
            Ok(prompt) => prompt,
            Err(err) => {
                return RelayOutcome {
                    request_id,
                    attempts: 0,
                    waited: Duration::ZERO,
                    result: Err(err),
                }
            }
        };

        let request = to_gemini_request(&prompt.prompt);
        let plan = self.config.backoff;
        let mut waited = Duration::ZERO;
        let mut attempt = 1;

        loop {
            let options = RequestOptions::new(request_id, attempt)
                .with_timeout(self.config.upstream_timeout());

            let (record, transport_error) =
                match self.executor.execute_json(&request, &options).await {
                    Ok(reply) => (AttemptRecord::response(attempt, reply.status, reply.body), None),
                    Err(err) => (AttemptRecord::network_failure(attempt), Some(err)),
                };

            let classification = record.classify();
            let result = match classification {
                Classification::Success => Ok(Self::normalize(&record, request_id)),
                Classification::Retryable if plan.has_attempts_left(attempt) => {
                    let delay = plan.delay_for_attempt(attempt);
                    warn!(
                        "Attempt {}/{} failed ({}); waiting {}ms [request_id: {}]",
                        attempt,
                        plan.max_attempts,
                        record
                            .error_kind()
                            .unwrap_or(ErrorKind::UpstreamRateLimited),
                        delay.as_millis(),
                        request_id
                    );
                    tokio::time::sleep(delay).await;
                    waited += delay;
                    attempt += 1;
                    continue;
                }
                Classification::Retryable => match &transport_error {
                    Some(err) => Err(RelayError::transport_exhausted(err)),
                    None => Err(RelayError::rate_limit_exhausted(&record)),
                },
                Classification::FatalUpstream | Classification::FatalClient => {
                    Err(RelayError::rejected(&record))
                }
            };

            match &result {
                Ok(_) => info!(
                    "Relay succeeded after {} attempt(s) [request_id: {}]",
                    attempt, request_id
                ),
                Err(err) => warn!(
                    "Relay failed after {} attempt(s): {} ({}) [request_id: {}]",
                    attempt, err.kind, err.status, request_id
                ),
            }

            return RelayOutcome {
                request_id,
                attempts: attempt,
                waited,
                result,
            };
        }
    }

    fn normalize(record: &AttemptRecord, request_id: Uuid) -> RelayAnswer {
        match record.raw_body.as_ref().and_then(extract_answer) {
            Some(answer) => RelayAnswer {
                answer,
                placeholder: false,
            },
            None => {
                warn!(
                    "2xx response without text ({}) [request_id: {}]",
                    ErrorKind::UpstreamUnparseable,
                    request_id
                );
                RelayAnswer {
                    answer: NO_TEXT_PLACEHOLDER.to_string(),
                    placeholder: true,
                }
            }
        }
    }
}
