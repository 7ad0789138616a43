//! HTTP layer for calls to the upstream generative-text API
//!
//! This module implements the transport between the relay and the upstream:
//! - A single `generateContent` POST per attempt
//! - Credential delivery by header or query parameter
//! - Tolerant body parsing (non-JSON bodies become `{}`)
//! - Request ID propagation for log correlation

pub mod client;
pub mod error;

pub use client::HttpClient;
pub use error::UpstreamError;

use crate::providers::gemini::GenerateContentRequest;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;
use uuid::Uuid;

/// Default per-call timeout
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(15);

/// Options for a single upstream call
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Request ID of the relay invocation this call belongs to
    pub request_id: Uuid,

    /// 1-based attempt number within the invocation
    pub attempt: u32,

    /// Timeout for this call
    pub timeout: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            attempt: 1,
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }
}

impl RequestOptions {
    /// Options for `attempt` of the invocation `request_id`
    pub fn new(request_id: Uuid, attempt: u32) -> Self {
        Self {
            request_id,
            attempt,
            ..Default::default()
        }
    }

    /// Set the timeout for this call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// What came back from the upstream when it answered at all
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    /// HTTP status code
    pub status: u16,

    /// Parsed body; `{}` when the body was empty or not JSON
    pub body: Value,
}

/// Trait for upstream executors
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Issue one `generateContent` call.
    ///
    /// Returns `Ok` whenever an HTTP response arrived, whatever its status.
    /// `Err` means no response reached the relay.
    async fn execute_json(
        &self,
        request: &GenerateContentRequest,
        options: &RequestOptions,
    ) -> Result<UpstreamReply, UpstreamError>;
}

/// Parse a response body, tolerating empty or non-JSON payloads
pub fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Object(Map::new());
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::Object(Map::new()))
}
