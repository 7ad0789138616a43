//! Transport error mapping

use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// A call that produced no HTTP response
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// The call exceeded its timeout
    #[error("Request timed out after {timeout:?} [request_id: {request_id}]")]
    Timeout { timeout: Duration, request_id: Uuid },

    /// Could not connect to the upstream
    #[error("Connection failed: {message} [request_id: {request_id}]")]
    Connect { message: String, request_id: Uuid },

    /// Any other failure before a response arrived
    #[error("Network error: {message} [request_id: {request_id}]")]
    Network { message: String, request_id: Uuid },
}

impl UpstreamError {
    /// Map a reqwest send error for the call `request_id`
    pub fn from_reqwest(err: &reqwest::Error, timeout: Duration, request_id: Uuid) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout {
                timeout,
                request_id,
            }
        } else if err.is_connect() {
            UpstreamError::Connect {
                message: err.without_url_string(),
                request_id,
            }
        } else {
            UpstreamError::Network {
                message: err.without_url_string(),
                request_id,
            }
        }
    }
}

/// Display a reqwest error without the URL, which may carry the credential
trait WithoutUrl {
    fn without_url_string(&self) -> String;
}

impl WithoutUrl for reqwest::Error {
    fn without_url_string(&self) -> String {
        let mut message = String::new();
        let mut source = StdError::source(self);
        while let Some(err) = source {
            if !message.is_empty() {
                message.push_str(": ");
            }
            message.push_str(&err.to_string());
            source = err.source();
        }
        if message.is_empty() {
            "request failed".to_string()
        } else {
            message
        }
    }
}
