//! Classification of upstream attempts
//!
//! Every upstream call ends in exactly one [`Classification`]. Only rate
//! limiting and transport failures are worth another attempt; anything else
//! the upstream rejects is surfaced to the caller as-is.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Phrase the upstream uses for rate limiting when it does not send a 429
const RATE_LIMIT_PHRASE: &str = "too many requests";

/// Verdict for a single upstream attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// 2xx; the body goes to the normalizer
    Success,
    /// Rate limited or no response at all; worth another attempt
    Retryable,
    /// The end user's input was rejected before reaching the upstream
    FatalClient,
    /// The upstream rejected the call and retrying will not help
    FatalUpstream,
}

/// Error taxonomy reported to operators and clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad or missing prompt; never retried, never forwarded
    ClientValidation,
    /// Rate limited by the upstream
    UpstreamRateLimited,
    /// Any other non-2xx answer from the upstream
    UpstreamRejected,
    /// 2xx without extractable text; answered with a placeholder
    UpstreamUnparseable,
    /// No response reached the relay
    TransportFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ClientValidation => "client_validation",
            Self::UpstreamRateLimited => "upstream_rate_limited",
            Self::UpstreamRejected => "upstream_rejected",
            Self::UpstreamUnparseable => "upstream_unparseable",
            Self::TransportFailure => "transport_failure",
        };
        f.write_str(name)
    }
}

/// Classify one upstream attempt.
///
/// `status` is `None` when no HTTP response was received.
pub fn classify(status: Option<u16>, body: &Value, network_error: bool) -> Classification {
    if network_error {
        return Classification::Retryable;
    }

    match status {
        Some(429) => Classification::Retryable,
        Some(200..=299) => Classification::Success,
        _ if mentions_rate_limit(body) => Classification::Retryable,
        _ => Classification::FatalUpstream,
    }
}

/// Map a non-success classification of an attempt to the error taxonomy
pub fn error_kind(status: Option<u16>, body: &Value, network_error: bool) -> Option<ErrorKind> {
    match classify(status, body, network_error) {
        Classification::Success => None,
        Classification::FatalClient => Some(ErrorKind::ClientValidation),
        Classification::FatalUpstream => Some(ErrorKind::UpstreamRejected),
        Classification::Retryable if network_error => Some(ErrorKind::TransportFailure),
        Classification::Retryable => Some(ErrorKind::UpstreamRateLimited),
    }
}

/// Case-insensitive search for the rate-limit phrase in any string in the body
pub fn mentions_rate_limit(body: &Value) -> bool {
    match body {
        Value::String(s) => s.to_lowercase().contains(RATE_LIMIT_PHRASE),
        Value::Array(items) => items.iter().any(mentions_rate_limit),
        Value::Object(map) => map
            .iter()
            .any(|(k, v)| k.to_lowercase().contains(RATE_LIMIT_PHRASE) || mentions_rate_limit(v)),
        _ => false,
    }
}
