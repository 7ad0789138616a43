//! AskAI Core Library
//!
//! This crate relays chat prompts to the Gemini `generateContent` API. It
//! retries rate-limited and unreachable calls on a linear backoff, passes other
//! upstream rejections through unchanged, and normalizes successful responses
//! to plain text.

pub mod config;
pub mod http;
pub mod providers;
pub mod relay;

pub use config::{ConfigError, CredentialMode, RelayConfig};
pub use providers::{BackoffPlan, Classification, ErrorKind};
pub use relay::{
    PromptRequest, RelayAnswer, RelayError, RelayHandler, RelayOutcome, RelayResult,
    PROMPT_REQUIRED, RATE_LIMIT_TIP,
};

/// Returns the version of the AskAI Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
