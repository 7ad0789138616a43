//! Upstream provider policy
//!
//! This module holds the decisions the relay makes about upstream responses:
//! how an attempt is classified, how long to back off between attempts, and
//! how the Gemini wire format maps to plain answer text.

pub mod classify;
pub mod gemini;
pub mod retry;

pub use classify::{classify, Classification, ErrorKind};
pub use gemini::{extract_answer, NO_TEXT_PLACEHOLDER};
pub use retry::BackoffPlan;
