//! Gemini provider support
//!
//! Wire types for `generateContent` and the conversion between a plain prompt,
//! the request body, and the normalized answer text.

pub mod converter;
pub mod types;

pub use converter::{error_message, extract_answer, to_gemini_request, NO_TEXT_PLACEHOLDER};
pub use types::{GenerateContentRequest, GenerateContentResponse};
