//! Conversion between prompts, Gemini request bodies and answer text

use super::types::*;
use serde::Deserialize;
use serde_json::Value;

/// Answer returned when a 2xx body has no text to extract
pub const NO_TEXT_PLACEHOLDER: &str = "No text returned from Gemini";

/// Build a single-turn `generateContent` request for a prompt
pub fn to_gemini_request(prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![GeminiContent {
            role: None,
            parts: Some(vec![GeminiPart {
                text: Some(prompt.to_string()),
            }]),
        }],
    }
}

/// Extract the answer text from a `generateContent` response body.
///
/// Follows `candidates[0].content.parts[*].text` and concatenates every text
/// part of the first candidate in order. Returns `None` if any level is
/// missing or the concatenation is empty.
pub fn extract_answer(body: &Value) -> Option<String> {
    let response = GenerateContentResponse::deserialize(body).ok()?;
    let candidate = response.candidates?.into_iter().next()?;
    let parts = candidate.content?.parts?;

    let texts: Vec<String> = parts.into_iter().filter_map(|part| part.text).collect();
    if texts.is_empty() {
        return None;
    }

    let answer = texts.concat();
    if answer.is_empty() {
        None
    } else {
        Some(answer)
    }
}

/// Pull the human-readable message out of a Google error envelope
pub fn error_message(body: &Value) -> Option<String> {
    GeminiErrorEnvelope::deserialize(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
}
