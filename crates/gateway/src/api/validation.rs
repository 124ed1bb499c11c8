// Input validation for gateway APIs
//
// Last-resort limits guarding the event store and the AI providers from
// abuse. These are hard limits, not configurable.

use phoenix_core::Payload;

// =============================================================================
// Input Size Limits
// =============================================================================

/// Maximum size for a stream id
pub const MAX_STREAM_ID_BYTES: usize = 256;

/// Maximum size for an event type tag
pub const MAX_EVENT_TYPE_BYTES: usize = 128;

/// Maximum serialized size of an event payload.
pub const MAX_PAYLOAD_BYTES: usize = 256 * 1024; // 256 KB

/// Maximum size of a generation prompt or text to validate
pub const MAX_PROMPT_BYTES: usize = 64 * 1024; // 64 KB

/// Maximum page size for event polling
pub const MAX_POLL_LIMIT: usize = 1000;

/// Generic message for size violations.
/// Intentionally vague to avoid leaking which field exceeded limits.
pub const VALIDATION_ERROR_MESSAGE: &str = "Input exceeds allowed limits";

// =============================================================================
// Validation Functions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A size limit was exceeded
    TooLarge,
    /// Malformed input
    Invalid(&'static str),
}

pub fn validate_stream_id(stream_id: &str) -> Result<(), ValidationError> {
    if stream_id.trim().is_empty() {
        return Err(ValidationError::Invalid("stream_id must not be empty"));
    }
    if stream_id.len() > MAX_STREAM_ID_BYTES {
        tracing::warn!(
            "Stream id exceeds limit: {} bytes (max: {})",
            stream_id.len(),
            MAX_STREAM_ID_BYTES
        );
        return Err(ValidationError::TooLarge);
    }
    if stream_id.chars().any(char::is_control) {
        return Err(ValidationError::Invalid(
            "stream_id must not contain control characters",
        ));
    }
    Ok(())
}

/// Event types are identifiers such as "LetterGenerated"
pub fn validate_event_type(event_type: &str) -> Result<(), ValidationError> {
    if event_type.is_empty() {
        return Err(ValidationError::Invalid("event_type must not be empty"));
    }
    if event_type.len() > MAX_EVENT_TYPE_BYTES {
        return Err(ValidationError::TooLarge);
    }
    if !event_type
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
    {
        return Err(ValidationError::Invalid(
            "event_type may only contain letters, digits, '_', '.' and '-'",
        ));
    }
    Ok(())
}

pub fn validate_payload(payload: &Payload) -> Result<(), ValidationError> {
    let size = serde_json::to_vec(payload).map(|b| b.len()).unwrap_or(usize::MAX);
    if size > MAX_PAYLOAD_BYTES {
        tracing::warn!(
            "Event payload exceeds limit: {} bytes (max: {})",
            size,
            MAX_PAYLOAD_BYTES
        );
        return Err(ValidationError::TooLarge);
    }
    Ok(())
}

pub fn validate_prompt(prompt: &str) -> Result<(), ValidationError> {
    if prompt.len() > MAX_PROMPT_BYTES {
        tracing::warn!(
            "Prompt exceeds limit: {} bytes (max: {})",
            prompt.len(),
            MAX_PROMPT_BYTES
        );
        return Err(ValidationError::TooLarge);
    }
    Ok(())
}
