use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure classes surfaced by the generation engine.
///
/// Every code except `ContentFiltered` is retryable; see [`ErrorCode::is_retryable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    GenerationFailed,
    InvalidResponse,
    Timeout,
    ContentFiltered,
    RateLimited,
    ModelUnavailable,
}

impl ErrorCode {
    /// Content filtering is deterministic for a given prompt, so repeating the call is pointless.
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorCode::ContentFiltered)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::GenerationFailed => "GENERATION_FAILED",
            ErrorCode::InvalidResponse => "INVALID_RESPONSE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::ContentFiltered => "CONTENT_FILTERED",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::ModelUnavailable => "MODEL_UNAVAILABLE",
        }
    }

    /// Default user-facing hint for callers that have no task-specific wording.
    pub fn user_hint(self) -> &'static str {
        match self {
            ErrorCode::GenerationFailed => "The AI service could not complete the request.",
            ErrorCode::InvalidResponse => "The AI service returned an unexpected result. Please try again.",
            ErrorCode::Timeout => "The AI service took too long to respond. Please try again.",
            ErrorCode::ContentFiltered => "The request was blocked by the content filter. Please rephrase it.",
            ErrorCode::RateLimited => "Too many requests right now. Try again shortly.",
            ErrorCode::ModelUnavailable => "The selected model is unavailable. Try another model.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single error type of the engine: a code, a message and optional details.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct GenerationError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl GenerationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn generation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::GenerationFailed, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidResponse, message)
    }

    pub fn timeout(after_ms: u128) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("Operation timed out after {after_ms}ms"),
        )
    }

    pub fn content_filtered(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ContentFiltered, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenerationError::new(ErrorCode::Timeout, format!("HTTP request timed out: {e}"))
        } else if e.is_connect() {
            GenerationError::new(ErrorCode::ModelUnavailable, format!("Could not reach model backend: {e}"))
        } else {
            GenerationError::generation_failed(format!("HTTP error: {e}"))
        }
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(e: serde_json::Error) -> Self {
        GenerationError::invalid_response(format!("JSON parse error: {e}"))
    }
}
