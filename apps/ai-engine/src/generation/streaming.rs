//! Best-effort partial evaluation state from an incomplete JSON buffer.
//!
//! The model streams a JSON object one fragment at a time. Rather than waiting for a
//! parseable document, each field is pulled out independently with a field-local regex, so
//! `evaluation` can be shown while `strengths` is still being written. The extraction is
//! approximate: field names appearing inside other string values can confuse it.

use std::sync::OnceLock;

use futures::future;
use futures::stream::{Stream, StreamExt};
use regex::Regex;
use serde::Serialize;

use crate::errors::GenerationError;
use crate::llm_client::TextStream;

/// Whatever could be extracted so far. `None` means "not seen yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialEvaluationState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strengths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weaknesses: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit_score: Option<i64>,
}

impl PartialEvaluationState {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

struct FieldPatterns {
    evaluation: Regex,
    recommendation: Regex,
    strengths: Regex,
    weaknesses: Regex,
    fit_score: Regex,
    item: Regex,
}

/// A complete JSON string literal body: anything but `"` or `\`, or an escape pair.
const STRING_BODY: &str = r#"(?:[^"\\]|\\.)*"#;

fn string_field(name: &str) -> Regex {
    Regex::new(&format!(r#""{name}"\s*:\s*"({STRING_BODY})""#)).expect("string field pattern")
}

/// Captures from `[` up to `]` or end of buffer. Quoted items are consumed whole so a `]`
/// inside an item does not end the span early.
fn array_field(name: &str) -> Regex {
    Regex::new(&format!(
        r#""{name}"\s*:\s*\[((?:"{STRING_BODY}"|[^"\]])*(?:"{STRING_BODY})?)"#
    ))
    .expect("array field pattern")
}

fn patterns() -> &'static FieldPatterns {
    static PATTERNS: OnceLock<FieldPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| FieldPatterns {
        evaluation: string_field("evaluation"),
        recommendation: string_field("recommendation"),
        strengths: array_field("strengths"),
        weaknesses: array_field("weaknesses"),
        fit_score: Regex::new(r#""fitScore"\s*:\s*(-?\d+)"#).expect("fitScore pattern"),
        item: Regex::new(&format!(r#""({STRING_BODY})""#)).expect("array item pattern"),
    })
}

/// Resolves `\n` to a newline and `\"` to a quote. Every other escape is kept verbatim.
fn unescape(raw: &str) -> String {
    raw.replace("\\n", "\n").replace("\\\"", "\"")
}

fn extract_string(pattern: &Regex, buffer: &str) -> Option<String> {
    pattern
        .captures(buffer)
        .and_then(|caps| caps.get(1))
        .map(|m| unescape(m.as_str()))
}

fn extract_array(pattern: &Regex, buffer: &str) -> Option<Vec<String>> {
    let span = pattern.captures(buffer)?.get(1)?.as_str();
    let items: Vec<String> = patterns()
        .item
        .captures_iter(span)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape(m.as_str()))
        .collect();
    (!items.is_empty()).then_some(items)
}

/// Extracts every field that can be read from `buffer`. Never fails; the result only
/// depends on the buffer, so calling it twice on the same text gives the same state.
pub fn parse_partial(buffer: &str) -> PartialEvaluationState {
    let p = patterns();
    PartialEvaluationState {
        evaluation: extract_string(&p.evaluation, buffer),
        strengths: extract_array(&p.strengths, buffer),
        weaknesses: extract_array(&p.weaknesses, buffer),
        recommendation: extract_string(&p.recommendation, buffer),
        fit_score: p
            .fit_score
            .captures(buffer)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok()),
    }
}

/// Accumulates a text stream and yields the re-parsed state after every chunk.
/// Errors from the underlying stream are passed through.
pub fn partial_states(
    text: TextStream,
) -> impl Stream<Item = Result<PartialEvaluationState, GenerationError>> + Send {
    text.scan(String::new(), |buffer, chunk| {
        let state = chunk.map(|delta| {
            buffer.push_str(&delta);
            parse_partial(buffer)
        });
        future::ready(Some(state))
    })
}
