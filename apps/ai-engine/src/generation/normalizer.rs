//! Schema normalization: turns raw model output into strict, storage-ready values.
//!
//! Policy: a batch is all-or-nothing. The first item that cannot satisfy its kind's
//! contract fails the whole batch with an error naming that item. Nothing is repaired
//! or synthesized; optional collections that are missing become empty.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::errors::GenerationError;
use crate::generation::schema::{
    CodeLanguage, CodeSnippetQuestion, DraftQuestion, Evaluation, MultipleChoiceQuestion,
    OpenQuestion, PositionDescription, QuestionKind, StrictQuestion,
};

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;
pub const MAX_SCORE: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// Question at `index` (zero-based within its batch) broke its kind's contract.
    #[error("question {index}: {reason}")]
    Question { index: usize, reason: String },

    #[error("field '{field}': {reason}")]
    Field { field: &'static str, reason: String },

    #[error("malformed response: {0}")]
    Shape(String),
}

impl From<NormalizeError> for GenerationError {
    fn from(e: NormalizeError) -> Self {
        GenerationError::invalid_response("Model output failed validation").with_details(e.to_string())
    }
}

fn question_error(index: usize, reason: impl Into<String>) -> NormalizeError {
    NormalizeError::Question {
        index,
        reason: reason.into(),
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Trims every item and drops the blank ones.
fn clean_list(items: Option<Vec<String>>) -> Vec<String> {
    items
        .unwrap_or_default()
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Questions
// ────────────────────────────────────────────────────────────────────────────

/// Converts one draft; `index` is only used to label the error.
pub fn question_to_strict(index: usize, draft: DraftQuestion) -> Result<StrictQuestion, NormalizeError> {
    let question = draft.question.trim().to_string();
    if question.is_empty() {
        return Err(question_error(index, "question text is empty"));
    }

    match draft.kind {
        QuestionKind::MultipleChoice => {
            let options = draft.options.unwrap_or_default();
            if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
                return Err(question_error(
                    index,
                    format!(
                        "multiple choice needs {MIN_OPTIONS}-{MAX_OPTIONS} options, got {}",
                        options.len()
                    ),
                ));
            }

            let options: Vec<String> = options.into_iter().map(|o| o.trim().to_string()).collect();
            if options.iter().any(|o| o.is_empty()) {
                return Err(question_error(index, "multiple choice option is empty"));
            }
            let distinct: HashSet<String> = options.iter().map(|o| o.to_lowercase()).collect();
            if distinct.len() != options.len() {
                return Err(question_error(index, "multiple choice options are not distinct"));
            }

            let correct_answer = match draft.correct_answer {
                Some(i) if i >= 0 && (i as usize) < options.len() => i as usize,
                Some(i) => {
                    return Err(question_error(
                        index,
                        format!("correctAnswer {i} is out of bounds for {} options", options.len()),
                    ))
                }
                None => return Err(question_error(index, "correctAnswer is missing")),
            };

            Ok(StrictQuestion::MultipleChoice(MultipleChoiceQuestion {
                question,
                options,
                correct_answer,
                explanation: non_blank(draft.explanation),
            }))
        }
        QuestionKind::OpenQuestion => {
            let sample_answer = non_blank(draft.sample_answer);
            let keywords = clean_list(draft.keywords);
            if sample_answer.is_none() && keywords.is_empty() {
                return Err(question_error(
                    index,
                    "open question needs a sampleAnswer or keywords",
                ));
            }

            Ok(StrictQuestion::OpenQuestion(OpenQuestion {
                question,
                sample_answer,
                keywords,
            }))
        }
        QuestionKind::CodeSnippet => {
            // Code keeps its indentation; only the blank check trims.
            let code_snippet = draft
                .code_snippet
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| question_error(index, "codeSnippet is missing"))?;

            let language = match draft.language.as_deref() {
                Some(name) => CodeLanguage::parse(name)
                    .ok_or_else(|| question_error(index, format!("unknown language '{name}'")))?,
                None => return Err(question_error(index, "language is missing")),
            };

            Ok(StrictQuestion::CodeSnippet(CodeSnippetQuestion {
                question,
                code_snippet,
                language,
                sample_solution: non_blank(draft.sample_solution),
                explanation: non_blank(draft.explanation),
            }))
        }
    }
}

/// Converts a batch of drafts, failing on the first invalid item.
pub fn to_strict(drafts: Vec<DraftQuestion>) -> Result<Vec<StrictQuestion>, NormalizeError> {
    drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| question_to_strict(index, draft))
        .collect()
}

fn parse_draft(index: usize, value: Value) -> Result<DraftQuestion, NormalizeError> {
    serde_json::from_value(value).map_err(|e| question_error(index, e.to_string()))
}

/// Normalizes a single-question response and checks it is the kind that was asked for.
pub fn normalize_question(value: Value, expected: QuestionKind) -> Result<StrictQuestion, NormalizeError> {
    // Some models wrap the single question as {"question": {...}} or {"questions": [...]}.
    let value = match value {
        Value::Object(mut map) if map.get("question").is_some_and(Value::is_object) => {
            map.remove("question").unwrap_or(Value::Null)
        }
        Value::Object(mut map) if map.get("questions").is_some_and(Value::is_array) => {
            match map.remove("questions") {
                Some(Value::Array(mut items)) if items.len() == 1 => items.remove(0),
                _ => return Err(NormalizeError::Shape("expected exactly one question".to_string())),
            }
        }
        other => other,
    };

    let draft = parse_draft(0, value)?;
    if draft.kind != expected {
        return Err(question_error(
            0,
            format!("expected a {expected} question, got {}", draft.kind),
        ));
    }
    question_to_strict(0, draft)
}

/// Normalizes a quiz response (`{"questions": [...]}` or a bare array).
pub fn normalize_quiz(value: Value, allowed: &[QuestionKind]) -> Result<Vec<StrictQuestion>, NormalizeError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("questions") {
            Some(Value::Array(items)) => items,
            _ => return Err(NormalizeError::Shape("missing 'questions' array".to_string())),
        },
        _ => return Err(NormalizeError::Shape("expected an object or array".to_string())),
    };

    if items.is_empty() {
        return Err(NormalizeError::Shape("quiz contains no questions".to_string()));
    }

    let drafts = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let draft = parse_draft(index, item)?;
            if !allowed.contains(&draft.kind) {
                return Err(question_error(
                    index,
                    format!("question type {} is not allowed in this quiz", draft.kind),
                ));
            }
            Ok(draft)
        })
        .collect::<Result<Vec<_>, _>>()?;

    to_strict(drafts)
}

// ────────────────────────────────────────────────────────────────────────────
// Evaluations and descriptions
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluationDraft {
    evaluation: Option<String>,
    strengths: Option<Vec<String>>,
    weaknesses: Option<Vec<String>>,
    recommendation: Option<String>,
    fit_score: Option<i64>,
}

pub fn normalize_evaluation(value: Value) -> Result<Evaluation, NormalizeError> {
    let draft: EvaluationDraft =
        serde_json::from_value(value).map_err(|e| NormalizeError::Shape(e.to_string()))?;

    let evaluation = non_blank(draft.evaluation).ok_or(NormalizeError::Field {
        field: "evaluation",
        reason: "missing or empty".to_string(),
    })?;
    let recommendation = non_blank(draft.recommendation).ok_or(NormalizeError::Field {
        field: "recommendation",
        reason: "missing or empty".to_string(),
    })?;
    let fit_score = match draft.fit_score {
        Some(score) if (0..=MAX_SCORE).contains(&score) => score as u8,
        Some(score) => {
            return Err(NormalizeError::Field {
                field: "fitScore",
                reason: format!("{score} is outside 0-{MAX_SCORE}"),
            })
        }
        None => {
            return Err(NormalizeError::Field {
                field: "fitScore",
                reason: "missing".to_string(),
            })
        }
    };

    Ok(Evaluation {
        evaluation,
        strengths: clean_list(draft.strengths),
        weaknesses: clean_list(draft.weaknesses),
        recommendation,
        fit_score,
    })
}

#[derive(Debug, Deserialize)]
struct PositionDescriptionDraft {
    description: Option<String>,
    responsibilities: Option<Vec<String>>,
    requirements: Option<Vec<String>>,
}

pub fn normalize_position_description(value: Value) -> Result<PositionDescription, NormalizeError> {
    let draft: PositionDescriptionDraft =
        serde_json::from_value(value).map_err(|e| NormalizeError::Shape(e.to_string()))?;

    let description = non_blank(draft.description).ok_or(NormalizeError::Field {
        field: "description",
        reason: "missing or empty".to_string(),
    })?;

    Ok(PositionDescription {
        description,
        responsibilities: clean_list(draft.responsibilities),
        requirements: clean_list(draft.requirements),
    })
}
