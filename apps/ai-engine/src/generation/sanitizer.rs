//! Prompt-injection filter for user-supplied free text.
//!
//! This is a defense-in-depth measure, NOT a complete sanitizer: it removes a fixed list of
//! well-known injection phrases and markup, then caps the length. The system prompts still
//! tell the model to treat user values as data (see `llm_client::prompts`).

use std::sync::OnceLock;

use regex::Regex;

use crate::generation::request::{
    AnswerEvaluationRequest, CodeSnippetRequest, GenerationOptions, GenerationRequest,
    MultipleChoiceRequest, OpenQuestionRequest, PositionContext, PositionDescriptionRequest,
    QuizRequest, ResumeEvaluationRequest,
};

pub const FILTERED_MARKER: &str = "[filtered]";
/// Cap for every free-text field, resumes and candidate answers included.
pub const MAX_FIELD_LENGTH: usize = 2000;

const INJECTION_PATTERNS: &[&str] = &[
    r"(?i)ignore\s+(?:all\s+)?previous\s+instructions",
    r"(?i)forget\s+everything\s+above",
    r"(?i)you\s+are\s+now",
    r"(?i)new\s+instructions",
    r"(?i)\b(?:system|assistant|user)\s*:",
    r"(?i)<\s*/?\s*script\b[^>]*>",
    r"(?i)javascript\s*:",
    r"(?i)\bdata\s*:",
];

fn injection_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        INJECTION_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("injection pattern must compile"))
            .collect()
    })
}

/// Filters injection patterns and truncates to [`MAX_FIELD_LENGTH`] characters.
pub fn sanitize(text: &str) -> String {
    let mut cleaned = text.to_string();
    for pattern in injection_patterns() {
        if pattern.is_match(&cleaned) {
            cleaned = pattern.replace_all(&cleaned, FILTERED_MARKER).into_owned();
        }
    }
    truncate_chars(&cleaned, MAX_FIELD_LENGTH)
}

/// `sanitize` for optional input; absent input becomes the empty string.
pub fn sanitize_opt(text: Option<&str>) -> String {
    text.map(sanitize).unwrap_or_default()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

fn sanitize_list(items: &[String]) -> Vec<String> {
    items.iter().map(|s| sanitize(s)).collect()
}

fn sanitize_option(text: &Option<String>) -> Option<String> {
    text.as_deref().map(sanitize)
}

fn sanitize_context(context: &PositionContext) -> PositionContext {
    PositionContext {
        title: sanitize(&context.title),
        experience_level: sanitize(&context.experience_level),
        skills: sanitize_list(&context.skills),
    }
}

fn sanitize_options(options: &GenerationOptions) -> GenerationOptions {
    GenerationOptions {
        instructions: sanitize_option(&options.instructions),
        ..options.clone()
    }
}

impl GenerationRequest {
    /// Copy of the request with every user-supplied free-text field sanitized.
    /// Model identifiers and enumerated fields are left untouched.
    pub fn sanitized(&self) -> GenerationRequest {
        match self {
            GenerationRequest::MultipleChoice(r) => GenerationRequest::MultipleChoice(MultipleChoiceRequest {
                context: sanitize_context(&r.context),
                options: sanitize_options(&r.options),
                focus_areas: sanitize_list(&r.focus_areas),
                ..r.clone()
            }),
            GenerationRequest::OpenQuestion(r) => GenerationRequest::OpenQuestion(OpenQuestionRequest {
                context: sanitize_context(&r.context),
                options: sanitize_options(&r.options),
                focus_areas: sanitize_list(&r.focus_areas),
                ..r.clone()
            }),
            GenerationRequest::CodeSnippet(r) => GenerationRequest::CodeSnippet(CodeSnippetRequest {
                context: sanitize_context(&r.context),
                options: sanitize_options(&r.options),
                focus_areas: sanitize_list(&r.focus_areas),
                language: sanitize_option(&r.language),
                ..r.clone()
            }),
            GenerationRequest::Quiz(r) => GenerationRequest::Quiz(QuizRequest {
                context: sanitize_context(&r.context),
                options: sanitize_options(&r.options),
                focus_areas: sanitize_list(&r.focus_areas),
                previous_questions: sanitize_list(&r.previous_questions),
                ..r.clone()
            }),
            GenerationRequest::ResumeEvaluation(r) => {
                GenerationRequest::ResumeEvaluation(ResumeEvaluationRequest {
                    context: sanitize_context(&r.context),
                    options: sanitize_options(&r.options),
                    resume_text: sanitize(&r.resume_text),
                    position_description: sanitize_option(&r.position_description),
                })
            }
            GenerationRequest::AnswerEvaluation(r) => {
                GenerationRequest::AnswerEvaluation(AnswerEvaluationRequest {
                    context: sanitize_context(&r.context),
                    options: sanitize_options(&r.options),
                    question: sanitize(&r.question),
                    answer: sanitize(&r.answer),
                    sample_answer: sanitize_option(&r.sample_answer),
                    keywords: sanitize_list(&r.keywords),
                })
            }
            GenerationRequest::PositionDescription(r) => {
                GenerationRequest::PositionDescription(PositionDescriptionRequest {
                    context: sanitize_context(&r.context),
                    options: sanitize_options(&r.options),
                    company_name: sanitize_option(&r.company_name),
                    tone: sanitize_option(&r.tone),
                })
            }
        }
    }
}
