//! Typed generation requests: one variant per kind of content the engine can produce.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::generation::schema::QuestionKind;

/// Position context every request carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionContext {
    pub title: String,
    pub experience_level: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// Question difficulty on a 1–5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&level).then_some(Self(level))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "very easy",
            2 => "easy",
            3 => "medium",
            4 => "hard",
            _ => "very hard",
        }
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Difficulty::new(level).ok_or_else(|| format!("difficulty must be between 1 and 5, got {level}"))
    }
}

impl From<Difficulty> for u8 {
    fn from(d: Difficulty) -> Self {
        d.0
    }
}

/// Optional knobs shared by every request kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    /// Explicit model override. Fallback models are only tried when this is set.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BugType {
    Logic,
    OffByOne,
    NullHandling,
    Performance,
    Security,
    Concurrency,
}

impl fmt::Display for BugType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BugType::Logic => "logic error",
            BugType::OffByOne => "off-by-one error",
            BugType::NullHandling => "null/undefined handling error",
            BugType::Performance => "performance problem",
            BugType::Security => "security vulnerability",
            BugType::Concurrency => "concurrency bug",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseLength {
    Short,
    Medium,
    Long,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleChoiceRequest {
    pub context: PositionContext,
    #[serde(default)]
    pub options: GenerationOptions,
    #[serde(default = "first_question")]
    pub question_index: u32,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub distractor_complexity: Option<Complexity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenQuestionRequest {
    pub context: PositionContext,
    #[serde(default)]
    pub options: GenerationOptions,
    #[serde(default = "first_question")]
    pub question_index: u32,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub expected_response_length: Option<ResponseLength>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSnippetRequest {
    pub context: PositionContext,
    #[serde(default)]
    pub options: GenerationOptions,
    #[serde(default = "first_question")]
    pub question_index: u32,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    /// Wins over inference from the skill list when it names a known language.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub bug_type: Option<BugType>,
    #[serde(default)]
    pub code_complexity: Option<Complexity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRequest {
    pub context: PositionContext,
    #[serde(default)]
    pub options: GenerationOptions,
    pub question_count: u32,
    /// Allowed kinds; empty means all kinds.
    #[serde(default)]
    pub question_types: Vec<QuestionKind>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    /// Question texts already asked, to steer away from near-duplicates.
    #[serde(default)]
    pub previous_questions: Vec<String>,
}

impl QuizRequest {
    /// The allowed kinds, in canonical order, defaulting to every kind.
    pub fn allowed_kinds(&self) -> Vec<QuestionKind> {
        QuestionKind::ALL
            .into_iter()
            .filter(|k| self.question_types.is_empty() || self.question_types.contains(k))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeEvaluationRequest {
    pub context: PositionContext,
    #[serde(default)]
    pub options: GenerationOptions,
    pub resume_text: String,
    #[serde(default)]
    pub position_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvaluationRequest {
    pub context: PositionContext,
    #[serde(default)]
    pub options: GenerationOptions,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub sample_answer: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDescriptionRequest {
    pub context: PositionContext,
    #[serde(default)]
    pub options: GenerationOptions,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
}

/// A single generation request, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationRequest {
    MultipleChoice(MultipleChoiceRequest),
    OpenQuestion(OpenQuestionRequest),
    CodeSnippet(CodeSnippetRequest),
    Quiz(QuizRequest),
    ResumeEvaluation(ResumeEvaluationRequest),
    AnswerEvaluation(AnswerEvaluationRequest),
    PositionDescription(PositionDescriptionRequest),
}

impl GenerationRequest {
    pub fn options(&self) -> &GenerationOptions {
        match self {
            GenerationRequest::MultipleChoice(r) => &r.options,
            GenerationRequest::OpenQuestion(r) => &r.options,
            GenerationRequest::CodeSnippet(r) => &r.options,
            GenerationRequest::Quiz(r) => &r.options,
            GenerationRequest::ResumeEvaluation(r) => &r.options,
            GenerationRequest::AnswerEvaluation(r) => &r.options,
            GenerationRequest::PositionDescription(r) => &r.options,
        }
    }

    /// The question kind for single-question requests.
    pub fn question_kind(&self) -> Option<QuestionKind> {
        match self {
            GenerationRequest::MultipleChoice(_) => Some(QuestionKind::MultipleChoice),
            GenerationRequest::OpenQuestion(_) => Some(QuestionKind::OpenQuestion),
            GenerationRequest::CodeSnippet(_) => Some(QuestionKind::CodeSnippet),
            _ => None,
        }
    }

    /// Wire name of the variant, as used in the `type` tag.
    pub fn kind_name(&self) -> &'static str {
        match self {
            GenerationRequest::MultipleChoice(_) => "multiple_choice",
            GenerationRequest::OpenQuestion(_) => "open_question",
            GenerationRequest::CodeSnippet(_) => "code_snippet",
            GenerationRequest::Quiz(_) => "quiz",
            GenerationRequest::ResumeEvaluation(_) => "resume_evaluation",
            GenerationRequest::AnswerEvaluation(_) => "answer_evaluation",
            GenerationRequest::PositionDescription(_) => "position_description",
        }
    }
}

fn first_question() -> u32 {
    1
}
