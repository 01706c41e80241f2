//! Draft and strict shapes of generated content, plus the JSON Schemas sent to the model.
//!
//! The model is asked to emit the permissive *draft* shape; `normalizer` turns drafts into
//! the *strict* shape the rest of the application stores.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::llm_client::{ResponseSchema, SchemaMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    OpenQuestion,
    CodeSnippet,
}

impl QuestionKind {
    pub const ALL: [QuestionKind; 3] = [
        QuestionKind::MultipleChoice,
        QuestionKind::OpenQuestion,
        QuestionKind::CodeSnippet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::OpenQuestion => "open_question",
            QuestionKind::CodeSnippet => "code_snippet",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Languages a code-snippet question may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeLanguage {
    JavaScript,
    TypeScript,
    Python,
    Java,
    CSharp,
    Cpp,
    Go,
    Rust,
    Ruby,
    Php,
    Kotlin,
    Swift,
    Sql,
}

impl CodeLanguage {
    pub const ALL: [CodeLanguage; 13] = [
        CodeLanguage::JavaScript,
        CodeLanguage::TypeScript,
        CodeLanguage::Python,
        CodeLanguage::Java,
        CodeLanguage::CSharp,
        CodeLanguage::Cpp,
        CodeLanguage::Go,
        CodeLanguage::Rust,
        CodeLanguage::Ruby,
        CodeLanguage::Php,
        CodeLanguage::Kotlin,
        CodeLanguage::Swift,
        CodeLanguage::Sql,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CodeLanguage::JavaScript => "javascript",
            CodeLanguage::TypeScript => "typescript",
            CodeLanguage::Python => "python",
            CodeLanguage::Java => "java",
            CodeLanguage::CSharp => "csharp",
            CodeLanguage::Cpp => "cpp",
            CodeLanguage::Go => "go",
            CodeLanguage::Rust => "rust",
            CodeLanguage::Ruby => "ruby",
            CodeLanguage::Php => "php",
            CodeLanguage::Kotlin => "kotlin",
            CodeLanguage::Swift => "swift",
            CodeLanguage::Sql => "sql",
        }
    }

    /// Parses a language name or common alias, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        let lang = match name.trim().to_lowercase().as_str() {
            "javascript" | "js" | "node" | "nodejs" | "node.js" => CodeLanguage::JavaScript,
            "typescript" | "ts" => CodeLanguage::TypeScript,
            "python" | "py" => CodeLanguage::Python,
            "java" => CodeLanguage::Java,
            "csharp" | "c#" | "cs" => CodeLanguage::CSharp,
            "cpp" | "c++" => CodeLanguage::Cpp,
            "go" | "golang" => CodeLanguage::Go,
            "rust" | "rs" => CodeLanguage::Rust,
            "ruby" | "rb" => CodeLanguage::Ruby,
            "php" => CodeLanguage::Php,
            "kotlin" | "kt" => CodeLanguage::Kotlin,
            "swift" => CodeLanguage::Swift,
            "sql" => CodeLanguage::Sql,
            _ => return None,
        };
        Some(lang)
    }
}

impl fmt::Display for CodeLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Draft shape
// ────────────────────────────────────────────────────────────────────────────

/// Permissive question shape: only `type` and `question` are required.
/// Unknown fields are ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftQuestion {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_solution: Option<String>,
}

impl DraftQuestion {
    /// Minimal draft of the given kind; every optional field unset.
    pub fn new(kind: QuestionKind, question: impl Into<String>) -> Self {
        Self {
            kind,
            question: question.into(),
            options: None,
            correct_answer: None,
            explanation: None,
            sample_answer: None,
            keywords: None,
            code_snippet: None,
            language: None,
            sample_solution: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Strict shape
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleChoiceQuestion {
    pub question: String,
    /// 2 to 6 distinct, non-empty options.
    pub options: Vec<String>,
    /// Zero-based index into `options`.
    pub correct_answer: usize,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenQuestion {
    pub question: String,
    pub sample_answer: Option<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSnippetQuestion {
    pub question: String,
    pub code_snippet: String,
    pub language: CodeLanguage,
    pub sample_solution: Option<String>,
    pub explanation: Option<String>,
}

/// A fully validated question, ready for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrictQuestion {
    MultipleChoice(MultipleChoiceQuestion),
    OpenQuestion(OpenQuestion),
    CodeSnippet(CodeSnippetQuestion),
}

impl StrictQuestion {
    pub fn kind(&self) -> QuestionKind {
        match self {
            StrictQuestion::MultipleChoice(_) => QuestionKind::MultipleChoice,
            StrictQuestion::OpenQuestion(_) => QuestionKind::OpenQuestion,
            StrictQuestion::CodeSnippet(_) => QuestionKind::CodeSnippet,
        }
    }

    pub fn question(&self) -> &str {
        match self {
            StrictQuestion::MultipleChoice(q) => &q.question,
            StrictQuestion::OpenQuestion(q) => &q.question,
            StrictQuestion::CodeSnippet(q) => &q.question,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuiz {
    pub questions: Vec<StrictQuestion>,
}

/// Final evaluation of a resume or of a candidate's answer.
/// Field names match what the streaming partial parser extracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub evaluation: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendation: String,
    /// 0–100.
    pub fit_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDescription {
    pub description: String,
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Response schemas
// ────────────────────────────────────────────────────────────────────────────

fn draft_question_properties(kinds: &[QuestionKind]) -> Value {
    let kind_names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
    let languages: Vec<&str> = CodeLanguage::ALL.iter().map(|l| l.as_str()).collect();
    json!({
        "type": { "type": "string", "enum": kind_names },
        "question": { "type": "string" },
        "options": { "type": "array", "items": { "type": "string" }, "minItems": 2, "maxItems": 6 },
        "correctAnswer": { "type": "integer", "minimum": 0 },
        "explanation": { "type": "string" },
        "sampleAnswer": { "type": "string" },
        "keywords": { "type": "array", "items": { "type": "string" } },
        "codeSnippet": { "type": "string" },
        "language": { "type": "string", "enum": languages },
        "sampleSolution": { "type": "string" }
    })
}

/// Flexible schema for one question of `kind`.
pub fn question_schema(kind: QuestionKind) -> ResponseSchema {
    ResponseSchema {
        name: "question",
        mode: SchemaMode::Flexible,
        schema: json!({
            "type": "object",
            "properties": draft_question_properties(&[kind]),
            "required": ["type", "question"]
        }),
    }
}

/// Flexible schema for a whole quiz restricted to `kinds`.
pub fn quiz_schema(kinds: &[QuestionKind]) -> ResponseSchema {
    ResponseSchema {
        name: "quiz",
        mode: SchemaMode::Flexible,
        schema: json!({
            "type": "object",
            "properties": {
                "questions": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": draft_question_properties(kinds),
                        "required": ["type", "question"]
                    }
                }
            },
            "required": ["questions"]
        }),
    }
}

/// Strict schema shared by resume and answer evaluations.
pub fn evaluation_schema() -> ResponseSchema {
    ResponseSchema {
        name: "evaluation",
        mode: SchemaMode::Strict,
        schema: json!({
            "type": "object",
            "properties": {
                "evaluation": { "type": "string" },
                "strengths": { "type": "array", "items": { "type": "string" } },
                "weaknesses": { "type": "array", "items": { "type": "string" } },
                "recommendation": { "type": "string" },
                "fitScore": { "type": "integer", "minimum": 0, "maximum": 100 }
            },
            "required": ["evaluation", "strengths", "weaknesses", "recommendation", "fitScore"]
        }),
    }
}

pub fn position_description_schema() -> ResponseSchema {
    ResponseSchema {
        name: "position_description",
        mode: SchemaMode::Strict,
        schema: json!({
            "type": "object",
            "properties": {
                "description": { "type": "string" },
                "responsibilities": { "type": "array", "items": { "type": "string" } },
                "requirements": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["description", "responsibilities", "requirements"]
        }),
    }
}
