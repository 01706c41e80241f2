//! Prompt building: pure functions from a typed request to system + user prompts.
//!
//! Optional request fields only render when present; an absent field never shows up as
//! an empty placeholder line. Callers sanitize the request first (see `sanitizer`).

use tracing::warn;

use crate::generation::prompts::{
    ANSWER_EVALUATION_SYSTEM, CODE_SNIPPET_SYSTEM, MULTIPLE_CHOICE_SYSTEM, OPEN_QUESTION_SYSTEM,
    POSITION_DESCRIPTION_SYSTEM, PREVIOUS_QUESTIONS_INSTRUCTION, QUESTION_INDEX_INSTRUCTION,
    QUIZ_EXAMPLE_CODE_SNIPPET, QUIZ_EXAMPLE_MULTIPLE_CHOICE, QUIZ_EXAMPLE_OPEN_QUESTION,
    QUIZ_NUMBERING_INSTRUCTION, QUIZ_RULE_CODE_SNIPPET, QUIZ_RULE_MULTIPLE_CHOICE,
    QUIZ_RULE_OPEN_QUESTION, QUIZ_SYSTEM_INTRO, RESUME_EVALUATION_SYSTEM,
};
use crate::generation::request::{
    AnswerEvaluationRequest, CodeSnippetRequest, Complexity, GenerationOptions, GenerationRequest,
    MultipleChoiceRequest, OpenQuestionRequest, PositionContext, PositionDescriptionRequest,
    QuizRequest, ResponseLength, ResumeEvaluationRequest,
};
use crate::generation::schema::{CodeLanguage, QuestionKind};
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, UNTRUSTED_INPUT_INSTRUCTION};

/// Used when neither an explicit language nor any skill identifies one.
pub const FALLBACK_LANGUAGE: CodeLanguage = CodeLanguage::JavaScript;

/// Skill keyword → language, checked top to bottom. Longer or more specific keywords come
/// before keywords they contain ("javascript" before "java").
const LANGUAGE_KEYWORDS: &[(&str, CodeLanguage)] = &[
    ("typescript", CodeLanguage::TypeScript),
    ("angular", CodeLanguage::TypeScript),
    ("nestjs", CodeLanguage::TypeScript),
    ("javascript", CodeLanguage::JavaScript),
    ("node", CodeLanguage::JavaScript),
    ("react", CodeLanguage::JavaScript),
    ("vue", CodeLanguage::JavaScript),
    ("express", CodeLanguage::JavaScript),
    ("python", CodeLanguage::Python),
    ("django", CodeLanguage::Python),
    ("flask", CodeLanguage::Python),
    ("fastapi", CodeLanguage::Python),
    ("pandas", CodeLanguage::Python),
    ("kotlin", CodeLanguage::Kotlin),
    ("java", CodeLanguage::Java),
    ("spring", CodeLanguage::Java),
    ("c#", CodeLanguage::CSharp),
    ("csharp", CodeLanguage::CSharp),
    (".net", CodeLanguage::CSharp),
    ("c++", CodeLanguage::Cpp),
    ("cpp", CodeLanguage::Cpp),
    ("golang", CodeLanguage::Go),
    ("rust", CodeLanguage::Rust),
    ("ruby", CodeLanguage::Ruby),
    ("rails", CodeLanguage::Ruby),
    ("php", CodeLanguage::Php),
    ("laravel", CodeLanguage::Php),
    ("swift", CodeLanguage::Swift),
    ("sql", CodeLanguage::Sql),
    ("postgres", CodeLanguage::Sql),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Builds the prompts for any request kind.
pub fn build_prompt(request: &GenerationRequest) -> PromptPair {
    match request {
        GenerationRequest::MultipleChoice(r) => build_multiple_choice_prompt(r),
        GenerationRequest::OpenQuestion(r) => build_open_question_prompt(r),
        GenerationRequest::CodeSnippet(r) => build_code_snippet_prompt(r),
        GenerationRequest::Quiz(r) => build_quiz_prompt(r),
        GenerationRequest::ResumeEvaluation(r) => build_resume_evaluation_prompt(r),
        GenerationRequest::AnswerEvaluation(r) => build_answer_evaluation_prompt(r),
        GenerationRequest::PositionDescription(r) => build_position_description_prompt(r),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Language resolution
// ────────────────────────────────────────────────────────────────────────────

/// Infers a language from skills by case-insensitive substring match.
/// Short names that are unsafe as substrings ("Go", "TS") only match a whole skill.
pub fn infer_language(skills: &[String]) -> Option<CodeLanguage> {
    let lowered: Vec<String> = skills.iter().map(|s| s.to_lowercase()).collect();
    LANGUAGE_KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.iter().any(|skill| skill.contains(keyword)))
        .map(|(_, lang)| *lang)
        .or_else(|| skills.iter().find_map(|skill| CodeLanguage::parse(skill)))
}

/// Explicit language wins; otherwise inferred from skills; otherwise [`FALLBACK_LANGUAGE`].
pub fn resolve_language(explicit: Option<&str>, skills: &[String]) -> CodeLanguage {
    if let Some(name) = explicit.filter(|n| !n.trim().is_empty()) {
        match CodeLanguage::parse(name) {
            Some(lang) => return lang,
            None => warn!("Unknown explicit language '{name}', inferring from skills instead"),
        }
    }
    infer_language(skills).unwrap_or(FALLBACK_LANGUAGE)
}

// ────────────────────────────────────────────────────────────────────────────
// Shared fragments
// ────────────────────────────────────────────────────────────────────────────

fn system_prompt(role: &str) -> String {
    format!("{role}\n\n{JSON_ONLY_SYSTEM}\n\n{UNTRUSTED_INPUT_INSTRUCTION}")
}

fn push_line(lines: &mut Vec<String>, label: &str, value: &str) {
    if !value.trim().is_empty() {
        lines.push(format!("{label}: {value}"));
    }
}

fn push_list(lines: &mut Vec<String>, label: &str, items: &[String]) {
    let items: Vec<&str> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !items.is_empty() {
        lines.push(format!("{label}: {}", items.join(", ")));
    }
}

fn context_lines(context: &PositionContext) -> Vec<String> {
    let mut lines = Vec::new();
    push_line(&mut lines, "Position", &context.title);
    push_line(&mut lines, "Experience level", &context.experience_level);
    push_list(&mut lines, "Skills", &context.skills);
    lines
}

fn option_lines(lines: &mut Vec<String>, options: &GenerationOptions) {
    if let Some(difficulty) = options.difficulty {
        lines.push(format!(
            "Difficulty: {}/5 ({})",
            difficulty.level(),
            difficulty.label()
        ));
    }
}

fn instruction_lines(lines: &mut Vec<String>, options: &GenerationOptions) {
    if let Some(instructions) = options.instructions.as_deref() {
        push_line(lines, "Additional instructions", instructions);
    }
}

fn complexity_guidance(complexity: Complexity) -> &'static str {
    match complexity {
        Complexity::Simple => "simple: straightforward, a careful reader spots it quickly",
        Complexity::Moderate => "moderate: requires understanding the underlying concept",
        Complexity::Complex => "complex: subtle, only an experienced practitioner notices it",
    }
}

fn response_length_guidance(length: ResponseLength) -> &'static str {
    match length {
        ResponseLength::Short => "short: answerable in 2-3 sentences",
        ResponseLength::Medium => "medium: answerable in one or two paragraphs",
        ResponseLength::Long => "long: calls for a structured, detailed answer",
    }
}

fn question_user_prompt(index: u32, kind_label: &str, mut lines: Vec<String>) -> String {
    let header = format!("Generate one {kind_label} question for the position below.");
    let index_line = QUESTION_INDEX_INSTRUCTION.replace("{index}", &index.to_string());
    lines.insert(0, String::new());
    lines.insert(0, index_line);
    lines.insert(0, header);
    lines.join("\n")
}

// ────────────────────────────────────────────────────────────────────────────
// Question builders
// ────────────────────────────────────────────────────────────────────────────

pub fn build_multiple_choice_prompt(request: &MultipleChoiceRequest) -> PromptPair {
    let mut lines = context_lines(&request.context);
    option_lines(&mut lines, &request.options);
    push_list(&mut lines, "Focus areas", &request.focus_areas);
    if let Some(complexity) = request.distractor_complexity {
        lines.push(format!(
            "Distractor complexity: {}",
            complexity_guidance(complexity)
        ));
    }
    instruction_lines(&mut lines, &request.options);

    PromptPair {
        system: system_prompt(MULTIPLE_CHOICE_SYSTEM),
        user: question_user_prompt(request.question_index, "multiple_choice", lines),
    }
}

pub fn build_open_question_prompt(request: &OpenQuestionRequest) -> PromptPair {
    let mut lines = context_lines(&request.context);
    option_lines(&mut lines, &request.options);
    push_list(&mut lines, "Focus areas", &request.focus_areas);
    if let Some(length) = request.expected_response_length {
        lines.push(format!(
            "Expected response length: {}",
            response_length_guidance(length)
        ));
    }
    instruction_lines(&mut lines, &request.options);

    PromptPair {
        system: system_prompt(OPEN_QUESTION_SYSTEM),
        user: question_user_prompt(request.question_index, "open_question", lines),
    }
}

pub fn build_code_snippet_prompt(request: &CodeSnippetRequest) -> PromptPair {
    let language = resolve_language(request.language.as_deref(), &request.context.skills);

    let mut lines = context_lines(&request.context);
    lines.push(format!("Language: {language} (set `language` to \"{language}\")"));
    option_lines(&mut lines, &request.options);
    push_list(&mut lines, "Focus areas", &request.focus_areas);
    if let Some(bug_type) = request.bug_type {
        lines.push(format!("The snippet must contain a {bug_type}."));
    }
    if let Some(complexity) = request.code_complexity {
        lines.push(format!("Code complexity: {}", complexity_guidance(complexity)));
    }
    instruction_lines(&mut lines, &request.options);

    PromptPair {
        system: system_prompt(CODE_SNIPPET_SYSTEM),
        user: question_user_prompt(request.question_index, "code_snippet", lines),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quiz
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic quiz system prompt; depends only on the allowed kinds.
pub fn quiz_system_prompt(kinds: &[QuestionKind]) -> String {
    let kinds: Vec<QuestionKind> = QuestionKind::ALL
        .into_iter()
        .filter(|k| kinds.is_empty() || kinds.contains(k))
        .collect();

    let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
    let mut rules = Vec::new();
    let mut examples = Vec::new();
    for kind in &kinds {
        let (rule, example) = match kind {
            QuestionKind::MultipleChoice => (QUIZ_RULE_MULTIPLE_CHOICE, QUIZ_EXAMPLE_MULTIPLE_CHOICE),
            QuestionKind::OpenQuestion => (QUIZ_RULE_OPEN_QUESTION, QUIZ_EXAMPLE_OPEN_QUESTION),
            QuestionKind::CodeSnippet => (QUIZ_RULE_CODE_SNIPPET, QUIZ_EXAMPLE_CODE_SNIPPET),
        };
        rules.push(rule);
        examples.push(example);
    }

    let example = format!("{{\n  \"questions\": [\n    {}\n  ]\n}}", examples.join(",\n    "));

    let role = format!(
        "{QUIZ_SYSTEM_INTRO}\n\nAllowed question types: {}\n{}\n\nExample of the expected JSON:\n{example}",
        names.join(", "),
        rules.join("\n"),
    );
    system_prompt(&role)
}

pub fn build_quiz_prompt(request: &QuizRequest) -> PromptPair {
    let kinds = request.allowed_kinds();
    let count = request.question_count;

    let mut lines = vec![
        format!("Create a quiz of {count} questions for the position below."),
        QUIZ_NUMBERING_INSTRUCTION.replace("{count}", &count.to_string()),
        String::new(),
    ];
    lines.extend(context_lines(&request.context));
    lines.push(format!(
        "Question types: {}",
        kinds.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
    ));
    option_lines(&mut lines, &request.options);
    push_list(&mut lines, "Focus areas", &request.focus_areas);
    instruction_lines(&mut lines, &request.options);

    let previous: Vec<&str> = request
        .previous_questions
        .iter()
        .map(|q| q.trim())
        .filter(|q| !q.is_empty())
        .collect();
    if !previous.is_empty() {
        lines.push(String::new());
        lines.push(PREVIOUS_QUESTIONS_INSTRUCTION.to_string());
        for (i, question) in previous.iter().enumerate() {
            lines.push(format!("{}. {question}", i + 1));
        }
    }

    PromptPair {
        system: quiz_system_prompt(&kinds),
        user: lines.join("\n"),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Evaluations and descriptions
// ────────────────────────────────────────────────────────────────────────────

pub fn build_resume_evaluation_prompt(request: &ResumeEvaluationRequest) -> PromptPair {
    let mut lines = vec!["Evaluate the candidate's resume for this position.".to_string(), String::new()];
    lines.extend(context_lines(&request.context));
    instruction_lines(&mut lines, &request.options);
    if let Some(description) = request.position_description.as_deref() {
        if !description.trim().is_empty() {
            lines.push(String::new());
            lines.push(format!("<position_description>\n{description}\n</position_description>"));
        }
    }
    lines.push(String::new());
    lines.push(format!("<resume>\n{}\n</resume>", request.resume_text));

    PromptPair {
        system: system_prompt(RESUME_EVALUATION_SYSTEM),
        user: lines.join("\n"),
    }
}

pub fn build_answer_evaluation_prompt(request: &AnswerEvaluationRequest) -> PromptPair {
    let mut lines = vec!["Evaluate the candidate's answer.".to_string(), String::new()];
    lines.extend(context_lines(&request.context));
    option_lines(&mut lines, &request.options);
    instruction_lines(&mut lines, &request.options);
    lines.push(String::new());
    lines.push(format!("<question>\n{}\n</question>", request.question));
    if let Some(sample) = request.sample_answer.as_deref() {
        if !sample.trim().is_empty() {
            lines.push(format!("<reference_answer>\n{sample}\n</reference_answer>"));
        }
    }
    push_list(&mut lines, "Expected keywords", &request.keywords);
    lines.push(format!("<candidate_answer>\n{}\n</candidate_answer>", request.answer));

    PromptPair {
        system: system_prompt(ANSWER_EVALUATION_SYSTEM),
        user: lines.join("\n"),
    }
}

pub fn build_position_description_prompt(request: &PositionDescriptionRequest) -> PromptPair {
    let mut lines = vec!["Write a job description for the position below.".to_string(), String::new()];
    lines.extend(context_lines(&request.context));
    if let Some(company) = request.company_name.as_deref() {
        push_line(&mut lines, "Company", company);
    }
    if let Some(tone) = request.tone.as_deref() {
        push_line(&mut lines, "Tone", tone);
    }
    instruction_lines(&mut lines, &request.options);

    PromptPair {
        system: system_prompt(POSITION_DESCRIPTION_SYSTEM),
        user: lines.join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::request::{BugType, Difficulty};

    fn context(skills: &[&str]) -> PositionContext {
        PositionContext {
            title: "Backend Engineer".to_string(),
            experience_level: "senior".to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn code_request(skills: &[&str], language: Option<&str>) -> CodeSnippetRequest {
        CodeSnippetRequest {
            context: context(skills),
            options: GenerationOptions::default(),
            question_index: 2,
            focus_areas: vec![],
            language: language.map(str::to_string),
            bug_type: None,
            code_complexity: None,
        }
    }

    fn skills(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_infers_python_from_python_and_django() {
        assert_eq!(
            resolve_language(None, &skills(&["Python", "Django"])),
            CodeLanguage::Python
        );
    }

    #[test]
    fn test_javascript_is_not_mistaken_for_java() {
        assert_eq!(infer_language(&skills(&["JavaScript"])), Some(CodeLanguage::JavaScript));
        assert_eq!(infer_language(&skills(&["Java", "Spring Boot"])), Some(CodeLanguage::Java));
    }

    #[test]
    fn test_inference_is_case_insensitive_substring() {
        assert_eq!(infer_language(&skills(&["ReactJS"])), Some(CodeLanguage::JavaScript));
        assert_eq!(infer_language(&skills(&["ASP.NET Core"])), Some(CodeLanguage::CSharp));
    }

    #[test]
    fn test_short_language_names_match_whole_skill_only() {
        assert_eq!(infer_language(&skills(&["Go"])), Some(CodeLanguage::Go));
        assert_eq!(infer_language(&skills(&["MongoDB"])), None);
    }

    #[test]
    fn test_priority_order_decides_ties() {
        // both match; typescript is listed before python
        assert_eq!(
            infer_language(&skills(&["Python", "TypeScript"])),
            Some(CodeLanguage::TypeScript)
        );
    }

    #[test]
    fn test_explicit_language_wins() {
        assert_eq!(
            resolve_language(Some("Go"), &skills(&["Python"])),
            CodeLanguage::Go
        );
    }

    #[test]
    fn test_unknown_explicit_language_falls_back_to_inference() {
        assert_eq!(
            resolve_language(Some("cobol"), &skills(&["Rust"])),
            CodeLanguage::Rust
        );
    }

    #[test]
    fn test_fallback_language_when_nothing_matches() {
        assert_eq!(resolve_language(None, &skills(&["Excel"])), FALLBACK_LANGUAGE);
        assert_eq!(resolve_language(None, &[]), FALLBACK_LANGUAGE);
    }

    #[test]
    fn test_code_prompt_embeds_index_context_and_language() {
        let prompt = build_code_snippet_prompt(&CodeSnippetRequest {
            bug_type: Some(BugType::OffByOne),
            ..code_request(&["Python", "Django"], None)
        });
        assert!(prompt.user.contains("question #2"));
        assert!(prompt.user.contains("Position: Backend Engineer"));
        assert!(prompt.user.contains("Experience level: senior"));
        assert!(prompt.user.contains("Skills: Python, Django"));
        assert!(prompt.user.contains("Language: python"));
        assert!(prompt.user.contains("off-by-one error"));
        assert!(prompt.system.contains(JSON_ONLY_SYSTEM));
    }

    #[test]
    fn test_absent_optional_fields_do_not_render() {
        let prompt = build_code_snippet_prompt(&code_request(&["Rust"], None));
        assert!(!prompt.user.contains("Focus areas"));
        assert!(!prompt.user.contains("Difficulty"));
        assert!(!prompt.user.contains("Additional instructions"));
        assert!(!prompt.user.contains("Code complexity"));
        assert!(!prompt.user.contains("must contain"));
    }

    #[test]
    fn test_present_optional_fields_render() {
        let prompt = build_multiple_choice_prompt(&MultipleChoiceRequest {
            context: context(&["Rust"]),
            options: GenerationOptions {
                instructions: Some("Prefer async topics".to_string()),
                difficulty: Difficulty::new(4),
                ..GenerationOptions::default()
            },
            question_index: 7,
            focus_areas: vec!["tokio".to_string(), "pinning".to_string()],
            distractor_complexity: Some(Complexity::Complex),
        });
        assert!(prompt.user.contains("question #7"));
        assert!(prompt.user.contains("Focus areas: tokio, pinning"));
        assert!(prompt.user.contains("Difficulty: 4/5 (hard)"));
        assert!(prompt.user.contains("Distractor complexity: complex"));
        assert!(prompt.user.contains("Additional instructions: Prefer async topics"));
    }

    #[test]
    fn test_empty_focus_list_does_not_render() {
        let prompt = build_open_question_prompt(&OpenQuestionRequest {
            context: context(&[]),
            options: GenerationOptions::default(),
            question_index: 1,
            focus_areas: vec!["  ".to_string()],
            expected_response_length: Some(ResponseLength::Short),
        });
        assert!(!prompt.user.contains("Focus areas"));
        assert!(!prompt.user.contains("Skills"));
        assert!(prompt.user.contains("Expected response length: short"));
    }

    #[test]
    fn test_quiz_system_prompt_is_deterministic() {
        let kinds = QuestionKind::ALL;
        assert_eq!(quiz_system_prompt(&kinds), quiz_system_prompt(&kinds));
        assert_eq!(quiz_system_prompt(&[]), quiz_system_prompt(&kinds));
    }

    #[test]
    fn test_quiz_system_prompt_only_shows_allowed_kinds() {
        let prompt = quiz_system_prompt(&[QuestionKind::OpenQuestion]);
        assert!(prompt.contains("\"type\": \"open_question\""));
        assert!(!prompt.contains("\"type\": \"multiple_choice\""));
        assert!(!prompt.contains("codeSnippet"));
        assert_eq!(prompt.matches("\"questions\"").count(), 1);
    }

    #[test]
    fn test_quiz_prompt_lists_previous_questions() {
        let prompt = build_quiz_prompt(&QuizRequest {
            context: context(&["Go"]),
            options: GenerationOptions::default(),
            question_count: 4,
            question_types: vec![],
            focus_areas: vec![],
            previous_questions: vec!["What is a goroutine?".to_string(), " ".to_string()],
        });
        assert!(prompt.user.contains("quiz of 4 questions"));
        assert!(prompt.user.contains(PREVIOUS_QUESTIONS_INSTRUCTION));
        assert!(prompt.user.contains("1. What is a goroutine?"));
        assert!(!prompt.user.contains("2. "));
    }

    #[test]
    fn test_quiz_prompt_without_previous_questions_has_no_dedup_block() {
        let prompt = build_quiz_prompt(&QuizRequest {
            context: context(&["Go"]),
            options: GenerationOptions::default(),
            question_count: 2,
            question_types: vec![QuestionKind::MultipleChoice],
            focus_areas: vec![],
            previous_questions: vec![],
        });
        assert!(!prompt.user.contains(PREVIOUS_QUESTIONS_INSTRUCTION));
        assert!(prompt.user.contains("Question types: multiple_choice"));
    }

    #[test]
    fn test_resume_prompt_wraps_resume_text() {
        let prompt = build_resume_evaluation_prompt(&ResumeEvaluationRequest {
            context: context(&["Rust"]),
            options: GenerationOptions::default(),
            resume_text: "10 years of systems programming".to_string(),
            position_description: None,
        });
        assert!(prompt.user.contains("<resume>\n10 years of systems programming\n</resume>"));
        assert!(!prompt.user.contains("position_description"));
        assert!(prompt.system.contains("fitScore"));
    }

    #[test]
    fn test_answer_prompt_renders_reference_only_when_present() {
        let request = AnswerEvaluationRequest {
            context: context(&["SQL"]),
            options: GenerationOptions::default(),
            question: "What is an index?".to_string(),
            answer: "A lookup structure".to_string(),
            sample_answer: None,
            keywords: vec![],
        };
        let prompt = build_answer_evaluation_prompt(&request);
        assert!(!prompt.user.contains("reference_answer"));
        assert!(!prompt.user.contains("Expected keywords"));

        let prompt = build_answer_evaluation_prompt(&AnswerEvaluationRequest {
            sample_answer: Some("B-tree".to_string()),
            keywords: vec!["b-tree".to_string()],
            ..request
        });
        assert!(prompt.user.contains("<reference_answer>\nB-tree\n</reference_answer>"));
        assert!(prompt.user.contains("Expected keywords: b-tree"));
    }

    #[test]
    fn test_build_prompt_dispatches_by_variant() {
        let request = GenerationRequest::PositionDescription(PositionDescriptionRequest {
            context: context(&["Kotlin"]),
            options: GenerationOptions::default(),
            company_name: Some("Acme".to_string()),
            tone: None,
        });
        let prompt = build_prompt(&request);
        assert!(prompt.system.contains("HR copywriter"));
        assert!(prompt.user.contains("Company: Acme"));
        assert!(!prompt.user.contains("Tone"));
    }
}
