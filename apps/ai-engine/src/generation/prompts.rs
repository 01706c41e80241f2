// All LLM prompt constants for the Generation module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for a single multiple-choice question.
pub const MULTIPLE_CHOICE_SYSTEM: &str = "You are a senior technical interviewer writing \
    multiple-choice screening questions for job candidates. \
    Each question has between 2 and 6 options with exactly one correct answer. \
    `correctAnswer` is the zero-based index of the correct option. \
    Vary the position of the correct option; do NOT always use index 0. \
    Avoid \"all of the above\" and \"none of the above\".";

/// System prompt for a single open question.
pub const OPEN_QUESTION_SYSTEM: &str = "You are a senior technical interviewer writing \
    open-ended interview questions. \
    Every question includes a concise `sampleAnswer` and a list of `keywords` a strong answer mentions.";

/// System prompt for a single code-snippet question.
pub const CODE_SNIPPET_SYSTEM: &str = "You are a senior engineer writing code-review \
    interview questions. Each question shows a short, self-contained `codeSnippet` in the requested \
    `language` and asks the candidate to find and fix a problem. \
    The snippet must compile or run apart from the intended defect. \
    Include a `sampleSolution` with the corrected code and an `explanation` of the defect.";

/// Opening of the quiz system prompt; kind rules and the example follow.
pub const QUIZ_SYSTEM_INTRO: &str = "You are a senior technical interviewer assembling a \
    screening quiz for a job position. \
    Return a JSON object with a single `questions` array. \
    Questions must be practical, non-trivial and must not overlap with each other.";

pub const QUIZ_RULE_MULTIPLE_CHOICE: &str = "- multiple_choice: 2 to 6 `options`, a zero-based \
    `correctAnswer`, and a short `explanation`. Vary the correct position.";

pub const QUIZ_RULE_OPEN_QUESTION: &str =
    "- open_question: a `sampleAnswer` and the `keywords` a strong answer mentions.";

pub const QUIZ_RULE_CODE_SNIPPET: &str = "- code_snippet: a short `codeSnippet`, its `language`, \
    a `sampleSolution` and an `explanation` of the defect.";

/// System prompt for resume evaluation.
pub const RESUME_EVALUATION_SYSTEM: &str = "You are a critical, unbiased senior recruiter. \
    Evaluate how well a candidate's resume matches a specific position. \
    Be strict: transferable soft skills do not compensate for missing core experience. \
    `fitScore` is an integer from 0 to 100: \
    0-30 fundamental mismatch, 31-60 partial overlap, 61-80 strong match with minor gaps, \
    81-100 near-perfect match. \
    Write `evaluation` first, then `strengths`, `weaknesses`, `recommendation` and `fitScore`.";

/// System prompt for evaluating a candidate's answer to one question.
pub const ANSWER_EVALUATION_SYSTEM: &str = "You are a fair technical interviewer grading a \
    candidate's answer to an interview question. \
    Judge correctness, depth and clarity for the stated experience level. \
    `fitScore` is an integer from 0 to 100 scoring the answer. \
    Write `evaluation` first, then `strengths`, `weaknesses`, `recommendation` and `fitScore`.";

/// System prompt for writing a position description.
pub const POSITION_DESCRIPTION_SYSTEM: &str = "You are an experienced HR copywriter. \
    Write an engaging, accurate job description: a `description` paragraph, \
    a list of `responsibilities` and a list of `requirements`. \
    Do not invent salary, benefits or company facts that were not provided.";

pub const QUESTION_INDEX_INSTRUCTION: &str = "This is question #{index}. \
    Produce exactly one question for this slot; it must stand on its own and not depend on other questions.";

pub const QUIZ_NUMBERING_INSTRUCTION: &str = "Number the questions implicitly by their order in the \
    array: the first element is question #1, the last is question #{count}.";

pub const PREVIOUS_QUESTIONS_INSTRUCTION: &str = "The following questions were already asked. \
    Do NOT repeat them and do NOT write near-duplicates or paraphrases of them:";

/// Example rendered inline in the quiz system prompt; one entry per allowed kind.
pub const QUIZ_EXAMPLE_MULTIPLE_CHOICE: &str = r#"{
      "type": "multiple_choice",
      "question": "Which HTTP status code indicates that a resource was created?",
      "options": ["200", "201", "204", "301"],
      "correctAnswer": 1,
      "explanation": "201 Created is returned when a request results in a new resource."
    }"#;

pub const QUIZ_EXAMPLE_OPEN_QUESTION: &str = r#"{
      "type": "open_question",
      "question": "How would you design idempotent payment processing?",
      "sampleAnswer": "Use an idempotency key stored with the result of the first request...",
      "keywords": ["idempotency key", "deduplication", "retries"]
    }"#;

pub const QUIZ_EXAMPLE_CODE_SNIPPET: &str = r#"{
      "type": "code_snippet",
      "question": "What is wrong with this function?",
      "codeSnippet": "def last(items):\n    return items[len(items)]",
      "language": "python",
      "sampleSolution": "def last(items):\n    return items[-1]",
      "explanation": "Indexing with len(items) is off by one and raises IndexError."
    }"#;
