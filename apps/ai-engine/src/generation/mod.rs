// Generation engine: typed requests in, validated questions, quizzes, evaluations and
// position descriptions out. All model calls go through llm_client via GenerationService.

pub mod fallback;
pub mod normalizer;
pub mod prompt_builder;
pub mod prompts;
pub mod request;
pub mod retry;
pub mod sanitizer;
pub mod schema;
pub mod service;
pub mod streaming;
pub mod timeout;
