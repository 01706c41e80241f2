pub mod config;
pub mod errors;
pub mod generation;
pub mod llm_client;
