use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::llm_client::{ANTHROPIC_API_URL, DEFAULT_MODEL};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub llm_api_url: String,
    pub default_model: String,
    pub generation: GenerationConfig,
    pub rust_log: String,
}

/// Retry, timeout and fallback policy shared by every call a service makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
    /// Tried in order once the explicitly requested model exhausts its retries.
    pub fallback_models: Vec<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            timeout: Duration::from_millis(60_000),
            fallback_models: Vec::new(),
        }
    }
}

impl GenerationConfig {
    /// Builds a config from raw values, rejecting zero delays and timeouts.
    pub fn new(
        max_retries: u32,
        retry_delay_ms: u64,
        timeout_ms: u64,
        fallback_models: Vec<String>,
    ) -> Result<Self> {
        if retry_delay_ms == 0 {
            bail!("retry delay must be greater than 0ms");
        }
        if timeout_ms == 0 {
            bail!("timeout must be greater than 0ms");
        }
        Ok(Self {
            max_retries,
            retry_delay: Duration::from_millis(retry_delay_ms),
            timeout: Duration::from_millis(timeout_ms),
            fallback_models,
        })
    }

    /// Reads the `GENERATION_*` variables through `lookup`, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_retries = parse_or("GENERATION_MAX_RETRIES", &lookup, defaults.max_retries)?;
        let retry_delay_ms = parse_or(
            "GENERATION_RETRY_DELAY_MS",
            &lookup,
            defaults.retry_delay.as_millis() as u64,
        )?;
        let timeout_ms = parse_or(
            "GENERATION_TIMEOUT_MS",
            &lookup,
            defaults.timeout.as_millis() as u64,
        )?;
        let fallback_models = lookup("GENERATION_FALLBACK_MODELS")
            .map(|raw| parse_model_list(&raw))
            .unwrap_or_default();

        Self::new(max_retries, retry_delay_ms, timeout_ms, fallback_models)
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let env = |key: &str| std::env::var(key).ok();

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            llm_api_url: env("LLM_API_URL").unwrap_or_else(|| ANTHROPIC_API_URL.to_string()),
            default_model: env("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            generation: GenerationConfig::from_lookup(env)
                .context("Invalid GENERATION_* configuration")?,
            rust_log: env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a non-negative integer, got '{raw}'")),
        None => Ok(default),
    }
}

/// Splits a comma-separated model list, dropping blanks and keeping order.
fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}
