//! Command-line driver: reads one `GenerationRequest` as JSON on stdin.
//!
//!   ai-engine [generate]   prints the result as JSON
//!   ai-engine stream       prints one JSON line per partial evaluation state
//!
//! Logs go to stderr so stdout stays machine-readable.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ai_engine::config::Config;
use ai_engine::errors::GenerationError;
use ai_engine::generation::request::GenerationRequest;
use ai_engine::generation::service::GenerationService;
use ai_engine::llm_client::{LanguageModel, LlmClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Generate,
    Stream,
}

fn parse_mode(arg: Option<&str>) -> Result<Mode> {
    match arg {
        None | Some("generate") => Ok(Mode::Generate),
        Some("stream") => Ok(Mode::Stream),
        Some(other) => bail!("unknown mode '{other}', expected 'generate' or 'stream'"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting AI engine v{}", env!("CARGO_PKG_VERSION"));

    let mode = parse_mode(std::env::args().nth(1).as_deref())?;

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read request from stdin")?;
    let request: GenerationRequest =
        serde_json::from_str(&input).context("Request is not a valid GenerationRequest")?;

    let llm: Arc<dyn LanguageModel> = Arc::new(LlmClient::new(
        config.anthropic_api_key.clone(),
        config.llm_api_url.clone(),
    ));
    info!(
        "LLM client initialized (default model: {}, retries: {}, timeout: {}ms, fallbacks: {:?})",
        config.default_model,
        config.generation.max_retries,
        config.generation.timeout.as_millis(),
        config.generation.fallback_models
    );
    let service = GenerationService::new(llm, config.default_model.clone(), config.generation.clone());

    let outcome = match mode {
        Mode::Generate => run_generate(&service, &request).await,
        Mode::Stream => run_stream(&service, &request).await,
    };

    if let Err(e) = outcome {
        error!("{} ({})", e, e.code.user_hint());
        println!("{}", serde_json::to_string(&e)?);
        std::process::exit(1);
    }
    Ok(())
}

async fn run_generate(
    service: &GenerationService,
    request: &GenerationRequest,
) -> Result<(), GenerationError> {
    let output = service.generate(request).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_stream(
    service: &GenerationService,
    request: &GenerationRequest,
) -> Result<(), GenerationError> {
    let mut states = Box::pin(service.stream_partial_evaluation(request).await?);
    while let Some(state) = states.next().await {
        println!("{}", serde_json::to_string(&state?)?);
    }
    Ok(())
}
