//! Model fallback cascade.
//!
//! Fallback only engages when the caller pinned a model explicitly: a request that runs on the
//! service default gets exactly one model. Each candidate gets the full attempt closure, so the
//! retry budget resets per model.

use std::future::Future;

use tracing::{info, warn};

use crate::errors::{ErrorCode, GenerationError};

/// Runs `attempt` against `primary`, then (for explicit models) against each fallback that has
/// not been tried yet, until one succeeds.
///
/// `CONTENT_FILTERED` stops the cascade and is returned as-is. Any other terminal failure
/// becomes `GENERATION_FAILED` with the last underlying error in `details`.
pub async fn with_fallback<T, F, Fut>(
    primary: &str,
    explicit: bool,
    fallbacks: &[String],
    mut attempt: F,
) -> Result<T, GenerationError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let candidates: &[String] = if explicit { fallbacks } else { &[] };
    let mut tried: Vec<String> = vec![primary.to_string()];

    let mut last_error = match attempt(primary.to_string()).await {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    for model in candidates {
        if last_error.code == ErrorCode::ContentFiltered {
            break;
        }
        if tried.contains(model) {
            continue;
        }
        warn!(
            "Model {} failed ({}), falling back to {}",
            tried.last().map(String::as_str).unwrap_or(primary),
            last_error,
            model
        );
        tried.push(model.clone());
        match attempt(model.clone()).await {
            Ok(value) => {
                info!("Fallback model {} succeeded", model);
                return Ok(value);
            }
            Err(e) => last_error = e,
        }
    }

    if last_error.code == ErrorCode::ContentFiltered {
        return Err(last_error);
    }

    let last_model = tried.last().map(String::as_str).unwrap_or(primary);
    let mut details = format!("{last_model}: {last_error}");
    if let Some(inner) = &last_error.details {
        details.push_str(&format!(" ({inner})"));
    }
    Err(GenerationError::generation_failed(format!(
        "Generation failed after trying {} model(s): {}",
        tried.len(),
        tried.join(", ")
    ))
    .with_details(details))
}
