use std::future::Future;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::errors::GenerationError;
use crate::llm_client::TextStream;

/// Races `operation` against a timer. On expiry the operation is dropped, which cancels any
/// in-flight request it owns, and a `TIMEOUT` error is returned.
pub async fn with_timeout<T, Fut>(operation: Fut, limit: Duration) -> Result<T, GenerationError>
where
    Fut: Future<Output = Result<T, GenerationError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Operation timed out after {}ms", limit.as_millis());
            Err(GenerationError::timeout(limit.as_millis()))
        }
    }
}

/// Bounds the wait for every chunk of `text` by `limit`. A stalled stream yields one
/// `TIMEOUT` error and then ends; the underlying stream is dropped.
pub fn with_chunk_timeout(text: TextStream, limit: Duration) -> TextStream {
    Box::pin(stream::unfold(Some(text), move |state| async move {
        let mut text = state?;
        match tokio::time::timeout(limit, text.next()).await {
            Ok(Some(chunk)) => Some((chunk, Some(text))),
            Ok(None) => None,
            Err(_) => {
                warn!("No stream chunk within {}ms", limit.as_millis());
                Some((Err(GenerationError::timeout(limit.as_millis())), None))
            }
        }
    }))
}
