/// LLM Client: the single point of entry for all model calls in the engine.
///
/// ARCHITECTURAL RULE: No other module may call the model backend directly.
/// Everything goes through the [`LanguageModel`] trait; [`LlmClient`] is the HTTP
/// implementation speaking the Anthropic Messages API.
///
/// Calls made here are single attempts. Retry, timeout and fallback live in
/// `generation::{retry, timeout, fallback}` so they apply uniformly to every backend.
use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{ErrorCode, GenerationError};

pub mod prompts;

use prompts::{FLEXIBLE_SCHEMA_NOTE, SCHEMA_INSTRUCTION_TEMPLATE, STRICT_SCHEMA_NOTE};

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Model used when a request carries no explicit override.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;

/// Incremental text produced by a streaming call, in arrival order.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

/// How strictly the caller will validate the model's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMode {
    /// Draft shape: most fields optional, normalized afterwards.
    Flexible,
    /// Final shape: every required field must be present.
    Strict,
}

/// JSON Schema the model is asked to conform to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    pub name: &'static str,
    pub mode: SchemaMode,
    pub schema: Value,
}

/// The one outbound call shape used for every generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub seed: Option<u64>,
    pub response_schema: ResponseSchema,
}

impl ModelRequest {
    /// System prompt with the response schema appended.
    pub fn system_with_schema(&self) -> String {
        let schema_json = serde_json::to_string_pretty(&self.response_schema.schema)
            .unwrap_or_else(|_| self.response_schema.schema.to_string());
        let note = match self.response_schema.mode {
            SchemaMode::Strict => STRICT_SCHEMA_NOTE,
            SchemaMode::Flexible => FLEXIBLE_SCHEMA_NOTE,
        };
        let schema_block = SCHEMA_INSTRUCTION_TEMPLATE
            .replace("{schema_name}", self.response_schema.name)
            .replace("{schema_json}", &schema_json);

        match self.system_prompt.as_deref() {
            Some(system) if !system.trim().is_empty() => {
                format!("{system}\n\n{schema_block}\n{note}")
            }
            _ => format!("{schema_block}\n{note}"),
        }
    }
}

/// Backend seam. Implement this to swap providers without touching the service.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Issues one call and returns the parsed JSON value the model produced.
    async fn generate_object(&self, request: &ModelRequest) -> Result<Value, GenerationError>;

    /// Issues one streaming call and returns the raw text deltas.
    async fn stream_text(&self, request: &ModelRequest) -> Result<TextStream, GenerationError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    #[serde(rename = "type", default)]
    error_type: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    error: Option<AnthropicErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
}

/// HTTP client for the Anthropic Messages API.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl LlmClient {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            api_url,
        }
    }

    /// Sends one request and maps non-success statuses to error codes.
    async fn send(
        &self,
        request: &ModelRequest,
        stream: bool,
    ) -> Result<reqwest::Response, GenerationError> {
        let system = request.system_with_schema();
        let body = AnthropicRequest {
            model: &request.model,
            max_tokens: MAX_TOKENS,
            system: &system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            stream,
        };

        if let Some(seed) = request.seed {
            debug!("Backend has no seed parameter; ignoring seed={seed}");
        }

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("LLM API returned {} for model {}: {}", status, request.model, body);
        Err(classify_status(status.as_u16(), &body))
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn generate_object(&self, request: &ModelRequest) -> Result<Value, GenerationError> {
        let response = self.send(request, false).await?;
        let llm_response: LlmResponse = response.json().await?;

        debug!(
            "LLM call succeeded: model={}, input_tokens={}, output_tokens={}",
            request.model, llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        if llm_response.stop_reason.as_deref() == Some("refusal") {
            return Err(GenerationError::content_filtered(
                "The model declined to produce this content",
            ));
        }

        let text = llm_response
            .text()
            .ok_or_else(|| GenerationError::invalid_response("LLM returned empty content"))?;

        parse_json_text(text)
    }

    async fn stream_text(&self, request: &ModelRequest) -> Result<TextStream, GenerationError> {
        let response = self.send(request, true).await?;
        debug!("LLM stream opened: model={}", request.model);
        Ok(Box::pin(decode_sse(Box::pin(response.bytes_stream()))))
    }
}

/// Parses model text as JSON, tolerating markdown fences around it.
pub fn parse_json_text(text: &str) -> Result<Value, GenerationError> {
    let text = strip_json_fences(text);
    serde_json::from_str(text).map_err(|e| {
        GenerationError::invalid_response("Model output is not valid JSON")
            .with_details(e.to_string())
    })
}

fn classify_status(status: u16, body: &str) -> GenerationError {
    // Try to parse error message
    let message = serde_json::from_str::<AnthropicError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    let code = match status {
        429 => ErrorCode::RateLimited,
        404 | 503 | 529 => ErrorCode::ModelUnavailable,
        _ => ErrorCode::GenerationFailed,
    };

    GenerationError::new(code, format!("LLM API error (status {status})")).with_details(message)
}

fn classify_stream_error(error: AnthropicErrorBody) -> GenerationError {
    let code = match error.error_type.as_str() {
        "rate_limit_error" => ErrorCode::RateLimited,
        "overloaded_error" | "not_found_error" => ErrorCode::ModelUnavailable,
        _ => ErrorCode::GenerationFailed,
    };
    GenerationError::new(code, "LLM stream reported an error").with_details(error.message)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Server-sent events
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum SseEvent {
    Text(String),
    Stop,
    Failed(GenerationError),
    Ignore,
}

/// Interprets one SSE line. Only `data:` lines carry payloads.
fn parse_sse_line(line: &str) -> SseEvent {
    let Some(payload) = line.strip_prefix("data:") else {
        return SseEvent::Ignore;
    };
    let payload = payload.trim_start();
    if payload == "[DONE]" {
        return SseEvent::Stop;
    }

    let event: StreamEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(e) => {
            debug!("Skipping unparseable SSE payload: {e}");
            return SseEvent::Ignore;
        }
    };

    match event.event_type.as_str() {
        "content_block_delta" => match event.delta.and_then(|d| d.text) {
            Some(text) => SseEvent::Text(text),
            None => SseEvent::Ignore,
        },
        "message_delta" => match event.delta.and_then(|d| d.stop_reason) {
            Some(reason) if reason == "refusal" => SseEvent::Failed(
                GenerationError::content_filtered("The model declined to produce this content"),
            ),
            _ => SseEvent::Ignore,
        },
        "message_stop" => SseEvent::Stop,
        "error" => match event.error {
            Some(error) => SseEvent::Failed(classify_stream_error(error)),
            None => SseEvent::Failed(GenerationError::generation_failed(
                "LLM stream reported an unknown error",
            )),
        },
        _ => SseEvent::Ignore,
    }
}

struct SseDecoder<S> {
    bytes: S,
    buffer: Vec<u8>,
    pending: VecDeque<Result<String, GenerationError>>,
    done: bool,
}

impl<S> SseDecoder<S> {
    fn handle_line(&mut self, line: &str) {
        if self.done {
            return;
        }
        match parse_sse_line(line) {
            SseEvent::Text(text) => self.pending.push_back(Ok(text)),
            SseEvent::Stop => self.done = true,
            SseEvent::Failed(e) => {
                self.pending.push_back(Err(e));
                self.done = true;
            }
            SseEvent::Ignore => {}
        }
    }

    /// Processes every complete line in the buffer. Splitting on `\n` before decoding
    /// keeps multi-byte characters that straddle network chunks intact.
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            self.handle_line(line.trim_end_matches(['\r', '\n']));
        }
    }
}

/// Turns a raw SSE byte stream into the text deltas it carries.
fn decode_sse<S, B, E>(bytes: S) -> impl Stream<Item = Result<String, GenerationError>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<GenerationError>,
{
    let decoder = SseDecoder {
        bytes,
        buffer: Vec::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(decoder, |mut decoder| async move {
        loop {
            if let Some(item) = decoder.pending.pop_front() {
                return Some((item, decoder));
            }
            if decoder.done {
                return None;
            }
            match decoder.bytes.next().await {
                Some(Ok(chunk)) => {
                    decoder.buffer.extend_from_slice(chunk.as_ref());
                    decoder.drain_lines();
                }
                Some(Err(e)) => {
                    decoder.done = true;
                    return Some((Err(e.into()), decoder));
                }
                None => {
                    if !decoder.buffer.is_empty() {
                        let rest = std::mem::take(&mut decoder.buffer);
                        let line = String::from_utf8_lossy(&rest).into_owned();
                        decoder.handle_line(line.trim_end());
                    }
                    decoder.done = true;
                }
            }
        }
    })
}
